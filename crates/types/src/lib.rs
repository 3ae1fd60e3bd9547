//! # stx-token 共有型定義
//!
//! ウォレット認証フロー向けトランザクショントークンのデータ構造を提供する。
//!
//! ## エンコーディング規則
//! - JSONフィールド名: camelCase（ウォレット側の期待する形式）
//! - 128ビット整数: 10進文字列（JSON数値の精度制限を避ける）
//! - バイト列: 小文字hex

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// トランザクション種別
// ---------------------------------------------------------------------------

/// ペイロードに付与されるトランザクション種別タグ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// スマートコントラクト関数の呼び出し
    #[serde(rename = "contract_call")]
    ContractCall,
    /// コントラクトのデプロイ
    #[serde(rename = "smart_contract")]
    ContractDeploy,
    /// STX送金
    #[serde(rename = "token_transfer")]
    StxTransfer,
}

impl TransactionType {
    /// JSON上のタグ文字列
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::ContractCall => "contract_call",
            TransactionType::ContractDeploy => "smart_contract",
            TransactionType::StxTransfer => "token_transfer",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ポストコンディションの適用モード。JSON上は数値で表現される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PostConditionMode {
    /// 列挙されていない資産移動も許可する
    Allow = 0x01,
    /// 列挙されていない資産移動を拒否する
    Deny = 0x02,
}

impl Serialize for PostConditionMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for PostConditionMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0x01 => Ok(PostConditionMode::Allow),
            0x02 => Ok(PostConditionMode::Deny),
            other => Err(D::Error::custom(format!(
                "不明なポストコンディションモード: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// 共通オプション
// ---------------------------------------------------------------------------

/// ウォレットに表示するアプリケーション情報。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    /// アプリケーション名
    pub name: String,
    /// アイコンURL
    pub icon: String,
}

/// 接続先ネットワークの記述。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StacksNetwork {
    /// トランザクションバージョン (mainnet: 0x00, testnet: 0x80)
    pub version: u8,
    /// チェーンID
    pub chain_id: u32,
    /// Stacks API のベースURL
    pub core_api_url: String,
}

impl StacksNetwork {
    /// mainnetのプリセット
    pub fn mainnet() -> Self {
        Self {
            version: 0x00,
            chain_id: 0x0000_0001,
            core_api_url: "https://stacks-node-api.mainnet.stacks.co".to_string(),
        }
    }

    /// testnetのプリセット
    pub fn testnet() -> Self {
        Self {
            version: 0x80,
            chain_id: 0x8000_0000,
            core_api_url: "https://stacks-node-api.testnet.stacks.co".to_string(),
        }
    }

    /// mainnetかどうか
    pub fn is_mainnet(&self) -> bool {
        self.version == 0x00
    }
}

/// 全トークン種別に共通する呼び出し元オプション。
/// 省略されたフィールドはJSONに出力しない。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOptionsBase {
    /// アプリケーション情報
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_details: Option<AppDetails>,
    /// ポストコンディションモード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_condition_mode: Option<PostConditionMode>,
    /// ポストコンディション。hex文字列でもオブジェクトでも加工せずにそのまま渡す
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_conditions: Option<Vec<serde_json::Value>>,
    /// 接続先ネットワーク
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<StacksNetwork>,
    /// アタッチメント（hex）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    /// スポンサー付きトランザクションか
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsored: Option<bool>,
    /// 送信者のSTXアドレス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx_address: Option<String>,
    /// 上記以外の呼び出し元オプション（`fee`、`anchorMode` など）。
    /// ペイロードへそのままコピーされる
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TxOptionsBase {
    /// 既知のオプションのJSONキー
    pub const KNOWN_KEYS: &'static [&'static str] = &[
        "appDetails",
        "postConditionMode",
        "postConditions",
        "network",
        "attachment",
        "sponsored",
        "stxAddress",
    ];
}

// ---------------------------------------------------------------------------
// Clarity値
// ---------------------------------------------------------------------------

/// コントラクトプリンシパル（`<address>.<contract_name>`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPrincipal {
    /// デプロイ元のc32アドレス
    pub address: String,
    /// コントラクト名
    pub contract_name: String,
}

/// Clarityの型付き値。
///
/// JSON表現は `{"type": "<型名>", "value": <値>}`。
/// タプルのキーは常にバイト順でソートされた状態で保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ClarityValue {
    /// 符号付き128ビット整数
    #[serde(rename = "int")]
    Int(#[serde(with = "decimal")] i128),
    /// 符号なし128ビット整数
    #[serde(rename = "uint")]
    UInt(#[serde(with = "decimal")] u128),
    /// バイト列
    #[serde(rename = "buffer")]
    Buffer(#[serde(with = "hex_bytes")] Vec<u8>),
    #[serde(rename = "true")]
    BoolTrue,
    #[serde(rename = "false")]
    BoolFalse,
    /// 標準プリンシパル（c32アドレス）
    #[serde(rename = "address")]
    StandardPrincipal(String),
    /// コントラクトプリンシパル
    #[serde(rename = "contract")]
    ContractPrincipal(ContractPrincipal),
    #[serde(rename = "ok")]
    ResponseOk(Box<ClarityValue>),
    #[serde(rename = "err")]
    ResponseErr(Box<ClarityValue>),
    #[serde(rename = "none")]
    OptionalNone,
    #[serde(rename = "some")]
    OptionalSome(Box<ClarityValue>),
    #[serde(rename = "list")]
    List(Vec<ClarityValue>),
    #[serde(rename = "tuple")]
    Tuple(BTreeMap<String, ClarityValue>),
    /// ASCII文字列
    #[serde(rename = "ascii")]
    StringAscii(String),
    /// UTF-8文字列
    #[serde(rename = "utf8")]
    StringUtf8(String),
}

impl ClarityValue {
    pub fn int(value: i128) -> Self {
        ClarityValue::Int(value)
    }

    pub fn uint(value: u128) -> Self {
        ClarityValue::UInt(value)
    }

    pub fn bool(value: bool) -> Self {
        if value {
            ClarityValue::BoolTrue
        } else {
            ClarityValue::BoolFalse
        }
    }

    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        ClarityValue::Buffer(bytes.into())
    }

    pub fn string_ascii(value: impl Into<String>) -> Self {
        ClarityValue::StringAscii(value.into())
    }

    pub fn string_utf8(value: impl Into<String>) -> Self {
        ClarityValue::StringUtf8(value.into())
    }

    /// 標準プリンシパルを構築する。アドレスの検証はエンコード時に行う。
    pub fn standard_principal(address: impl Into<String>) -> Self {
        ClarityValue::StandardPrincipal(address.into())
    }

    /// コントラクトプリンシパルを構築する。アドレスの検証はエンコード時に行う。
    pub fn contract_principal(address: impl Into<String>, contract_name: impl Into<String>) -> Self {
        ClarityValue::ContractPrincipal(ContractPrincipal {
            address: address.into(),
            contract_name: contract_name.into(),
        })
    }

    pub fn some(value: ClarityValue) -> Self {
        ClarityValue::OptionalSome(Box::new(value))
    }

    pub fn none() -> Self {
        ClarityValue::OptionalNone
    }

    pub fn ok(value: ClarityValue) -> Self {
        ClarityValue::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        ClarityValue::ResponseErr(Box::new(value))
    }

    pub fn list(values: impl IntoIterator<Item = ClarityValue>) -> Self {
        ClarityValue::List(values.into_iter().collect())
    }

    /// タプルを構築する。同名キーは後勝ち。
    pub fn tuple<K: Into<String>>(entries: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        ClarityValue::Tuple(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// コントラクト関数の引数。hexエンコード済み文字列か構造化されたClarity値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionArg {
    /// エンコード済みのhex（`0x`プレフィックス有無どちらも可）
    Hex(String),
    /// エンコード前のClarity値
    Clarity(ClarityValue),
}

impl From<ClarityValue> for FunctionArg {
    fn from(value: ClarityValue) -> Self {
        FunctionArg::Clarity(value)
    }
}

impl From<String> for FunctionArg {
    fn from(value: String) -> Self {
        FunctionArg::Hex(value)
    }
}

impl From<&str> for FunctionArg {
    fn from(value: &str) -> Self {
        FunctionArg::Hex(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// トークン生成オプション
// ---------------------------------------------------------------------------

/// コントラクト呼び出しトークンの生成オプション。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallTxOptions {
    /// コントラクトのデプロイ元アドレス
    pub contract_address: String,
    /// コントラクト名
    pub contract_name: String,
    /// 呼び出す関数名
    pub function_name: String,
    /// 関数引数
    pub function_args: Vec<FunctionArg>,
    #[serde(flatten)]
    pub base: TxOptionsBase,
}

/// STX送金トークンの生成オプション。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StxTransferTxOptions {
    /// 送金先アドレス
    pub recipient: String,
    /// 送金額（micro-STX）
    #[serde(with = "decimal")]
    pub amount: u128,
    /// メモ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(flatten)]
    pub base: TxOptionsBase,
}

/// コントラクトデプロイトークンの生成オプション。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeployTxOptions {
    /// デプロイするコントラクト名
    pub contract_name: String,
    /// Clarityソースコード
    pub code_body: String,
    #[serde(flatten)]
    pub base: TxOptionsBase,
}

// ---------------------------------------------------------------------------
// 署名対象ペイロード
// ---------------------------------------------------------------------------

/// コントラクト呼び出しペイロード。
/// 呼び出し元オプション、正規化済み引数、種別タグ、公開鍵の順にシリアライズされる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallTxPayload {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    #[serde(flatten)]
    pub base: TxOptionsBase,
    /// `0x`なしのhexに正規化された関数引数
    pub function_args: Vec<String>,
    /// 常に `contract_call`
    pub tx_type: TransactionType,
    /// 圧縮形式の公開鍵（hex）
    pub public_key: String,
}

/// STX送金ペイロード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StxTransferTxPayload {
    pub recipient: String,
    #[serde(with = "decimal")]
    pub amount: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(flatten)]
    pub base: TxOptionsBase,
    /// 常に `token_transfer`
    pub tx_type: TransactionType,
    pub public_key: String,
}

/// コントラクトデプロイペイロード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeployTxPayload {
    pub contract_name: String,
    pub code_body: String,
    #[serde(flatten)]
    pub base: TxOptionsBase,
    /// 常に `smart_contract`
    pub tx_type: TransactionType,
    pub public_key: String,
}

/// 署名器に渡されるペイロード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransactionPayload {
    ContractCall(ContractCallTxPayload),
    StxTransfer(StxTransferTxPayload),
    ContractDeploy(ContractDeployTxPayload),
}

impl TransactionPayload {
    /// ペイロードの種別タグ
    pub fn tx_type(&self) -> TransactionType {
        match self {
            TransactionPayload::ContractCall(p) => p.tx_type,
            TransactionPayload::StxTransfer(p) => p.tx_type,
            TransactionPayload::ContractDeploy(p) => p.tx_type,
        }
    }

    /// ペイロードに埋め込まれた公開鍵（hex）
    pub fn public_key(&self) -> &str {
        match self {
            TransactionPayload::ContractCall(p) => &p.public_key,
            TransactionPayload::StxTransfer(p) => &p.public_key,
            TransactionPayload::ContractDeploy(p) => &p.public_key,
        }
    }
}

impl From<ContractCallTxPayload> for TransactionPayload {
    fn from(payload: ContractCallTxPayload) -> Self {
        TransactionPayload::ContractCall(payload)
    }
}

impl From<StxTransferTxPayload> for TransactionPayload {
    fn from(payload: StxTransferTxPayload) -> Self {
        TransactionPayload::StxTransfer(payload)
    }
}

impl From<ContractDeployTxPayload> for TransactionPayload {
    fn from(payload: ContractDeployTxPayload) -> Self {
        TransactionPayload::ContractDeploy(payload)
    }
}

// ---------------------------------------------------------------------------
// serdeヘルパー
// ---------------------------------------------------------------------------

/// 整数を10進文字列として扱う。入力は文字列・数値のどちらも受け付ける。
mod decimal {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s,
            Repr::Signed(n) => n.to_string(),
            Repr::Unsigned(n) => n.to_string(),
        };
        text.trim()
            .parse()
            .map_err(|e| D::Error::custom(format!("整数として解釈できません ({text}): {e}")))
    }
}

/// バイト列を小文字hex文字列として扱う。
mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let body = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(body).map_err(|e| D::Error::custom(format!("hexのデコードに失敗: {e}")))
    }
}
