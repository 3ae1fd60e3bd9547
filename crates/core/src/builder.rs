//! # トークンビルダー
//!
//! 呼び出し元オプションからペイロードを組み立て、署名器に渡す。
//! ペイロードは呼び出しごとに新しく構築され、署名器に渡した後は保持しない。

use stx_token_crypto::PrivateKey;
use stx_token_types::{
    ContractCallTxOptions, ContractCallTxPayload, ContractDeployTxOptions,
    ContractDeployTxPayload, FunctionArg, StxTransferTxOptions, StxTransferTxPayload,
    TransactionType, TxOptionsBase,
};

use crate::c32::{c32_address_decode, is_mainnet_version};
use crate::clarity::{clean_hex, cv_to_hex, ClarityError};
use crate::signer::{PayloadSigner, TokenSigner};
use crate::CoreError;

// ---------------------------------------------------------------------------
// 引数の正規化
// ---------------------------------------------------------------------------

/// 関数引数を `0x` なしのhexに正規化する。
/// 文字列はそのまま、Clarity値はエンコードしてから `clean_hex` を通す。
pub fn normalize_function_arg(arg: &FunctionArg) -> Result<String, ClarityError> {
    match arg {
        FunctionArg::Hex(hex) => Ok(clean_hex(hex)),
        FunctionArg::Clarity(value) => Ok(clean_hex(&cv_to_hex(value)?)),
    }
}

/// 全ての関数引数を順序を保って正規化する。
pub fn normalize_function_args(args: &[FunctionArg]) -> Result<Vec<String>, ClarityError> {
    args.iter().map(normalize_function_arg).collect()
}

// ---------------------------------------------------------------------------
// 呼び出し元オプションの展開
// ---------------------------------------------------------------------------

/// コントラクト呼び出しペイロードでビルダーが設定するキー
const CONTRACT_CALL_KEYS: &[&str] = &[
    "contractAddress",
    "contractName",
    "functionName",
    "functionArgs",
    "txType",
    "publicKey",
];

/// STX送金ペイロードでビルダーが設定するキー
const STX_TRANSFER_KEYS: &[&str] = &["recipient", "amount", "memo", "txType", "publicKey"];

/// コントラクトデプロイペイロードでビルダーが設定するキー
const CONTRACT_DEPLOY_KEYS: &[&str] = &["contractName", "codeBody", "txType", "publicKey"];

/// 呼び出し元オプションをペイロード用に複製する。
/// 追加オプションはそのまま残し、ビルダーが設定するキーと重なるものだけ除く。
fn spread_options(base: &TxOptionsBase, fixed_keys: &[&str]) -> TxOptionsBase {
    let mut spread = base.clone();
    spread.extra.retain(|key, _| {
        let key = key.as_str();
        !fixed_keys.contains(&key) && !TxOptionsBase::KNOWN_KEYS.contains(&key)
    });
    let dropped = base.extra.len() - spread.extra.len();
    if dropped > 0 {
        tracing::debug!(dropped, "固定キーと重なる追加オプションを除外しました");
    }
    warn_on_network_mismatch(&spread);
    spread
}

/// `stxAddress` のバージョンと `network` が同じネットワークを指しているか。
/// どちらかが無い、またはアドレスを判定できない場合は `None`。
pub(crate) fn address_matches_network(base: &TxOptionsBase) -> Option<bool> {
    let address = base.stx_address.as_deref()?;
    let network = base.network.as_ref()?;
    let (version, _) = c32_address_decode(address).ok()?;
    let mainnet = is_mainnet_version(version)?;
    Some(mainnet == network.is_mainnet())
}

fn warn_on_network_mismatch(base: &TxOptionsBase) {
    if address_matches_network(base) == Some(false) {
        tracing::warn!(
            stx_address = base.stx_address.as_deref().unwrap_or_default(),
            "stxAddress のネットワークが network オプションと一致しません"
        );
    }
}

// ---------------------------------------------------------------------------
// ペイロードの組み立て
// ---------------------------------------------------------------------------

/// コントラクト呼び出しペイロードを組み立てる。
/// `tx_type` はオプションの内容に関係なく常に `contract_call`。
pub fn build_contract_call_payload(
    options: &ContractCallTxOptions,
    private_key: &PrivateKey,
) -> Result<ContractCallTxPayload, CoreError> {
    let public_key = private_key.public_key_hex();
    let function_args = normalize_function_args(&options.function_args)?;

    tracing::debug!(
        contract_address = %options.contract_address,
        contract_name = %options.contract_name,
        function_name = %options.function_name,
        arg_count = function_args.len(),
        "コントラクト呼び出しペイロードを組み立てました"
    );

    Ok(ContractCallTxPayload {
        contract_address: options.contract_address.clone(),
        contract_name: options.contract_name.clone(),
        function_name: options.function_name.clone(),
        base: spread_options(&options.base, CONTRACT_CALL_KEYS),
        function_args,
        tx_type: TransactionType::ContractCall,
        public_key,
    })
}

/// STX送金ペイロードを組み立てる。
pub fn build_stx_transfer_payload(
    options: &StxTransferTxOptions,
    private_key: &PrivateKey,
) -> StxTransferTxPayload {
    tracing::debug!(
        recipient = %options.recipient,
        amount = %options.amount,
        "STX送金ペイロードを組み立てました"
    );

    StxTransferTxPayload {
        recipient: options.recipient.clone(),
        amount: options.amount,
        memo: options.memo.clone(),
        base: spread_options(&options.base, STX_TRANSFER_KEYS),
        tx_type: TransactionType::StxTransfer,
        public_key: private_key.public_key_hex(),
    }
}

/// コントラクトデプロイペイロードを組み立てる。
pub fn build_contract_deploy_payload(
    options: &ContractDeployTxOptions,
    private_key: &PrivateKey,
) -> ContractDeployTxPayload {
    tracing::debug!(
        contract_name = %options.contract_name,
        code_len = options.code_body.len(),
        "コントラクトデプロイペイロードを組み立てました"
    );

    ContractDeployTxPayload {
        contract_name: options.contract_name.clone(),
        code_body: options.code_body.clone(),
        base: spread_options(&options.base, CONTRACT_DEPLOY_KEYS),
        tx_type: TransactionType::ContractDeploy,
        public_key: private_key.public_key_hex(),
    }
}

// ---------------------------------------------------------------------------
// トークン生成
// ---------------------------------------------------------------------------

/// コントラクト呼び出しトークンを生成する（ES256K署名）。
pub async fn make_contract_call_token(
    options: &ContractCallTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    make_contract_call_token_with(&TokenSigner, options, private_key).await
}

/// 任意の署名器でコントラクト呼び出しトークンを生成する。
pub async fn make_contract_call_token_with<S: PayloadSigner + ?Sized>(
    signer: &S,
    options: &ContractCallTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    let private_key = PrivateKey::from_hex(private_key)?;
    let payload = build_contract_call_payload(options, &private_key)?;
    Ok(signer.sign_payload(&payload.into(), &private_key).await?)
}

/// STX送金トークンを生成する（ES256K署名）。
pub async fn make_stx_transfer_token(
    options: &StxTransferTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    make_stx_transfer_token_with(&TokenSigner, options, private_key).await
}

/// 任意の署名器でSTX送金トークンを生成する。
pub async fn make_stx_transfer_token_with<S: PayloadSigner + ?Sized>(
    signer: &S,
    options: &StxTransferTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    let private_key = PrivateKey::from_hex(private_key)?;
    let payload = build_stx_transfer_payload(options, &private_key);
    Ok(signer.sign_payload(&payload.into(), &private_key).await?)
}

/// コントラクトデプロイトークンを生成する（ES256K署名）。
pub async fn make_contract_deploy_token(
    options: &ContractDeployTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    make_contract_deploy_token_with(&TokenSigner, options, private_key).await
}

/// 任意の署名器でコントラクトデプロイトークンを生成する。
pub async fn make_contract_deploy_token_with<S: PayloadSigner + ?Sized>(
    signer: &S,
    options: &ContractDeployTxOptions,
    private_key: &str,
) -> Result<String, CoreError> {
    let private_key = PrivateKey::from_hex(private_key)?;
    let payload = build_contract_deploy_payload(options, &private_key);
    Ok(signer.sign_payload(&payload.into(), &private_key).await?)
}
