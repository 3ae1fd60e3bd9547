//! # Clarity値のワイヤ表現
//!
//! Clarity値とコンセンサス用バイナリ表現の相互変換を行う。
//!
//! ## エンコーディング規則
//! | 型 | プレフィックス | 本体 |
//! |----|--------------|------|
//! | int / uint | 0x00 / 0x01 | 16バイト big-endian |
//! | buffer | 0x02 | u32長 + バイト列 |
//! | true / false | 0x03 / 0x04 | なし |
//! | 標準プリンシパル | 0x05 | version(1) + hash160(20) |
//! | コントラクトプリンシパル | 0x06 | version(1) + hash160(20) + u8長 + 名前 |
//! | ok / err | 0x07 / 0x08 | 内側の値 |
//! | none / some | 0x09 / 0x0a | なし / 内側の値 |
//! | list | 0x0b | u32長 + 要素 |
//! | tuple | 0x0c | u32長 + (u8長 + キー + 値)、キーのバイト順 |
//! | string-ascii / string-utf8 | 0x0d / 0x0e | u32長 + バイト列 |

use std::collections::BTreeMap;

use stx_token_types::{ClarityValue, ContractPrincipal};

use crate::c32::{c32_address, c32_address_decode, C32Error, HASH160_LENGTH};

/// タプルキー・コントラクト名の最大バイト長
pub const MAX_NAME_LENGTH: usize = 128;

/// 値のネストの最大深度
pub const MAX_DEPTH: usize = 32;

/// Clarity値の型プレフィックス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum TypePrefix {
    Int = 0x00,
    UInt = 0x01,
    Buffer = 0x02,
    BoolTrue = 0x03,
    BoolFalse = 0x04,
    PrincipalStandard = 0x05,
    PrincipalContract = 0x06,
    ResponseOk = 0x07,
    ResponseErr = 0x08,
    OptionalNone = 0x09,
    OptionalSome = 0x0a,
    List = 0x0b,
    Tuple = 0x0c,
    StringAscii = 0x0d,
    StringUtf8 = 0x0e,
}

impl TryFrom<u8> for TypePrefix {
    type Error = ClarityError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let prefix = match byte {
            0x00 => TypePrefix::Int,
            0x01 => TypePrefix::UInt,
            0x02 => TypePrefix::Buffer,
            0x03 => TypePrefix::BoolTrue,
            0x04 => TypePrefix::BoolFalse,
            0x05 => TypePrefix::PrincipalStandard,
            0x06 => TypePrefix::PrincipalContract,
            0x07 => TypePrefix::ResponseOk,
            0x08 => TypePrefix::ResponseErr,
            0x09 => TypePrefix::OptionalNone,
            0x0a => TypePrefix::OptionalSome,
            0x0b => TypePrefix::List,
            0x0c => TypePrefix::Tuple,
            0x0d => TypePrefix::StringAscii,
            0x0e => TypePrefix::StringUtf8,
            other => return Err(ClarityError::UnknownTypePrefix(other)),
        };
        Ok(prefix)
    }
}

/// Clarity値のエンコード・デコードのエラー型
#[derive(Debug, thiserror::Error)]
pub enum ClarityError {
    /// プリンシパルのアドレスが不正
    #[error("不正なプリンシパル: {0}")]
    InvalidPrincipal(#[from] C32Error),
    /// `<address>.<name>` の形式でない
    #[error("コントラクト識別子が不正です: {0}")]
    InvalidContractIdentifier(String),
    /// 空の名前
    #[error("名前が空です")]
    EmptyName,
    /// 名前が長すぎる
    #[error("名前が長すぎます ({length} > {max}): {name}")]
    NameTooLong {
        /// 対象の名前
        name: String,
        /// 実際のバイト長
        length: usize,
        /// 上限値
        max: usize,
    },
    /// string-asciiにASCII以外が含まれる
    #[error("string-asciiにASCII以外の文字が含まれています: {0}")]
    NonAscii(String),
    /// 長さがu32に収まらない
    #[error("長さが上限を超えています: {0}")]
    LengthOverflow(usize),
    /// ネストが深すぎる
    #[error("ネストが深すぎます（上限 {0}）")]
    DepthExceeded(usize),
    /// hexのデコードに失敗
    #[error("hexのデコードに失敗しました: {0}")]
    InvalidHex(String),
    /// 入力が途中で終わっている
    #[error("入力が途中で終わっています")]
    UnexpectedEnd,
    /// 未知の型プレフィックス
    #[error("不明な型プレフィックス: 0x{0:02x}")]
    UnknownTypePrefix(u8),
    /// string-utf8の中身がUTF-8でない
    #[error("UTF-8として不正な文字列です")]
    InvalidUtf8,
    /// タプルのキーが重複している
    #[error("タプルのキーが重複しています: {0}")]
    DuplicateTupleKey(String),
    /// 値の後ろに余分なバイトがある
    #[error("末尾に余分なバイトがあります: {0}バイト")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// hexヘルパー
// ---------------------------------------------------------------------------

/// 先頭の `0x` を1つだけ取り除く。それ以外は変更しない。
pub fn clean_hex(hex: &str) -> String {
    hex.strip_prefix("0x").unwrap_or(hex).to_string()
}

/// Clarity値をエンコードし、`0x` 付きの小文字hexで返す。
pub fn cv_to_hex(value: &ClarityValue) -> Result<String, ClarityError> {
    Ok(format!("0x{}", hex::encode(serialize(value)?)))
}

/// hex（`0x` 有無どちらも可）からClarity値をデコードする。
pub fn hex_to_cv(hex: &str) -> Result<ClarityValue, ClarityError> {
    let bytes = hex::decode(clean_hex(hex.trim()))
        .map_err(|e| ClarityError::InvalidHex(e.to_string()))?;
    deserialize(&bytes)
}

/// `<address>` または `<address>.<contract_name>` をプリンシパルとして解釈する。
pub fn parse_principal(text: &str) -> Result<ClarityValue, ClarityError> {
    match text.split_once('.') {
        Some((address, name)) => {
            if name.is_empty() || name.contains('.') {
                return Err(ClarityError::InvalidContractIdentifier(text.to_string()));
            }
            c32_address_decode(address)?;
            check_name(name)?;
            Ok(ClarityValue::contract_principal(address, name))
        }
        None => {
            c32_address_decode(text)?;
            Ok(ClarityValue::standard_principal(text))
        }
    }
}

// ---------------------------------------------------------------------------
// エンコード
// ---------------------------------------------------------------------------

/// Clarity値をコンセンサス用バイナリ表現にエンコードする。
pub fn serialize(value: &ClarityValue) -> Result<Vec<u8>, ClarityError> {
    let mut out = Vec::new();
    write_value(value, &mut out, 0)?;
    Ok(out)
}

fn check_name(name: &str) -> Result<(), ClarityError> {
    if name.is_empty() {
        return Err(ClarityError::EmptyName);
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ClarityError::NameTooLong {
            name: name.to_string(),
            length: name.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

fn write_len(len: usize, out: &mut Vec<u8>) -> Result<(), ClarityError> {
    let len = u32::try_from(len).map_err(|_| ClarityError::LengthOverflow(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_name(name: &str, out: &mut Vec<u8>) -> Result<(), ClarityError> {
    check_name(name)?;
    // MAX_NAME_LENGTH <= u8::MAX
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

fn write_address(address: &str, out: &mut Vec<u8>) -> Result<(), ClarityError> {
    let (version, hash160) = c32_address_decode(address)?;
    out.push(version);
    out.extend_from_slice(&hash160);
    Ok(())
}

fn write_value(value: &ClarityValue, out: &mut Vec<u8>, depth: usize) -> Result<(), ClarityError> {
    if depth > MAX_DEPTH {
        return Err(ClarityError::DepthExceeded(MAX_DEPTH));
    }

    match value {
        ClarityValue::Int(n) => {
            out.push(TypePrefix::Int as u8);
            out.extend_from_slice(&n.to_be_bytes());
        }
        ClarityValue::UInt(n) => {
            out.push(TypePrefix::UInt as u8);
            out.extend_from_slice(&n.to_be_bytes());
        }
        ClarityValue::Buffer(bytes) => {
            out.push(TypePrefix::Buffer as u8);
            write_len(bytes.len(), out)?;
            out.extend_from_slice(bytes);
        }
        ClarityValue::BoolTrue => out.push(TypePrefix::BoolTrue as u8),
        ClarityValue::BoolFalse => out.push(TypePrefix::BoolFalse as u8),
        ClarityValue::StandardPrincipal(address) => {
            out.push(TypePrefix::PrincipalStandard as u8);
            write_address(address, out)?;
        }
        ClarityValue::ContractPrincipal(ContractPrincipal {
            address,
            contract_name,
        }) => {
            out.push(TypePrefix::PrincipalContract as u8);
            write_address(address, out)?;
            write_name(contract_name, out)?;
        }
        ClarityValue::ResponseOk(inner) => {
            out.push(TypePrefix::ResponseOk as u8);
            write_value(inner, out, depth + 1)?;
        }
        ClarityValue::ResponseErr(inner) => {
            out.push(TypePrefix::ResponseErr as u8);
            write_value(inner, out, depth + 1)?;
        }
        ClarityValue::OptionalNone => out.push(TypePrefix::OptionalNone as u8),
        ClarityValue::OptionalSome(inner) => {
            out.push(TypePrefix::OptionalSome as u8);
            write_value(inner, out, depth + 1)?;
        }
        ClarityValue::List(items) => {
            out.push(TypePrefix::List as u8);
            write_len(items.len(), out)?;
            for item in items {
                write_value(item, out, depth + 1)?;
            }
        }
        ClarityValue::Tuple(entries) => {
            out.push(TypePrefix::Tuple as u8);
            write_len(entries.len(), out)?;
            // BTreeMap<String, _> の反復順はキーのバイト順
            for (key, item) in entries {
                write_name(key, out)?;
                write_value(item, out, depth + 1)?;
            }
        }
        ClarityValue::StringAscii(text) => {
            if !text.is_ascii() {
                return Err(ClarityError::NonAscii(text.clone()));
            }
            out.push(TypePrefix::StringAscii as u8);
            write_len(text.len(), out)?;
            out.extend_from_slice(text.as_bytes());
        }
        ClarityValue::StringUtf8(text) => {
            out.push(TypePrefix::StringUtf8 as u8);
            write_len(text.len(), out)?;
            out.extend_from_slice(text.as_bytes());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// デコード
// ---------------------------------------------------------------------------

/// バイナリ表現からClarity値を1つデコードする。末尾の余分なバイトはエラー。
pub fn deserialize(bytes: &[u8]) -> Result<ClarityValue, ClarityError> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = read_value(&mut reader, 0)?;
    let rest = reader.remaining();
    if rest > 0 {
        return Err(ClarityError::TrailingBytes(rest));
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        if self.remaining() < n {
            return Err(ClarityError::UnexpectedEnd);
        }
        let bytes = self.bytes;
        let slice = &bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<usize, ClarityError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf) as usize)
    }

    fn read_16(&mut self) -> Result<[u8; 16], ClarityError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn read_name(&mut self) -> Result<String, ClarityError> {
        let len = usize::from(self.read_u8()?);
        let raw = self.take(len)?;
        let name = std::str::from_utf8(raw).map_err(|_| ClarityError::InvalidUtf8)?;
        check_name(name)?;
        Ok(name.to_string())
    }

    fn read_address(&mut self) -> Result<String, ClarityError> {
        let version = self.read_u8()?;
        let mut hash160 = [0u8; HASH160_LENGTH];
        hash160.copy_from_slice(self.take(HASH160_LENGTH)?);
        Ok(c32_address(version, &hash160)?)
    }
}

fn read_value(reader: &mut Reader<'_>, depth: usize) -> Result<ClarityValue, ClarityError> {
    if depth > MAX_DEPTH {
        return Err(ClarityError::DepthExceeded(MAX_DEPTH));
    }

    let value = match TypePrefix::try_from(reader.read_u8()?)? {
        TypePrefix::Int => ClarityValue::Int(i128::from_be_bytes(reader.read_16()?)),
        TypePrefix::UInt => ClarityValue::UInt(u128::from_be_bytes(reader.read_16()?)),
        TypePrefix::Buffer => {
            let len = reader.read_u32()?;
            ClarityValue::Buffer(reader.take(len)?.to_vec())
        }
        TypePrefix::BoolTrue => ClarityValue::BoolTrue,
        TypePrefix::BoolFalse => ClarityValue::BoolFalse,
        TypePrefix::PrincipalStandard => ClarityValue::StandardPrincipal(reader.read_address()?),
        TypePrefix::PrincipalContract => {
            let address = reader.read_address()?;
            let contract_name = reader.read_name()?;
            ClarityValue::ContractPrincipal(ContractPrincipal {
                address,
                contract_name,
            })
        }
        TypePrefix::ResponseOk => ClarityValue::ok(read_value(reader, depth + 1)?),
        TypePrefix::ResponseErr => ClarityValue::err(read_value(reader, depth + 1)?),
        TypePrefix::OptionalNone => ClarityValue::OptionalNone,
        TypePrefix::OptionalSome => ClarityValue::some(read_value(reader, depth + 1)?),
        TypePrefix::List => {
            let len = reader.read_u32()?;
            // 各要素は最低1バイト
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                items.push(read_value(reader, depth + 1)?);
            }
            ClarityValue::List(items)
        }
        TypePrefix::Tuple => {
            let len = reader.read_u32()?;
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let key = reader.read_name()?;
                let item = read_value(reader, depth + 1)?;
                if entries.contains_key(&key) {
                    return Err(ClarityError::DuplicateTupleKey(key));
                }
                entries.insert(key, item);
            }
            ClarityValue::Tuple(entries)
        }
        TypePrefix::StringAscii => {
            let len = reader.read_u32()?;
            let raw = reader.take(len)?;
            if !raw.is_ascii() {
                return Err(ClarityError::NonAscii(String::from_utf8_lossy(raw).into_owned()));
            }
            ClarityValue::StringAscii(String::from_utf8_lossy(raw).into_owned())
        }
        TypePrefix::StringUtf8 => {
            let len = reader.read_u32()?;
            let raw = reader.take(len)?;
            let text = std::str::from_utf8(raw).map_err(|_| ClarityError::InvalidUtf8)?;
            ClarityValue::StringUtf8(text.to_string())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

    #[test]
    fn test_known_encodings() {
        let cases = [
            (ClarityValue::uint(1), "0x0100000000000000000000000000000001"),
            (ClarityValue::int(-1), "0x00ffffffffffffffffffffffffffffffff"),
            (ClarityValue::buffer(vec![0xde, 0xad]), "0x0200000002dead"),
            (ClarityValue::bool(true), "0x03"),
            (ClarityValue::bool(false), "0x04"),
            (ClarityValue::some(ClarityValue::none()), "0x0a09"),
            (ClarityValue::err(ClarityValue::bool(true)), "0x0803"),
            (
                ClarityValue::string_ascii("hello world"),
                "0x0d0000000b68656c6c6f20776f726c64",
            ),
            (ClarityValue::string_utf8("あ"), "0x0e00000003e38182"),
            (
                ClarityValue::standard_principal(ADDRESS),
                "0x0516a46ff88886c2ef9762d970b4d2c63678835bd39d",
            ),
            (
                ClarityValue::contract_principal(ADDRESS, "counter"),
                "0x0616a46ff88886c2ef9762d970b4d2c63678835bd39d07636f756e746572",
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(cv_to_hex(&value).unwrap(), expected, "{value:?}");
        }
    }

    #[test]
    fn test_list_encoding() {
        let value = ClarityValue::list([ClarityValue::int(1), ClarityValue::int(2)]);
        assert_eq!(
            cv_to_hex(&value).unwrap(),
            "0x0b0000000200000000000000000000000000000000010000000000000000000000000000000002"
        );
    }

    #[test]
    fn test_tuple_keys_are_sorted() {
        // 挿入順に関係なく a, b の順でエンコードされる
        let value = ClarityValue::tuple([
            ("b", ClarityValue::bool(true)),
            ("a", ClarityValue::ok(ClarityValue::uint(5))),
        ]);
        assert_eq!(
            cv_to_hex(&value).unwrap(),
            "0x0c000000020161070100000000000000000000000000000005016203"
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let value = ClarityValue::tuple([
            ("recipient", ClarityValue::standard_principal(ADDRESS)),
            ("amount", ClarityValue::uint(1_000_000)),
            ("memo", ClarityValue::some(ClarityValue::buffer(b"hi".to_vec()))),
        ]);
        let first = cv_to_hex(&value).unwrap();
        let second = cv_to_hex(&value.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(clean_hex(&first), clean_hex(&clean_hex(&first)));
    }

    #[test]
    fn test_clean_hex() {
        assert_eq!(clean_hex("0x0a09"), "0a09");
        assert_eq!(clean_hex("0a09"), "0a09");
        assert_eq!(clean_hex(""), "");
        // プレフィックスは1つだけ取り除く
        assert_eq!(clean_hex("0x0x01"), "0x01");
    }

    #[test]
    fn test_decode_known_values() {
        let value = hex_to_cv("0x0c000000020161070100000000000000000000000000000005016203").unwrap();
        assert_eq!(
            value,
            ClarityValue::tuple([
                ("a", ClarityValue::ok(ClarityValue::uint(5))),
                ("b", ClarityValue::bool(true)),
            ])
        );
        let principal =
            hex_to_cv("0616a46ff88886c2ef9762d970b4d2c63678835bd39d07636f756e746572").unwrap();
        assert_eq!(principal, ClarityValue::contract_principal(ADDRESS, "counter"));
    }

    #[test]
    fn test_decode_restores_nested_values() {
        let value = ClarityValue::list([
            ClarityValue::some(ClarityValue::string_utf8("日本語")),
            ClarityValue::err(ClarityValue::int(i128::MIN)),
            ClarityValue::tuple([("x", ClarityValue::uint(u128::MAX))]),
        ]);
        let bytes = serialize(&value).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(matches!(
            serialize(&ClarityValue::string_ascii("café")),
            Err(ClarityError::NonAscii(_))
        ));
    }

    #[test]
    fn test_invalid_principal_rejected() {
        assert!(matches!(
            serialize(&ClarityValue::standard_principal("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ8")),
            Err(ClarityError::InvalidPrincipal(C32Error::ChecksumMismatch(_)))
        ));
    }

    #[test]
    fn test_name_limits() {
        let long = "k".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            serialize(&ClarityValue::tuple([(long, ClarityValue::bool(true))])),
            Err(ClarityError::NameTooLong { .. })
        ));
        assert!(matches!(
            serialize(&ClarityValue::contract_principal(ADDRESS, "")),
            Err(ClarityError::EmptyName)
        ));
    }

    #[test]
    fn test_depth_limit_boundary() {
        let mut value = ClarityValue::none();
        for _ in 0..MAX_DEPTH {
            value = ClarityValue::some(value);
        }
        let bytes = serialize(&value).unwrap();
        assert_eq!(bytes.len(), MAX_DEPTH + 1);
        assert_eq!(deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_depth_limit() {
        let mut value = ClarityValue::none();
        for _ in 0..=MAX_DEPTH {
            value = ClarityValue::some(value);
        }
        assert!(matches!(
            serialize(&value),
            Err(ClarityError::DepthExceeded(MAX_DEPTH))
        ));

        let mut bytes = vec![0x0a; MAX_DEPTH + 1];
        bytes.push(0x09);
        assert!(matches!(
            deserialize(&bytes),
            Err(ClarityError::DepthExceeded(MAX_DEPTH))
        ));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(deserialize(&[]), Err(ClarityError::UnexpectedEnd)));
        assert!(matches!(
            deserialize(&[0x0f]),
            Err(ClarityError::UnknownTypePrefix(0x0f))
        ));
        assert!(matches!(
            deserialize(&[0x03, 0x03]),
            Err(ClarityError::TrailingBytes(1))
        ));
        assert!(matches!(
            deserialize(&[0x02, 0xff, 0xff, 0xff, 0xff]),
            Err(ClarityError::UnexpectedEnd)
        ));
        assert!(matches!(
            deserialize(&[0x0e, 0, 0, 0, 1, 0xff]),
            Err(ClarityError::InvalidUtf8)
        ));
        assert!(matches!(hex_to_cv("0xzz"), Err(ClarityError::InvalidHex(_))));
    }

    #[test]
    fn test_duplicate_tuple_key_rejected() {
        let bytes = hex::decode("0c00000002016103016104").unwrap();
        assert!(matches!(
            deserialize(&bytes),
            Err(ClarityError::DuplicateTupleKey(key)) if key == "a"
        ));
    }

    #[test]
    fn test_parse_principal() {
        assert_eq!(
            parse_principal(ADDRESS).unwrap(),
            ClarityValue::standard_principal(ADDRESS)
        );
        assert_eq!(
            parse_principal(&format!("{ADDRESS}.counter")).unwrap(),
            ClarityValue::contract_principal(ADDRESS, "counter")
        );
        assert!(matches!(
            parse_principal(&format!("{ADDRESS}.")),
            Err(ClarityError::InvalidContractIdentifier(_))
        ));
        assert!(parse_principal("not-an-address").is_err());
    }
}
