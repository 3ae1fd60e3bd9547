//! # c32check アドレス
//!
//! Stacksアドレス（`S` + バージョン文字 + c32(hash160 || checksum)）のエンコードとデコード。
//! checksumは `sha256d(version || hash160)` の先頭4バイト。

use stx_token_crypto::sha256d;

/// Crockford系のc32アルファベット（I, L, O, Uを除く）
const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// アドレスの先頭文字
const ADDRESS_PREFIX: char = 'S';

/// hash160のバイト長
pub const HASH160_LENGTH: usize = 20;

const CHECKSUM_LENGTH: usize = 4;

/// mainnet 単一署名
pub const VERSION_MAINNET_SINGLE_SIG: u8 = 22;
/// mainnet マルチシグ
pub const VERSION_MAINNET_MULTI_SIG: u8 = 20;
/// testnet 単一署名
pub const VERSION_TESTNET_SINGLE_SIG: u8 = 26;
/// testnet マルチシグ
pub const VERSION_TESTNET_MULTI_SIG: u8 = 21;

/// アドレスバージョンがmainnetのものか判定する。未知のバージョンは `None`。
pub fn is_mainnet_version(version: u8) -> Option<bool> {
    match version {
        VERSION_MAINNET_SINGLE_SIG | VERSION_MAINNET_MULTI_SIG => Some(true),
        VERSION_TESTNET_SINGLE_SIG | VERSION_TESTNET_MULTI_SIG => Some(false),
        _ => None,
    }
}

/// c32処理のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum C32Error {
    /// c32アルファベット外の文字
    #[error("c32として不正な文字です: {0:?}")]
    InvalidCharacter(char),
    /// アドレスが短すぎる
    #[error("アドレスが短すぎます: {0}")]
    TooShort(String),
    /// 先頭が 'S' でない
    #[error("アドレスの先頭が 'S' ではありません: {0}")]
    InvalidPrefix(String),
    /// バージョンが5ビットに収まらない
    #[error("アドレスバージョンが範囲外です: {0}")]
    InvalidVersion(u8),
    /// デコード結果の長さが不正
    #[error("hash160の長さが不正です: {0}バイト")]
    InvalidLength(usize),
    /// チェックサム不一致
    #[error("チェックサムが一致しません: {0}")]
    ChecksumMismatch(String),
}

/// 入力の表記揺れを吸収する（小文字、O→0、L/I→1）。
fn normalize(input: &str) -> String {
    input
        .to_ascii_uppercase()
        .chars()
        .map(|c| match c {
            'O' => '0',
            'L' | 'I' => '1',
            other => other,
        })
        .collect()
}

fn digit_value(c: char) -> Result<u8, C32Error> {
    C32_ALPHABET
        .iter()
        .position(|&a| a as char == c)
        .map(|i| i as u8)
        .ok_or(C32Error::InvalidCharacter(c))
}

/// バイト列をc32文字列にエンコードする。
/// 先頭のゼロバイト1つにつき '0' を1文字付与する。
pub fn c32_encode(data: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits = 0;

    for &byte in data.iter().rev() {
        carry |= u16::from(byte) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(C32_ALPHABET[usize::from(carry & 0x1f)]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[usize::from(carry & 0x1f)]);
    }

    while out.last() == Some(&b'0') {
        out.pop();
    }
    let leading_zero_bytes = data.iter().take_while(|b| **b == 0).count();
    out.extend(std::iter::repeat(b'0').take(leading_zero_bytes));

    out.iter().rev().map(|&b| b as char).collect()
}

/// c32文字列をバイト列にデコードする。
pub fn c32_decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let normalized = normalize(input);
    let digits = normalized
        .chars()
        .map(digit_value)
        .collect::<Result<Vec<u8>, _>>()?;

    let mut out: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits = 0;

    for &digit in digits.iter().rev() {
        carry |= u16::from(digit) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        out.push((carry & 0xff) as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    let leading_zero_chars = normalized.chars().take_while(|c| *c == '0').count();
    out.extend(std::iter::repeat(0).take(leading_zero_chars));

    out.reverse();
    Ok(out)
}

fn checksum(version: u8, hash160: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let mut data = Vec::with_capacity(1 + hash160.len());
    data.push(version);
    data.extend_from_slice(hash160);
    let digest = sha256d(&data);
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&digest[..CHECKSUM_LENGTH]);
    out
}

/// バージョンとhash160からアドレスを構築する。
pub fn c32_address(version: u8, hash160: &[u8; HASH160_LENGTH]) -> Result<String, C32Error> {
    if version >= 32 {
        return Err(C32Error::InvalidVersion(version));
    }
    let mut data = hash160.to_vec();
    data.extend_from_slice(&checksum(version, hash160));
    Ok(format!(
        "{ADDRESS_PREFIX}{}{}",
        C32_ALPHABET[usize::from(version)] as char,
        c32_encode(&data)
    ))
}

/// アドレスをバージョンとhash160に分解する。チェックサムも検証する。
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; HASH160_LENGTH]), C32Error> {
    let address = address.trim();
    if address.len() <= 5 {
        return Err(C32Error::TooShort(address.to_string()));
    }
    let mut chars = address.chars();
    if chars.next() != Some(ADDRESS_PREFIX) {
        return Err(C32Error::InvalidPrefix(address.to_string()));
    }
    let version_char = chars
        .next()
        .ok_or_else(|| C32Error::TooShort(address.to_string()))?;
    let version = digit_value(version_char.to_ascii_uppercase())?;

    let decoded = c32_decode(chars.as_str())?;
    if decoded.len() != HASH160_LENGTH + CHECKSUM_LENGTH {
        return Err(C32Error::InvalidLength(
            decoded.len().saturating_sub(CHECKSUM_LENGTH),
        ));
    }
    let (hash, expected) = decoded.split_at(HASH160_LENGTH);
    if checksum(version, hash) != expected {
        return Err(C32Error::ChecksumMismatch(address.to_string()));
    }

    let mut hash160 = [0u8; HASH160_LENGTH];
    hash160.copy_from_slice(hash);
    Ok((version, hash160))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "a46ff88886c2ef9762d970b4d2c63678835bd39d";
    const MAINNET_ADDRESS: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

    fn hash() -> [u8; HASH160_LENGTH] {
        hex::decode(HASH).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_address_known_answers() {
        assert_eq!(
            c32_address(VERSION_MAINNET_SINGLE_SIG, &hash()).unwrap(),
            MAINNET_ADDRESS
        );
        assert_eq!(
            c32_address(VERSION_TESTNET_SINGLE_SIG, &hash()).unwrap(),
            "ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ"
        );
        assert_eq!(
            c32_address(VERSION_MAINNET_MULTI_SIG, &hash()).unwrap(),
            "SM2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQVX8X0G"
        );
    }

    #[test]
    fn test_burn_address_keeps_leading_zeros() {
        let zero = [0u8; HASH160_LENGTH];
        let address = c32_address(VERSION_MAINNET_SINGLE_SIG, &zero).unwrap();
        assert_eq!(address, "SP000000000000000000002Q6VF78");
        assert_eq!(
            c32_address_decode(&address).unwrap(),
            (VERSION_MAINNET_SINGLE_SIG, zero)
        );
    }

    #[test]
    fn test_decode_known_address() {
        let (version, decoded) = c32_address_decode(MAINNET_ADDRESS).unwrap();
        assert_eq!(version, VERSION_MAINNET_SINGLE_SIG);
        assert_eq!(hex::encode(decoded), HASH);
    }

    #[test]
    fn test_decode_is_lenient_about_case() {
        let lower = format!("S{}", MAINNET_ADDRESS[1..].to_ascii_lowercase());
        assert_eq!(
            c32_address_decode(&lower).unwrap(),
            c32_address_decode(MAINNET_ADDRESS).unwrap()
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut broken = MAINNET_ADDRESS.to_string();
        broken.pop();
        broken.push('8');
        assert!(matches!(
            c32_address_decode(&broken),
            Err(C32Error::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(matches!(c32_address_decode("SP1"), Err(C32Error::TooShort(_))));
        assert!(matches!(
            c32_address_decode("XP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7"),
            Err(C32Error::InvalidPrefix(_))
        ));
        assert!(matches!(
            c32_address_decode("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJU"),
            Err(C32Error::InvalidCharacter('U'))
        ));
        assert!(matches!(
            c32_address(32, &hash()),
            Err(C32Error::InvalidVersion(32))
        ));
    }

    #[test]
    fn test_encode_decode_bytes() {
        for data in [
            vec![],
            vec![0u8],
            vec![0, 0, 1],
            vec![0xff; 7],
            hex::decode(HASH).unwrap(),
        ] {
            assert_eq!(c32_decode(&c32_encode(&data)).unwrap(), data);
        }
    }

    #[test]
    fn test_mainnet_version_classification() {
        assert_eq!(is_mainnet_version(VERSION_MAINNET_SINGLE_SIG), Some(true));
        assert_eq!(is_mainnet_version(VERSION_MAINNET_MULTI_SIG), Some(true));
        assert_eq!(is_mainnet_version(VERSION_TESTNET_SINGLE_SIG), Some(false));
        assert_eq!(is_mainnet_version(VERSION_TESTNET_MULTI_SIG), Some(false));
        assert_eq!(is_mainnet_version(0), None);

        let address = c32_address(VERSION_TESTNET_MULTI_SIG, &hash()).unwrap();
        assert!(address.starts_with("SN"));
        assert_eq!(c32_address_decode(&address).unwrap().0, VERSION_TESTNET_MULTI_SIG);
    }
}
