//! # secp256k1 鍵
//!
//! 秘密鍵のパースと圧縮公開鍵の導出。
//!
//! 秘密鍵のhex表現は2種類を受け付ける:
//! - 64文字（32バイト）
//! - 66文字（32バイト + 圧縮公開鍵を示す末尾 `01`）

use k256::ecdsa::{SigningKey, VerifyingKey};

use crate::CryptoError;

/// 圧縮公開鍵のバイト長
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

/// 秘密鍵の本体のバイト長
const PRIVATE_KEY_LENGTH: usize = 32;

/// 圧縮形式を示す秘密鍵末尾のマーカー
const COMPRESSED_MARKER: u8 = 0x01;

/// secp256k1秘密鍵。
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// hex文字列から秘密鍵をパースする。`0x` プレフィックスは無視する。
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        let body = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// バイト列から秘密鍵を構築する。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let scalar = match bytes.len() {
            PRIVATE_KEY_LENGTH => bytes,
            33 if bytes[PRIVATE_KEY_LENGTH] == COMPRESSED_MARKER => &bytes[..PRIVATE_KEY_LENGTH],
            len => return Err(CryptoError::InvalidKeyLength(len)),
        };
        let signing_key =
            SigningKey::from_slice(scalar).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// 対応する公開鍵
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key().clone(),
        }
    }

    /// 圧縮形式の公開鍵（33バイト）
    pub fn compressed_public_key(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        self.public_key().to_compressed()
    }

    /// 圧縮形式の公開鍵（小文字hex）
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.compressed_public_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// secp256k1公開鍵。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// SEC1形式（圧縮・非圧縮どちらも可）のhexからパースする。
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        let body = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_sec1_bytes(&bytes)
    }

    /// SEC1形式のバイト列からパースする。
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }

    /// 圧縮形式（33バイト）
    pub fn to_compressed(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        let point = self.verifying_key.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// 圧縮形式の小文字hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 秘密鍵 1 の公開鍵はベースポイントGそのもの
    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    const STACKS_KEY: &str = "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc01";
    const STACKS_PUBKEY: &str = "03ef788b3830c00abe8f64f62dc32fc863bc0b2cafeb073b6c8e1c7657d9c2c3ab";

    #[test]
    fn test_public_key_of_one_is_generator() {
        let key = PrivateKey::from_hex(KEY_ONE).unwrap();
        assert_eq!(key.public_key_hex(), G_COMPRESSED);
    }

    #[test]
    fn test_known_public_keys() {
        let two = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000002",
        )
        .unwrap();
        assert_eq!(
            two.public_key_hex(),
            "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5"
        );
        let three = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000003",
        )
        .unwrap();
        assert_eq!(
            three.public_key_hex(),
            "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );
    }

    #[test]
    fn test_compressed_marker_suffix_is_accepted() {
        let with_marker = PrivateKey::from_hex(STACKS_KEY).unwrap();
        let without_marker = PrivateKey::from_hex(&STACKS_KEY[..64]).unwrap();
        assert_eq!(with_marker.public_key_hex(), STACKS_PUBKEY);
        assert_eq!(without_marker.public_key_hex(), STACKS_PUBKEY);
    }

    #[test]
    fn test_prefix_and_whitespace_are_ignored() {
        let key = PrivateKey::from_hex(&format!("  0x{KEY_ONE}\n")).unwrap();
        assert_eq!(key.public_key_hex(), G_COMPRESSED);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for _ in 0..8 {
            let bytes: [u8; 32] = rand::random();
            let Ok(a) = PrivateKey::from_bytes(&bytes) else {
                continue;
            };
            let b = PrivateKey::from_hex(&hex::encode(bytes)).unwrap();
            assert_eq!(a.compressed_public_key(), b.compressed_public_key());
            let prefix = a.compressed_public_key()[0];
            assert!(prefix == 0x02 || prefix == 0x03);
        }
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 31]),
            Err(CryptoError::InvalidKeyLength(31))
        ));
        // 33バイト目が0x01以外
        let mut bytes = [1u8; 33];
        bytes[32] = 0x02;
        assert!(matches!(
            PrivateKey::from_bytes(&bytes),
            Err(CryptoError::InvalidKeyLength(33))
        ));
    }

    #[test]
    fn test_out_of_range_scalars() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey)
        ));
        // 曲線の位数 n
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        assert!(matches!(
            PrivateKey::from_hex(order),
            Err(CryptoError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            PrivateKey::from_hex("zz"),
            Err(CryptoError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_public_key_roundtrip_from_hex() {
        let key = PrivateKey::from_hex(STACKS_KEY).unwrap();
        let public = PublicKey::from_hex(STACKS_PUBKEY).unwrap();
        assert_eq!(key.public_key(), public);
        assert!(PublicKey::from_hex("02").is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let key = PrivateKey::from_hex(STACKS_KEY).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(&STACKS_KEY[..64]));
        assert!(debug.contains(STACKS_PUBKEY));
    }
}
