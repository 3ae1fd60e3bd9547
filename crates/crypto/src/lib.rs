//! # stx-token 暗号処理
//!
//! トランザクショントークンの署名に必要な暗号処理を提供する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 鍵 | secp256k1 |
//! | 公開鍵形式 | SEC1 圧縮形式（33バイト） |
//! | トークン署名 | ES256K（ECDSA + SHA-256, RFC 6979, low-S） |
//! | チェックサム | SHA-256 / ダブルSHA-256 |

pub mod keys;
pub mod token;

use sha2::{Digest, Sha256};

pub use keys::{PrivateKey, PublicKey};
pub use token::{decode_token, sign_token, verify_token, DecodedToken, TokenHeader};

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// hexのデコードに失敗
    #[error("hexのデコードに失敗しました: {0}")]
    InvalidHex(String),
    /// 秘密鍵の長さが不正（32バイト、または末尾0x01付きの33バイトのみ許可）
    #[error("秘密鍵の長さが不正です: {0}バイト")]
    InvalidKeyLength(usize),
    /// 秘密鍵がsecp256k1のスカラー範囲外
    #[error("秘密鍵がsecp256k1の有効範囲外です")]
    InvalidPrivateKey,
    /// 公開鍵のパースに失敗
    #[error("公開鍵のパースに失敗しました")]
    InvalidPublicKey,
    /// クレームのシリアライズ・デシリアライズに失敗
    #[error("JSONの処理に失敗しました: {0}")]
    Json(String),
    /// トークンの形式が不正
    #[error("トークンの形式が不正です: {0}")]
    MalformedToken(String),
    /// 未対応の署名アルゴリズム
    #[error("未対応の署名アルゴリズム: {0}")]
    UnsupportedAlgorithm(String),
    /// 署名検証エラー
    #[error("署名検証に失敗しました")]
    SignatureVerifyError,
}

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// ダブルSHA-256。c32checkのチェックサムに使う。
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}
