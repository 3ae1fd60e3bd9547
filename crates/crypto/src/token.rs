//! # ES256K トークン
//!
//! ウォレットに渡す署名付きトークン（JSON Web Token形式）の生成と検証。
//!
//! ## トークン形式
//! `base64url(header) || "." || base64url(claims) || "." || base64url(r || s)`
//!
//! - header: `{"typ":"JWT","alg":"ES256K"}`
//! - 署名: signing input（先頭2セグメント）のSHA-256に対するsecp256k1 ECDSA。
//!   ノンスはRFC 6979で決定論的に導出され、sはlow-Sに正規化される。

use base64::Engine;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::Signature;
use serde::{Deserialize, Serialize};

use crate::keys::{PrivateKey, PublicKey};
use crate::CryptoError;

/// 対応する唯一の署名アルゴリズム
pub const ALGORITHM: &str = "ES256K";

/// Base64エンジン（URL-safe、パディングなし）
fn b64url() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
}

/// トークンヘッダー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// 常に "JWT"
    pub typ: String,
    /// 署名アルゴリズム
    pub alg: String,
}

impl TokenHeader {
    fn es256k() -> Self {
        Self {
            typ: "JWT".to_string(),
            alg: ALGORITHM.to_string(),
        }
    }
}

/// デコード済みトークン。署名の検証は行っていない。
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub payload: serde_json::Value,
    /// `r || s` の64バイト
    pub signature: Vec<u8>,
    /// 署名対象（`header.payload`）
    pub signing_input: String,
}

/// クレームをES256Kで署名し、トークン文字列を返す。
pub fn sign_token<T: Serialize + ?Sized>(
    claims: &T,
    private_key: &PrivateKey,
) -> Result<String, CryptoError> {
    let header_json = serde_json::to_vec(&TokenHeader::es256k())
        .map_err(|e| CryptoError::Json(e.to_string()))?;
    let claims_json = serde_json::to_vec(claims).map_err(|e| CryptoError::Json(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        b64url().encode(header_json),
        b64url().encode(claims_json)
    );
    let signature: Signature = private_key.signing_key().sign(signing_input.as_bytes());

    Ok(format!(
        "{signing_input}.{}",
        b64url().encode(signature.to_bytes())
    ))
}

/// トークンを3つのセグメントに分解してデコードする。
pub fn decode_token(token: &str) -> Result<DecodedToken, CryptoError> {
    let token = token.trim();
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::MalformedToken(
            "セグメント数が3ではありません".to_string(),
        ));
    };

    let header_bytes = b64url()
        .decode(header_b64)
        .map_err(|e| CryptoError::MalformedToken(format!("ヘッダーのBase64デコードに失敗: {e}")))?;
    let header: TokenHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::MalformedToken(format!("ヘッダーのパースに失敗: {e}")))?;

    let payload_bytes = b64url().decode(payload_b64).map_err(|e| {
        CryptoError::MalformedToken(format!("ペイロードのBase64デコードに失敗: {e}"))
    })?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| CryptoError::MalformedToken(format!("ペイロードのパースに失敗: {e}")))?;

    let signature = b64url()
        .decode(signature_b64)
        .map_err(|e| CryptoError::MalformedToken(format!("署名のBase64デコードに失敗: {e}")))?;

    Ok(DecodedToken {
        header,
        payload,
        signature,
        signing_input: format!("{header_b64}.{payload_b64}"),
    })
}

/// トークンをデコードし、指定された公開鍵で署名を検証する。
pub fn verify_token(token: &str, public_key: &PublicKey) -> Result<DecodedToken, CryptoError> {
    let decoded = decode_token(token)?;
    if decoded.header.alg != ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(decoded.header.alg));
    }

    let signature =
        Signature::from_slice(&decoded.signature).map_err(|_| CryptoError::SignatureVerifyError)?;
    public_key
        .verifying_key()
        .verify(decoded.signing_input.as_bytes(), &signature)
        .map_err(|_| CryptoError::SignatureVerifyError)?;

    Ok(decoded)
}
