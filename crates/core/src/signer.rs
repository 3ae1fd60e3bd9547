//! # ペイロード署名器
//!
//! 組み立て済みペイロードを署名済みトークンに変換する処理の抽象。
//! 既定の実装は ES256K トークンを生成する [`TokenSigner`]。

use stx_token_crypto::{sign_token, CryptoError, PrivateKey};
use stx_token_types::TransactionPayload;

/// ペイロード署名の抽象インターフェース。
///
/// ペイロードの組み立てと署名を分離し、ハードウェアウォレットや
/// リモート署名サービスへの差し替えを可能にする。
#[async_trait::async_trait]
pub trait PayloadSigner: Send + Sync {
    /// ペイロードに署名し、トークン文字列を返す。
    async fn sign_payload(
        &self,
        payload: &TransactionPayload,
        private_key: &PrivateKey,
    ) -> Result<String, CryptoError>;
}

/// ES256K（secp256k1 + SHA-256）でJWT形式のトークンを生成する署名器。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSigner;

#[async_trait::async_trait]
impl PayloadSigner for TokenSigner {
    async fn sign_payload(
        &self,
        payload: &TransactionPayload,
        private_key: &PrivateKey,
    ) -> Result<String, CryptoError> {
        sign_token(payload, private_key)
    }
}
