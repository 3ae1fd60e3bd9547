//! # stx-token Core
//!
//! ウォレット認証フロー向けのトランザクショントークンを構築する。
//!
//! ## 処理フロー（コントラクト呼び出し）
//! 1. 秘密鍵から圧縮公開鍵を導出する
//! 2. 関数引数をhexに正規化する（文字列はそのまま、Clarity値はエンコードする）
//! 3. 呼び出し元オプション・正規化済み引数・種別タグ・公開鍵からペイロードを組み立てる
//! 4. 署名器にペイロードを渡し、署名済みトークンを得る
//!
//! 鍵導出・エンコード・署名の各段で発生したエラーは、変換せずに呼び出し元へ返す。

pub mod builder;
pub mod c32;
pub mod clarity;
pub mod signer;

pub use builder::{
    build_contract_call_payload, build_contract_deploy_payload, build_stx_transfer_payload,
    make_contract_call_token, make_contract_call_token_with, make_contract_deploy_token,
    make_contract_deploy_token_with, make_stx_transfer_token, make_stx_transfer_token_with,
    normalize_function_arg, normalize_function_args,
};
pub use clarity::{clean_hex, cv_to_hex, hex_to_cv, parse_principal, ClarityError};
pub use signer::{PayloadSigner, TokenSigner};

/// Coreモジュールのエラー型。
/// 下位層のエラーをそのまま保持する。
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// 鍵導出・署名のエラー
    #[error(transparent)]
    Crypto(#[from] stx_token_crypto::CryptoError),
    /// 関数引数のエンコードエラー
    #[error(transparent)]
    Clarity(#[from] ClarityError),
}
