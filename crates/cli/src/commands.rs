//! # サブコマンドの実行

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use stx_token_core::{
    cv_to_hex, make_contract_call_token, make_contract_deploy_token, make_stx_transfer_token,
};
use stx_token_crypto::{decode_token, verify_token, PrivateKey, PublicKey};
use stx_token_types::{
    ClarityValue, ContractCallTxOptions, ContractDeployTxOptions, StacksNetwork,
    StxTransferTxOptions, TxOptionsBase,
};

use crate::{Cli, Command};

/// コマンドを実行し、標準出力に書く文字列を返す。
pub(crate) async fn run(cli: Cli) -> anyhow::Result<String> {
    let network = cli.network.map(StacksNetwork::from);
    let private_key = cli.private_key.as_deref();

    match cli.command {
        Command::ContractCall { options } => {
            let mut options: ContractCallTxOptions = read_options(&options)?;
            apply_default_network(&mut options.base, network);
            tracing::info!(
                contract = %format!("{}.{}", options.contract_address, options.contract_name),
                function = %options.function_name,
                "コントラクト呼び出しトークンを生成します"
            );
            Ok(make_contract_call_token(&options, require_private_key(private_key)?).await?)
        }
        Command::StxTransfer { options } => {
            let mut options: StxTransferTxOptions = read_options(&options)?;
            apply_default_network(&mut options.base, network);
            tracing::info!(recipient = %options.recipient, "STX送金トークンを生成します");
            Ok(make_stx_transfer_token(&options, require_private_key(private_key)?).await?)
        }
        Command::ContractDeploy { options, code } => {
            let mut options: ContractDeployTxOptions = read_options(&options)?;
            if let Some(path) = code {
                options.code_body = std::fs::read_to_string(&path)
                    .with_context(|| format!("ソースファイルの読み込みに失敗: {}", path.display()))?;
            }
            apply_default_network(&mut options.base, network);
            tracing::info!(contract_name = %options.contract_name, "コントラクトデプロイトークンを生成します");
            Ok(make_contract_deploy_token(&options, require_private_key(private_key)?).await?)
        }
        Command::Decode { token } => {
            let decoded = decode_token(&token)?;
            let view = serde_json::json!({
                "header": decoded.header,
                "payload": decoded.payload,
            });
            Ok(serde_json::to_string_pretty(&view)?)
        }
        Command::Verify { token } => {
            let decoded = decode_token(&token)?;
            let public_key_hex = decoded
                .payload
                .get("publicKey")
                .and_then(|v| v.as_str())
                .context("ペイロードに publicKey がありません")?;
            let public_key = PublicKey::from_hex(public_key_hex)?;
            verify_token(&token, &public_key)?;
            Ok(format!("署名は有効です (publicKey: {})", public_key.to_hex()))
        }
        Command::PublicKey => {
            let key = PrivateKey::from_hex(require_private_key(private_key)?)?;
            Ok(key.public_key_hex())
        }
        Command::EncodeArg { value } => {
            let value: ClarityValue =
                serde_json::from_str(&value).context("Clarity値のJSONとして解釈できません")?;
            Ok(cv_to_hex(&value)?)
        }
    }
}

fn require_private_key(private_key: Option<&str>) -> anyhow::Result<&str> {
    private_key.context("秘密鍵が指定されていません（--private-key または STX_PRIVATE_KEY）")
}

fn read_options<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("オプションファイルの読み込みに失敗: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("オプションファイルのパースに失敗: {}", path.display()))
}

/// オプションにネットワークが無い場合のみ既定値で補う。
fn apply_default_network(base: &mut TxOptionsBase, network: Option<StacksNetwork>) {
    if base.network.is_none() {
        base.network = network;
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../core/tests/fixtures/contract_call.json"
    );
    const STACKS_KEY: &str = "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc01";
    const STACKS_PUBKEY: &str = "03ef788b3830c00abe8f64f62dc32fc863bc0b2cafeb073b6c8e1c7657d9c2c3ab";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stx-token").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_contract_call_then_verify() {
        let token = run(parse(&[
            "--private-key",
            STACKS_KEY,
            "contract-call",
            "--options",
            FIXTURE,
        ]))
        .await
        .unwrap();

        let verified = run(parse(&["verify", &token])).await.unwrap();
        assert!(verified.contains(STACKS_PUBKEY));

        let decoded = run(parse(&["decode", &token])).await.unwrap();
        let view: serde_json::Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(view["header"]["alg"], "ES256K");
        assert_eq!(view["payload"]["txType"], "contract_call");
    }

    #[tokio::test]
    async fn test_public_key_command() {
        let output = run(parse(&["public-key", "--private-key", STACKS_KEY]))
            .await
            .unwrap();
        assert_eq!(output, STACKS_PUBKEY);
    }

    #[tokio::test]
    async fn test_encode_arg_command() {
        let output = run(parse(&["encode-arg", r#"{"type":"uint","value":"1"}"#]))
            .await
            .unwrap();
        assert_eq!(output, "0x0100000000000000000000000000000001");
    }

    #[tokio::test]
    async fn test_missing_options_file() {
        let result = run(parse(&[
            "--private-key",
            STACKS_KEY,
            "stx-transfer",
            "--options",
            "/nonexistent/options.json",
        ]))
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_default_network_only_fills_gaps() {
        let mut base = TxOptionsBase::default();
        apply_default_network(&mut base, Some(StacksNetwork::testnet()));
        assert_eq!(base.network, Some(StacksNetwork::testnet()));

        apply_default_network(&mut base, Some(StacksNetwork::mainnet()));
        assert_eq!(base.network, Some(StacksNetwork::testnet()));
    }

    #[test]
    fn test_network_flag_parses() {
        let cli = parse(&["--network", "testnet", "public-key"]);
        assert_eq!(cli.network, Some(crate::NetworkArg::Testnet));
    }
}
