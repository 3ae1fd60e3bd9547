//! # stx-token CLI
//!
//! ウォレット認証フロー向けトランザクショントークンの生成・検査ツール。
//!
//! ## コマンド
//! - `contract-call` / `stx-transfer` / `contract-deploy`: オプションJSONからトークンを生成
//! - `decode`: トークンのヘッダーとペイロードを表示
//! - `verify`: ペイロード内の公開鍵で署名を検証
//! - `public-key`: 秘密鍵から圧縮公開鍵を導出
//! - `encode-arg`: Clarity値(JSON)をhexにエンコード
//!
//! 秘密鍵は `--private-key` か環境変数 `STX_PRIVATE_KEY` で渡す。
//! ログは `RUST_LOG` で制御し、標準エラーに出力する。

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use stx_token_types::StacksNetwork;
use tracing_subscriber::EnvFilter;

/// stx-token CLI
#[derive(Parser, Debug)]
#[command(name = "stx-token", version, about, long_about = None)]
pub struct Cli {
    /// 署名に使う秘密鍵（hex、64文字または末尾01付き66文字）
    #[arg(long, env = "STX_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// オプションに network が無い場合に使うネットワーク
    #[arg(long, value_enum, global = true)]
    pub network: Option<NetworkArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// コントラクト呼び出しトークンを生成する
    ContractCall {
        /// ContractCallTxOptions のJSONファイル
        #[arg(long)]
        options: PathBuf,
    },
    /// STX送金トークンを生成する
    StxTransfer {
        /// StxTransferTxOptions のJSONファイル
        #[arg(long)]
        options: PathBuf,
    },
    /// コントラクトデプロイトークンを生成する
    ContractDeploy {
        /// ContractDeployTxOptions のJSONファイル
        #[arg(long)]
        options: PathBuf,
        /// codeBody をこのClarityソースファイルの内容で置き換える
        #[arg(long)]
        code: Option<PathBuf>,
    },
    /// トークンをデコードして表示する（署名は検証しない）
    Decode {
        token: String,
    },
    /// ペイロード内の publicKey で署名を検証する
    Verify {
        token: String,
    },
    /// 秘密鍵から圧縮公開鍵を導出する
    PublicKey,
    /// Clarity値のJSONをhexにエンコードする
    EncodeArg {
        /// 例: '{"type":"uint","value":"1"}'
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkArg {
    Mainnet,
    Testnet,
}

impl From<NetworkArg> for StacksNetwork {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::Mainnet => StacksNetwork::mainnet(),
            NetworkArg::Testnet => StacksNetwork::testnet(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = commands::run(cli).await?;
    println!("{output}");
    Ok(())
}
