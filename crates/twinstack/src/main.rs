mod commands;
mod tasks;
mod utils;

use clap::{Parser, Subcommand};
use twinstack_core::StackRole;

#[derive(Parser)]
#[command(name = "twin")]
#[command(about = "ふたつのリージョンを、ひとつの定義で。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// データベース層とアプリ層を構築
    /// 既存のリソースは削除してから作り直す
    Up {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
        /// 片方のリージョンだけ構築 (database, app)
        #[arg(long, value_name = "ROLE")]
        only: Option<StackRole>,
    },
    /// 実行計画を表示
    Plan,
    /// 全リソースを削除（アプリ層 → データベース層）
    Down {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 状態ファイルとロードバランサーを表示
    Status,
    /// タスクAPIの対話クライアント
    Tasks {
        /// タスクAPIのURL（省略時はロードバランサーから解決）
        #[arg(long, env = "TWINSTACK_TASKS_URL")]
        url: Option<String>,
    },
    /// 設定を検証
    Validate,
    /// ひな形（twinstack.kdl と起動スクリプト）を作成
    Init {
        /// 既存ファイルを上書き
        #[arg(short, long)]
        force: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（RUST_LOG で調整）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        // 設定ファイル不要のコマンド
        Commands::Version => {
            println!("twinstack {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Init { force } => {
            commands::init::handle(&std::env::current_dir()?, force)?;
        }
        Commands::Validate => {
            commands::validate::handle();
        }
        Commands::Tasks { url: Some(url) } => {
            tasks::run(&url).await?;
        }

        // 設定ファイルが必要なコマンド
        Commands::Up { yes, only } => {
            let (deployment, project_root) = utils::load_deployment()?;
            commands::up::handle(&deployment, &project_root, only, yes).await?;
        }
        Commands::Plan => {
            let (deployment, _) = utils::load_deployment()?;
            commands::plan::handle(&deployment)?;
        }
        Commands::Down { yes } => {
            let (deployment, project_root) = utils::load_deployment()?;
            commands::down::handle(&deployment, &project_root, yes).await?;
        }
        Commands::Status => {
            let (deployment, project_root) = utils::load_deployment()?;
            commands::status::handle(&deployment, &project_root).await?;
        }
        Commands::Tasks { url: None } => {
            let (deployment, project_root) = utils::load_deployment()?;
            commands::tasks::handle(&deployment, &project_root).await?;
        }
    }

    Ok(())
}
