pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 定義ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "TWINSTACK_CONFIG_PATH";

/// プロジェクト内の作業ディレクトリ名（状態ファイルもここに置く）
pub const PROJECT_DIR: &str = ".twinstack";

/// 検索するファイル名（優先順）
const CANDIDATES: [&str; 4] = [
    "twinstack.local.kdl",
    ".twinstack.local.kdl",
    "twinstack.kdl",
    ".twinstack.kdl",
];

/// カレントディレクトリからデプロイメント定義ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 TWINSTACK_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: twinstack.local.kdl, .twinstack.local.kdl, twinstack.kdl, .twinstack.kdl
/// 3. ./.twinstack/ ディレクトリ内: 同様の順序
/// 4. ~/.config/twinstack/twinstack.kdl (グローバル設定)
pub fn find_deployment_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_deployment_file_from(&current_dir)
}

/// 指定ディレクトリを起点にデプロイメント定義ファイルを探す
pub fn find_deployment_file_from(dir: &Path) -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Using deployment file from environment");
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_ENV);
    }

    // 2. 指定ディレクトリで検索
    if let Some(path) = first_existing(dir) {
        return Ok(path);
    }

    // 3. ./.twinstack/ ディレクトリで検索
    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_existing(&project_dir)
    {
        return Ok(path);
    }

    // 4. グローバル設定ファイル (~/.config/twinstack/twinstack.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("twinstack").join("twinstack.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::DeploymentFileNotFound)
}

/// 定義ファイルからプロジェクトルートを求める
///
/// `.twinstack/` 内に置かれている場合はその親ディレクトリをルートとする。
pub fn project_root_for(deployment_file: &Path) -> PathBuf {
    let parent = deployment_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if parent.file_name().and_then(|n| n.to_str()) == Some(PROJECT_DIR) {
        parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(parent)
    } else {
        parent
    }
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
