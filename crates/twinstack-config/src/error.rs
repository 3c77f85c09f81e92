use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "デプロイメント定義ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: twinstack.local.kdl, .twinstack.local.kdl, twinstack.kdl, .twinstack.kdl\n\
        - ./.twinstack/ ディレクトリ\n\
        - ~/.config/twinstack/twinstack.kdl\n\
        または TWINSTACK_CONFIG_PATH 環境変数で直接指定できます\n\
        ひな形は `twin init` で作成できます"
    )]
    DeploymentFileNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
