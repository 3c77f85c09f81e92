//! twinstack core
//!
//! 2リージョン構成（データベース層 + アプリ層）のデプロイメント定義を扱います。
//!
//! - `model`: リージョンごとのリソース定義
//! - `parser`: KDL 定義ファイルのパース
//! - `template`: インスタンス起動スクリプトの展開
//! - `starter`: `twin init` 用のひな形

pub mod error;
pub mod model;
pub mod parser;
pub mod starter;
pub mod template;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_deployment_file, parse_deployment_str};
pub use template::{DATABASE_IP_VAR, UserDataRenderer};
