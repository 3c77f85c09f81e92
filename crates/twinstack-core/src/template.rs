//! ユーザーデータのテンプレート展開
//!
//! Teraを使用してインスタンス起動スクリプトを展開します。
//! アプリ層のスクリプトはデータベースのIPアドレスを `{{ database_ip }}` で参照できます。

use crate::error::{CoreError, Result};
use crate::model::{Deployment, RegionStack};
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

/// データベースインスタンスのパブリックIPを参照する変数名
pub const DATABASE_IP_VAR: &str = "database_ip";

/// ユーザーデータ展開器
pub struct UserDataRenderer {
    tera: Tera,
    context: Context,
}

impl UserDataRenderer {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// デプロイメントの variables とプロジェクト名をコンテキストに入れて作成
    pub fn for_deployment(deployment: &Deployment) -> Self {
        let mut renderer = Self::new();
        renderer.add_variable("project", &deployment.name);
        for (key, value) in &deployment.variables {
            renderer.add_variable(key, value);
        }
        renderer
    }

    /// 変数を追加
    pub fn add_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context
            .insert(key.into(), &serde_json::Value::String(value.into()));
    }

    /// データベースのIPアドレスを設定
    pub fn set_database_ip(&mut self, ip: impl Into<String>) {
        self.add_variable(DATABASE_IP_VAR, ip);
    }

    /// 文字列を展開
    ///
    /// `${#VAR}` や `{{.Names}}` のようなシェル側の構文はそのまま残す。
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(&protect_shell_syntax(template), &self.context)
            .map_err(|e| CoreError::TemplateRenderError(tera_error_detail(&e)))
    }

    /// ファイルを読み込んで展開
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.render_str(&content).map_err(|e| CoreError::TemplateError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// リージョンのユーザーデータを展開（未指定なら None）
    ///
    /// スクリプトのパスはプロジェクトルートからの相対パスとして解決する。
    pub fn render_for(
        &mut self,
        stack: &RegionStack,
        project_root: &Path,
    ) -> Result<Option<String>> {
        let Some(script) = &stack.instance.user_data else {
            return Ok(None);
        };
        let path = project_root.join(script);
        debug!(role = %stack.role, script = %path.display(), "Rendering user data");
        self.render_file(&path).map(Some)
    }
}

impl Default for UserDataRenderer {
    fn default() -> Self {
        Self::new()
    }
}

const RAW_OPEN: &str = "{% raw %}";
const RAW_CLOSE: &str = "{% endraw %}";

/// Teraが誤読するシェル構文を raw ブロックで囲む
///
/// - `{#`: bash の `${#VAR}` / `${#ARR[@]}`（Teraではコメント開始）
/// - `{{.Field}}`: docker などの Go テンプレート
///
/// 既存の raw ブロックの中身は変更しない。
fn protect_shell_syntax(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with(RAW_OPEN) {
            let len = tail
                .find(RAW_CLOSE)
                .map(|end| end + RAW_CLOSE.len())
                .unwrap_or(tail.len());
            out.push_str(&tail[..len]);
            rest = &tail[len..];
        } else if tail.starts_with("{#") {
            out.push_str(RAW_OPEN);
            out.push_str("{#");
            out.push_str(RAW_CLOSE);
            rest = &tail[2..];
        } else if let Some(inner) = tail.strip_prefix("{{")
            && inner.trim_start().starts_with('.')
            && let Some(end) = inner.find("}}")
        {
            let len = 2 + end + 2;
            out.push_str(RAW_OPEN);
            out.push_str(&tail[..len]);
            out.push_str(RAW_CLOSE);
            rest = &tail[len..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Teraのエラーチェーンから原因を取り出す
fn tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error as _;

    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
