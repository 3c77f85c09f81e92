//! KDLパーサー
//!
//! デプロイメント定義ファイル（twinstack.kdl）をパースします。
//! region ノードのパース処理は region モジュールに分離されています。

mod region;

use crate::error::{CoreError, Result};
use crate::model::{Deployment, PollSettings, StackRole};
use kdl::{KdlDocument, KdlNode, KdlValue};
use region::{RegionDraft, parse_region};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてDeploymentを生成
///
/// project ノードがない場合はファイルのあるディレクトリ名をプロジェクト名とする。
pub fn parse_deployment_file<P: AsRef<Path>>(path: P) -> Result<Deployment> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let name = path
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("twinstack")
        .to_string();
    parse_deployment_str(&content, name)
}

/// KDL文字列をパース
pub fn parse_deployment_str(content: &str, default_name: String) -> Result<Deployment> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut drafts: HashMap<StackRole, RegionDraft> = HashMap::new();
    let mut poll = PollSettings::default();
    let mut variables = HashMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) = arg_string(node) {
                    name = project_name;
                }
            }
            "region" => {
                let draft = parse_region(node)?;
                if drafts.contains_key(&draft.role) {
                    return Err(CoreError::InvalidConfig(format!(
                        "region \"{}\" が重複しています",
                        draft.role
                    )));
                }
                drafts.insert(draft.role, draft);
            }
            "poll" => {
                poll = parse_poll(node)?;
            }
            "variables" => {
                if let Some(vars) = node.children() {
                    for var in vars.nodes() {
                        let key = var.name().value().to_string();
                        let value = arg_value(var).map(value_to_string).unwrap_or_default();
                        variables.insert(key, value);
                    }
                }
            }
            other => {
                tracing::debug!(node = other, "Skipping unknown node");
            }
        }
    }

    let database = drafts
        .remove(&StackRole::Database)
        .ok_or_else(|| CoreError::MissingRegion(StackRole::Database.to_string()))?
        .finish(&name)?;
    let app = drafts
        .remove(&StackRole::App)
        .ok_or_else(|| CoreError::MissingRegion(StackRole::App.to_string()))?
        .finish(&name)?;

    Ok(Deployment {
        name,
        database,
        app,
        poll,
        variables,
    })
}

/// poll ノードをパース
///
/// 例: `poll interval=10 max-attempts=90`（max-attempts=0 で無制限）
fn parse_poll(node: &KdlNode) -> Result<PollSettings> {
    let mut poll = PollSettings::default();

    if let Some(interval) = prop_integer(node, &["interval", "interval-secs", "interval_secs"]) {
        poll.interval_secs = u64::try_from(interval).map_err(|_| {
            CoreError::InvalidConfig(format!("poll interval が不正です: {}", interval))
        })?;
    }

    if let Some(max) = prop_integer(node, &["max-attempts", "max_attempts"]) {
        poll.max_attempts = match max {
            0 => None,
            n => Some(u32::try_from(n).map_err(|_| {
                CoreError::InvalidConfig(format!("poll max-attempts が不正です: {}", n))
            })?),
        };
    }

    Ok(poll)
}

/// 最初の位置引数
pub(crate) fn arg_value(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

/// 最初の位置引数（文字列）
pub(crate) fn arg_string(node: &KdlNode) -> Option<String> {
    arg_value(node)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// 全ての位置引数
pub(crate) fn args(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

/// プロパティ（key=value）を取得。エイリアスを順に探す
pub(crate) fn prop_value<'a>(node: &'a KdlNode, keys: &[&str]) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| keys.iter().any(|k| *k == n.value())))
        .map(|e| e.value())
}

pub(crate) fn prop_string(node: &KdlNode, keys: &[&str]) -> Option<String> {
    prop_value(node, keys)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub(crate) fn prop_integer(node: &KdlNode, keys: &[&str]) -> Option<i128> {
    prop_value(node, keys).and_then(|v| v.as_integer())
}

pub(crate) fn prop_bool(node: &KdlNode, keys: &[&str]) -> Option<bool> {
    prop_value(node, keys).and_then(|v| v.as_bool())
}

fn value_to_string(value: &KdlValue) -> String {
    if let Some(s) = value.as_string() {
        s.to_string()
    } else if let Some(i) = value.as_integer() {
        i.to_string()
    } else if let Some(f) = value.as_float() {
        f.to_string()
    } else if let Some(b) = value.as_bool() {
        b.to_string()
    } else {
        String::new()
    }
}
