//! クラウドリソースモデル
//!
//! リージョンごとに作成するリソース（キーペア、セキュリティグループ、
//! インスタンス、イメージ、ロードバランサー、起動設定、オートスケーリング）の定義

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// タグのデフォルトキー
pub const DEFAULT_TAG_KEY: &str = "Name";

/// リソース検索用のタグ
///
/// 作成したリソースには必ずタグを付け、次回実行時はこのタグで検索する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `Name` キーのタグを作成
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(DEFAULT_TAG_KEY, value)
    }

    /// タグフィルタ名（`tag:Name` 形式）
    pub fn filter_name(&self) -> String {
        format!("tag:{}", self.key)
    }
}

/// セキュリティグループのインバウンドルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// プロトコル（tcp, udp など）
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    /// 許可する CIDR（デフォルト: 0.0.0.0/0）
    pub cidr: String,
}

impl IngressRule {
    /// 単一ポートを全アドレスに開放する TCP ルール
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr: "0.0.0.0/0".to_string(),
        }
    }
}

/// キーペア設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairSpec {
    /// キーペア名
    pub name: String,
    /// 秘密鍵の保存ファイル名（`.ssh/` 配下）
    pub file_name: String,
    pub tag: Tag,
}

/// セキュリティグループ設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    pub name: String,
    pub description: String,
    pub tag: Tag,
    pub ingress: Vec<IngressRule>,
}

/// インスタンス設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// 起動元のイメージID
    pub image_id: String,
    /// インスタンスタイプ（デフォルト: t2.micro）
    pub instance_type: String,
    pub tag: Tag,
    /// ユーザーデータスクリプトのパス（プロジェクトルートからの相対パス）
    pub user_data: Option<PathBuf>,
}

/// インスタンスから作成するイメージの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
}

/// ロードバランサー設定（クラシック ELB）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub name: String,
    /// ロードバランサー側のポート
    pub port: u16,
    /// 転送先インスタンスのポート
    pub instance_port: u16,
    /// リスナーのプロトコル（HTTP, TCP など）
    pub protocol: String,
    pub tag: Tag,
}

/// 起動設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfigurationSpec {
    pub name: String,
    pub instance_type: String,
    /// 詳細モニタリングを有効にするか
    pub monitoring: bool,
}

/// オートスケーリンググループ設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingSpec {
    pub name: String,
    pub min_size: i32,
    pub max_size: i32,
    pub desired_capacity: i32,
}

/// リージョンの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackRole {
    /// データベース層（単一インスタンス）
    Database,
    /// アプリケーション層（イメージ + ロードバランサー + オートスケーリング）
    App,
}

impl StackRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackRole::Database => "database",
            StackRole::App => "app",
        }
    }
}

impl std::fmt::Display for StackRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StackRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "database" | "db" => Ok(StackRole::Database),
            "app" | "application" => Ok(StackRole::App),
            other => Err(format!("不明なリージョン役割: {}", other)),
        }
    }
}

/// 1リージョン分のリソース一式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStack {
    pub role: StackRole,

    /// リージョン名（us-east-1 など）
    pub region: String,

    pub key_pair: KeyPairSpec,
    pub security_group: SecurityGroupSpec,
    pub instance: InstanceSpec,

    /// インスタンスから作成するイメージ（アプリ層のみ）
    pub image: Option<ImageSpec>,
    pub load_balancer: Option<LoadBalancerSpec>,
    pub launch_configuration: Option<LaunchConfigurationSpec>,
    pub autoscaling: Option<AutoScalingSpec>,
}
