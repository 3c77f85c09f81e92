//! デプロイメントモデル

mod cloud;

pub use cloud::*;

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// ポーリング間隔のデフォルト（秒）
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// ポーリング設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// 状態確認の間隔（秒）
    pub interval_secs: u64,
    /// 最大試行回数（None の場合は無制限）
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_attempts: Some(90),
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// 2リージョン構成のデプロイメント定義
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// プロジェクト名
    pub name: String,

    /// データベース層
    pub database: RegionStack,

    /// アプリケーション層
    pub app: RegionStack,

    pub poll: PollSettings,

    /// ユーザーデータのテンプレート変数
    pub variables: HashMap<String, String>,
}

impl Deployment {
    /// 役割からリージョン構成を取得
    pub fn stack(&self, role: StackRole) -> &RegionStack {
        match role {
            StackRole::Database => &self.database,
            StackRole::App => &self.app,
        }
    }

    /// 作成順（データベース → アプリ）
    pub fn stacks(&self) -> [&RegionStack; 2] {
        [&self.database, &self.app]
    }

    /// 設定の整合性を検証
    pub fn validate(&self) -> Result<()> {
        for stack in self.stacks() {
            validate_stack(stack)?;
        }
        Ok(())
    }
}

fn invalid(stack: &RegionStack, message: impl std::fmt::Display) -> CoreError {
    CoreError::InvalidConfig(format!("region \"{}\": {}", stack.role, message))
}

fn validate_stack(stack: &RegionStack) -> Result<()> {
    if stack.region.trim().is_empty() {
        return Err(invalid(stack, "リージョン名 (name) が空です"));
    }
    if stack.instance.image_id.trim().is_empty() {
        return Err(invalid(stack, "image が指定されていません"));
    }
    if stack.key_pair.name.is_empty() || stack.key_pair.file_name.is_empty() {
        return Err(invalid(stack, "key-pair の名前とファイル名は必須です"));
    }
    if stack.security_group.name.is_empty() {
        return Err(invalid(stack, "security-group の名前は必須です"));
    }

    for rule in &stack.security_group.ingress {
        if rule.from_port == 0 || rule.to_port == 0 {
            return Err(invalid(stack, "ingress のポートに 0 は指定できません"));
        }
        if rule.from_port > rule.to_port {
            return Err(invalid(
                stack,
                format!(
                    "ingress のポート範囲が逆転しています: {}-{}",
                    rule.from_port, rule.to_port
                ),
            ));
        }
    }

    if let Some(lb) = &stack.load_balancer {
        if lb.port == 0 || lb.instance_port == 0 {
            return Err(invalid(stack, "load-balancer のポートに 0 は指定できません"));
        }
        // クラシック ELB の名前は32文字以内の英数字とハイフンで、先頭と末尾はハイフン不可
        if lb.name.is_empty()
            || lb.name.len() > 32
            || lb.name.starts_with('-')
            || lb.name.ends_with('-')
            || !lb
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid(
                stack,
                format!("load-balancer 名が不正です: '{}'", lb.name),
            ));
        }
    }

    if stack.launch_configuration.is_some() && stack.image.is_none() {
        return Err(invalid(
            stack,
            "launch-configuration には image-name の指定が必要です",
        ));
    }

    if let Some(asg) = &stack.autoscaling {
        if stack.launch_configuration.is_none() {
            return Err(invalid(
                stack,
                "autoscaling には launch-configuration の指定が必要です",
            ));
        }
        if stack.load_balancer.is_none() {
            return Err(invalid(stack, "autoscaling には load-balancer の指定が必要です"));
        }
        if asg.max_size <= 0 {
            return Err(invalid(stack, "autoscaling の max は 1 以上にしてください"));
        }
        if !(asg.min_size <= asg.desired_capacity && asg.desired_capacity <= asg.max_size) {
            return Err(invalid(
                stack,
                format!(
                    "autoscaling は min <= desired <= max を満たす必要があります (min={}, desired={}, max={})",
                    asg.min_size, asg.desired_capacity, asg.max_size
                ),
            ));
        }
    }

    Ok(())
}
