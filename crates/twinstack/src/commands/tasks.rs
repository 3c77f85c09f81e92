use crate::{tasks, utils};
use colored::Colorize;
use std::path::Path;
use twinstack_cloud::{ControlPlane, StateManager};
use twinstack_cloud_aws::AwsControlPlane;
use twinstack_core::Deployment;

/// アプリ層のロードバランサーからURLを解決して対話セッションを開始
pub async fn handle(deployment: &Deployment, project_root: &Path) -> anyhow::Result<()> {
    let url = resolve_url(deployment, project_root).await?;
    tasks::run(&url).await
}

/// APIで現在のDNS名を引き、取れなければ状態ファイルの記録を使う
async fn resolve_url(deployment: &Deployment, project_root: &Path) -> anyhow::Result<String> {
    let app = &deployment.app;
    let spec = app.load_balancer.as_ref().ok_or_else(|| {
        anyhow::anyhow!("アプリ層にロードバランサーが定義されていません。--url で指定してください")
    })?;

    let plane = AwsControlPlane::connect(&app.region).await;
    match plane.list_load_balancers().await {
        Ok(listed) => {
            if let Some(dns) = listed
                .into_iter()
                .find(|lb| lb.name == spec.name)
                .and_then(|lb| lb.dns_name)
            {
                return Ok(utils::tasks_url(&dns, spec.port));
            }
            tracing::debug!(load_balancer = %spec.name, "Load balancer not listed");
        }
        Err(e) => {
            println!("{} {}", "⚠ ロードバランサーの取得に失敗:".yellow(), e);
        }
    }

    let state = StateManager::new(project_root).load().await?;
    if let Some((dns, port)) = utils::recorded_load_balancer(&state, deployment) {
        println!("{}", "状態ファイルに記録されたDNS名を使用します".dimmed());
        return Ok(utils::tasks_url(&dns, port));
    }

    anyhow::bail!(
        "ロードバランサー '{}' が見つかりません。先に `twin up --yes` を実行してください",
        spec.name
    )
}
