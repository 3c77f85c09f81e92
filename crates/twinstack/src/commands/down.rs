use crate::utils;
use colored::Colorize;
use std::path::Path;
use twinstack_cloud::{ApplyResult, Plan, Provisioner, StateManager, plan_teardown};
use twinstack_cloud_aws::AwsControlPlane;
use twinstack_core::Deployment;

pub async fn handle(deployment: &Deployment, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    println!("{}", "全リソースを削除します...".yellow().bold());
    println!("プロジェクト: {}", deployment.name.cyan());

    // アプリ → データベースの順
    let plans = plan_teardown(deployment);
    for plan in &plans {
        utils::print_plan(plan);
    }

    if !yes {
        println!();
        println!(
            "{}",
            "警告: 両リージョンのリソースをすべて削除します。".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let state_manager = StateManager::new(project_root);
    let lock = state_manager.acquire_lock("down").await?;
    let outcome = teardown(deployment, &plans, &state_manager).await;
    lock.release().await?;
    let total = outcome?;

    println!();
    if !total.is_success() {
        anyhow::bail!("削除に失敗したリソースがあります（失敗 {}件）", total.failed.len());
    }
    println!("{}", "✓ すべてのリソースを削除しました".green().bold());
    Ok(())
}

/// 削除は失敗しても次のリージョンへ進む
async fn teardown(
    deployment: &Deployment,
    plans: &[Plan],
    state_manager: &StateManager,
) -> anyhow::Result<ApplyResult> {
    let mut state = state_manager.load().await?;
    let mut total = ApplyResult::new();

    for plan in plans {
        let stack = deployment.stack(plan.role);
        let heading = utils::region_heading(plan.role, &plan.region);
        println!();
        println!("{}", format!("■ {} を削除中...", heading).yellow().bold());

        let plane = AwsControlPlane::connect(&stack.region).await;
        let mut provisioner = Provisioner::new(&plane, stack, utils::poller_for(deployment));
        let result = provisioner.apply_with(plan, utils::report_event).await;

        state.apply_changes(&provisioner.context().changes);
        state_manager.save(&state).await?;

        println!();
        utils::print_apply_result(&heading, &result);
        total.merge(result);
    }

    Ok(total)
}
