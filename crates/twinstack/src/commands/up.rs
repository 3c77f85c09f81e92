use crate::utils;
use colored::Colorize;
use std::path::Path;
use twinstack_cloud::{ApplyResult, KEY_DIR, Plan, Provisioner, StateManager, plan_provision};
use twinstack_cloud_aws::AwsControlPlane;
use twinstack_core::{Deployment, StackRole, UserDataRenderer};

pub async fn handle(
    deployment: &Deployment,
    project_root: &Path,
    only: Option<StackRole>,
    yes: bool,
) -> anyhow::Result<()> {
    println!("{}", "構築を開始します...".blue().bold());
    println!("プロジェクト: {}", deployment.name.cyan());

    // データベース → アプリの順（--only があればその層だけ）
    let plans: Vec<Plan> = deployment
        .stacks()
        .into_iter()
        .filter(|stack| only.is_none_or(|role| role == stack.role))
        .map(plan_provision)
        .collect();
    for plan in &plans {
        utils::print_plan(plan);
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            "警告: 既存のリソースを削除してから作り直します。".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let state_manager = StateManager::new(project_root);
    let lock = state_manager.acquire_lock("up").await?;
    let outcome = provision(deployment, project_root, &plans, &state_manager).await;
    lock.release().await?;
    let total = outcome?;

    println!();
    if !total.is_success() {
        anyhow::bail!(
            "構築に失敗しました（失敗 {}件 / スキップ {}件）",
            total.failed.len(),
            total.skipped.len()
        );
    }

    println!("{}", "✓ 構築が完了しました！".green().bold());
    let state = state_manager.load().await?;
    if let Some((dns, port)) = utils::recorded_load_balancer(&state, deployment) {
        println!("タスクAPI: {}", utils::tasks_url(&dns, port).cyan());
    }
    Ok(())
}

/// 各リージョンの計画を順に適用し、リージョンごとに状態を保存する
async fn provision(
    deployment: &Deployment,
    project_root: &Path,
    plans: &[Plan],
    state_manager: &StateManager,
) -> anyhow::Result<ApplyResult> {
    let mut state = state_manager.load().await?;
    let key_dir = std::env::current_dir()?.join(KEY_DIR);
    let mut renderer = UserDataRenderer::for_deployment(deployment);
    let mut total = ApplyResult::new();
    // 同じ実行で作ったデータベースのIP（--only app の場合は状態ファイルから）
    let mut database_ip: Option<String> = None;

    for plan in plans {
        let stack = deployment.stack(plan.role);
        let heading = utils::region_heading(plan.role, &plan.region);
        println!();
        println!("{}", format!("■ {} を構築中...", heading).yellow().bold());

        // アプリ層のスクリプトにはデータベースのIPを渡す
        if plan.role == StackRole::App {
            match database_ip
                .clone()
                .or_else(|| utils::database_ip(&state, deployment))
            {
                Some(ip) => {
                    println!("  データベース: {}", ip.cyan());
                    renderer.set_database_ip(ip);
                }
                None if stack.instance.user_data.is_some() => {
                    anyhow::bail!(
                        "データベースのIPアドレスが状態ファイルにありません。先に `twin up --only database --yes` を実行してください"
                    );
                }
                None => {}
            }
        }
        let user_data = renderer.render_for(stack, project_root)?;

        println!("{}", "AWSに接続中...".blue());
        let plane = AwsControlPlane::connect(&stack.region).await;
        let mut provisioner = Provisioner::new(&plane, stack, utils::poller_for(deployment))
            .with_key_dir(&key_dir)
            .with_user_data(user_data);
        let result = provisioner.apply_with(plan, utils::report_event).await;

        let context = provisioner.into_context();
        state.apply_changes(&context.changes);
        state_manager.save(&state).await?;
        if plan.role == StackRole::Database {
            database_ip = context.public_ip;
        }

        println!();
        utils::print_apply_result(&heading, &result);
        let failed = !result.is_success();
        total.merge(result);
        if failed {
            break;
        }
    }

    Ok(total)
}
