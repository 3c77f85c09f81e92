use colored::Colorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use twinstack_cloud::{
    ActionType, ApplyEvent, ApplyResult, GlobalState, Plan, Poller, ResourceKind,
};
use twinstack_core::{Deployment, StackRole};

/// 定義ファイルを探してパースする（プロジェクトルートも返す）
pub fn load_deployment() -> anyhow::Result<(Deployment, PathBuf)> {
    let path = twinstack_config::find_deployment_file()?;
    let project_root = twinstack_config::project_root_for(&path);
    tracing::debug!(file = %path.display(), root = %project_root.display(), "Loading deployment");

    print_loaded_file(&path);
    let deployment = twinstack_core::parse_deployment_file(&path)?;
    deployment.validate()?;
    Ok((deployment, project_root))
}

/// 読み込んだ設定ファイルを表示
pub fn print_loaded_file(path: &Path) {
    println!("📄 読み込んだ設定ファイル:");
    println!("  • {}", path.display().to_string().cyan());
}

/// リージョン見出し（例: database (us-east-2)）
pub fn region_heading(role: StackRole, region: &str) -> String {
    format!("{} ({})", role, region)
}

/// 実行計画を表示
pub fn print_plan(plan: &Plan) {
    println!();
    println!(
        "{}",
        format!(
            "■ {}: {}",
            region_heading(plan.role, &plan.region),
            plan.summary()
        )
        .bold()
    );
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Delete => "-".red(),
        };
        println!("  {} {}", marker, action.description);
    }
}

/// 実行中のアクションを1行ずつ表示
pub fn report_event(event: ApplyEvent<'_>) {
    match event {
        ApplyEvent::Started(action) => {
            println!("  → {}", action.description);
        }
        ApplyEvent::Succeeded(_, message) => {
            println!("    {} {}", "✓".green(), message);
        }
        ApplyEvent::Failed(_, error) => {
            println!("    {} {}", "✗".red(), error.red());
        }
        ApplyEvent::Skipped(action) => {
            println!("  {} {} (スキップ)", "·".dimmed(), action.description.dimmed());
        }
    }
}

/// 適用結果のサマリーを表示
pub fn print_apply_result(heading: &str, result: &ApplyResult) {
    let seconds = result.duration_ms as f64 / 1000.0;
    if result.is_success() {
        println!(
            "{}",
            format!(
                "✓ {}: {}件完了 ({:.1}秒)",
                heading,
                result.succeeded.len(),
                seconds
            )
            .green()
            .bold()
        );
        return;
    }

    println!(
        "{}",
        format!(
            "✗ {}: 成功 {}件 / 失敗 {}件 / スキップ {}件",
            heading,
            result.succeeded.len(),
            result.failed.len(),
            result.skipped.len()
        )
        .red()
        .bold()
    );
    for failed in &result.failed {
        println!(
            "  • {}: {}",
            failed.action_id.cyan(),
            failed.error.as_deref().unwrap_or("(不明なエラー)")
        );
    }
}

/// 定義のポーリング設定から Poller を作る（端末ならスピナー表示）
pub fn poller_for(deployment: &Deployment) -> Poller {
    Poller::from_settings(&deployment.poll).with_progress(std::io::stderr().is_terminal())
}

/// 状態ファイルからデータベースインスタンスのパブリックIPを探す
///
/// インスタンスはタグ名をキーに記録されるので、最新の実行の値だけが残る。
pub fn database_ip(state: &GlobalState, deployment: &Deployment) -> Option<String> {
    let database = &deployment.database;
    let key = twinstack_cloud::resource_key(
        &database.region,
        ResourceKind::Instance,
        &database.instance.tag.value,
    );
    state.get_resource(&key)?.get_attribute::<String>("public_ip")
}

/// 状態ファイルに記録されたロードバランサー（DNS名, ポート）
pub fn recorded_load_balancer(
    state: &GlobalState,
    deployment: &Deployment,
) -> Option<(String, u16)> {
    let app = &deployment.app;
    let spec = app.load_balancer.as_ref()?;
    let key = twinstack_cloud::resource_key(&app.region, ResourceKind::LoadBalancer, &spec.name);
    let resource = state.get_resource(&key)?;
    let dns = resource.get_attribute::<String>("dns_name")?;
    let port = resource.get_attribute::<u16>("port").unwrap_or(spec.port);
    Some((dns, port))
}

/// タスクAPIのURL
pub fn tasks_url(dns_name: &str, port: u16) -> String {
    format!("http://{}:{}/tasks", dns_name, port)
}
