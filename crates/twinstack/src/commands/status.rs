use crate::utils;
use colored::Colorize;
use std::path::Path;
use twinstack_cloud::{ControlPlane, StateManager};
use twinstack_cloud_aws::AwsControlPlane;
use twinstack_core::Deployment;

pub async fn handle(deployment: &Deployment, project_root: &Path) -> anyhow::Result<()> {
    let state_manager = StateManager::new(project_root);
    let state = state_manager.load().await?;

    println!();
    println!(
        "状態ファイル: {} (更新: {})",
        state_manager.state_path().display().to_string().cyan(),
        state.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for stack in deployment.stacks() {
        println!();
        println!(
            "{}",
            format!("■ {}", utils::region_heading(stack.role, &stack.region)).bold()
        );

        let resources = state.region_resources(&stack.region);
        if resources.is_empty() {
            println!("  {}", "(記録なし)".dimmed());
        }
        for (key, resource) in resources {
            let name = key.rsplit(':').next().unwrap_or(key);
            let mut line = format!(
                "  • {:<22} {} [{}]",
                resource.kind.as_str(),
                name.cyan(),
                resource.status
            );
            if let Some(ip) = resource.get_attribute::<String>("public_ip") {
                line.push_str(&format!(" {}", ip));
            }
            if let Some(dns) = resource.get_attribute::<String>("dns_name") {
                line.push_str(&format!(" {}", dns));
            }
            println!("{}", line);
        }

        let plane = AwsControlPlane::connect(&stack.region).await;
        match plane.check_auth().await {
            Ok(auth) if auth.authenticated => {
                println!(
                    "  {} AWS: {}",
                    "✓".green(),
                    auth.account_info.unwrap_or_default()
                );
            }
            Ok(auth) => {
                println!(
                    "  {} AWS: {}",
                    "✗".red(),
                    auth.error.unwrap_or_else(|| "認証に失敗しました".to_string())
                );
                continue;
            }
            Err(e) => {
                println!("  {} AWS: {}", "✗".red(), e);
                continue;
            }
        }

        // ロードバランサーはAPIから現在のDNS名を引く
        if let Some(spec) = &stack.load_balancer {
            match plane.list_load_balancers().await {
                Ok(listed) => match listed.into_iter().find(|lb| lb.name == spec.name) {
                    Some(lb) => {
                        let dns = lb.dns_name.unwrap_or_default();
                        println!(
                            "  {} {} → {}",
                            "ロードバランサー:".bold(),
                            spec.name.cyan(),
                            utils::tasks_url(&dns, spec.port)
                        );
                    }
                    None => println!(
                        "  {} {} は存在しません",
                        "ロードバランサー:".bold(),
                        spec.name
                    ),
                },
                Err(e) => println!("  {} {}", "⚠ ロードバランサーの取得に失敗:".yellow(), e),
            }
        }
    }

    Ok(())
}
