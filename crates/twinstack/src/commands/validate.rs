use colored::Colorize;

pub fn handle() {
    println!("{}", "設定を検証中...".blue());

    let path = match twinstack_config::find_deployment_file() {
        Ok(path) => path,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 定義ファイルが見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    println!("定義ファイル: {}", path.display().to_string().cyan());

    let deployment =
        match twinstack_core::parse_deployment_file(&path).and_then(|d| d.validate().map(|_| d)) {
            Ok(deployment) => deployment,
            Err(e) => {
                eprintln!();
                eprintln!("{}", "✗ 設定エラー".red().bold());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", deployment.name.cyan());
    println!(
        "  ポーリング: {}秒間隔 / {}",
        deployment.poll.interval_secs,
        match deployment.poll.max_attempts {
            Some(n) => format!("最大{}回", n),
            None => "無制限".to_string(),
        }
    );
    for stack in deployment.stacks() {
        println!(
            "  - {} ({}, {})",
            stack.role.as_str().cyan(),
            stack.region,
            stack.instance.instance_type
        );
        println!("      キーペア: {}", stack.key_pair.name);
        println!(
            "      セキュリティグループ: {} (ポート {})",
            stack.security_group.name,
            stack
                .security_group
                .ingress
                .iter()
                .map(|r| r.from_port.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        if let Some(script) = &stack.instance.user_data {
            println!("      ユーザーデータ: {}", script.display());
        }
        if let Some(lb) = &stack.load_balancer {
            println!("      ロードバランサー: {} (:{})", lb.name, lb.port);
        }
        if let Some(asg) = &stack.autoscaling {
            println!(
                "      オートスケーリング: {} ({}..{}, 希望 {})",
                asg.name, asg.min_size, asg.max_size, asg.desired_capacity
            );
        }
    }
}
