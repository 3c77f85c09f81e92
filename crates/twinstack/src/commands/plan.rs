use crate::utils;
use colored::Colorize;
use twinstack_cloud::{ActionType, plan_provision};
use twinstack_core::Deployment;

pub fn handle(deployment: &Deployment) -> anyhow::Result<()> {
    println!("プロジェクト: {}", deployment.name.cyan());

    let plans: Vec<_> = deployment.stacks().into_iter().map(plan_provision).collect();
    for plan in &plans {
        utils::print_plan(plan);
    }

    let count = |action_type: ActionType| {
        plans
            .iter()
            .map(|plan| plan.actions_by_type(action_type).len())
            .sum::<usize>()
    };
    println!();
    println!(
        "合計: 作成 {}件 / 削除 {}件",
        count(ActionType::Create).to_string().green(),
        count(ActionType::Delete).to_string().red()
    );
    println!("適用するには {} を実行してください", "twin up --yes".cyan());
    Ok(())
}
