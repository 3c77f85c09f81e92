use colored::Colorize;
use std::path::Path;
use twinstack_core::starter::starter_files;

/// ひな形を書き出す（既存ファイルは --force がない限り上書きしない）
pub fn handle(dir: &Path, force: bool) -> anyhow::Result<()> {
    let files = starter_files();

    if !force {
        let existing: Vec<&str> = files
            .iter()
            .map(|(path, _)| *path)
            .filter(|path| dir.join(path).exists())
            .collect();
        if !existing.is_empty() {
            anyhow::bail!(
                "既にファイルが存在します: {}\n上書きするには --force オプションを指定してください",
                existing.join(", ")
            );
        }
    }

    println!("{}", "ひな形を作成中...".blue());
    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        println!("  • {}", path.display().to_string().cyan());
    }

    println!();
    println!("{}", "✓ ひな形を作成しました".green().bold());
    println!("次のステップ:");
    println!("  1. twinstack.kdl のリージョン・AMI・variables を編集");
    println!("  2. {} で設定を確認", "twin validate".cyan());
    println!("  3. {} で構築", "twin up --yes".cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_starter_files() {
        let dir = tempdir().unwrap();
        handle(dir.path(), false).unwrap();

        let deployment_file = dir.path().join("twinstack.kdl");
        assert!(deployment_file.exists());
        assert!(dir.path().join("scripts/postgres.sh").exists());
        assert!(dir.path().join("scripts/app.sh").exists());

        let deployment = twinstack_core::parse_deployment_file(&deployment_file).unwrap();
        deployment.validate().unwrap();
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("twinstack.kdl"), "project \"mine\"\n").unwrap();

        let err = handle(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("twinstack.kdl"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("twinstack.kdl")).unwrap(),
            "project \"mine\"\n"
        );

        handle(dir.path(), true).unwrap();
        let content = std::fs::read_to_string(dir.path().join("twinstack.kdl")).unwrap();
        assert!(content.contains("region \"database\""));
    }
}
