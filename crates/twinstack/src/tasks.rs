//! タスクAPIの対話クライアント
//!
//! アプリ層のロードバランサー越しに `/tasks` API を叩く。
//! メニュー: `0` index / `1` 作成 / `2` 一覧 / `3` 全削除 / `q` 終了

use anyhow::Context as _;
use reqwest::Client;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// 新規タスク（`POST /create_task` のボディ）
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub pub_date: String,
    pub description: String,
}

impl NewTask {
    /// `pub_date` を現在のローカル時刻（ISO 8601）で埋める
    pub fn now(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pub_date: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            description: description.into(),
        }
    }
}

/// タスクAPIクライアント
#[derive(Debug, Clone)]
pub struct TaskClient {
    client: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("twinstack/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("HTTPクライアントの作成に失敗しました")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn index(&self) -> anyhow::Result<String> {
        self.send(self.client.get(&self.base_url)).await
    }

    pub async fn create(&self, task: &NewTask) -> anyhow::Result<String> {
        let url = format!("{}/create_task", self.base_url);
        self.send(self.client.post(url).json(task)).await
    }

    pub async fn list(&self) -> anyhow::Result<String> {
        let url = format!("{}/get_tasks", self.base_url);
        self.send(self.client.get(url)).await
    }

    pub async fn delete_all(&self) -> anyhow::Result<String> {
        let url = format!("{}/delete_tasks", self.base_url);
        self.send(self.client.delete(url)).await
    }

    /// ステータスに関わらずレスポンス本文を返す
    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<String> {
        let response = request
            .send()
            .await
            .with_context(|| format!("タスクAPIに接続できません: {}", self.base_url))?;
        debug!(status = %response.status(), url = %response.url(), "Task API response");
        response
            .text()
            .await
            .context("レスポンスの読み込みに失敗しました")
    }
}

/// メニューの選択肢
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Index,
    Create,
    List,
    DeleteAll,
    Quit,
}

impl FromStr for MenuAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(MenuAction::Index),
            "1" => Ok(MenuAction::Create),
            "2" => Ok(MenuAction::List),
            "3" => Ok(MenuAction::DeleteAll),
            "q" | "Q" => Ok(MenuAction::Quit),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

fn print_menu<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Database access")?;
    writeln!(out)?;
    writeln!(out, "0: Test index")?;
    writeln!(out, "1: Create task")?;
    writeln!(out, "2: Get all tasks")?;
    writeln!(out, "3: Delete all tasks")?;
    writeln!(out, "q: Quit")?;
    writeln!(out, "Type the number corresponding to the action you want.")?;
    Ok(())
}

/// プロンプトを出して1行読む（EOFなら None）
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
) -> anyhow::Result<Option<String>> {
    write!(out, "{}", label)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// 対話セッションを実行
///
/// 不正な入力は `INVALID ACTION` を出して続行し、通信エラーはセッションを終了する。
/// 入力がEOFに達した場合も終了。
pub async fn run_session<R: BufRead, W: Write>(
    client: &TaskClient,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<()> {
    loop {
        print_menu(out)?;
        let Some(line) = prompt(input, out, "Action: ")? else {
            return Ok(());
        };

        let action = match line.parse::<MenuAction>() {
            Ok(action) => action,
            Err(e) => {
                debug!(input = %line, error = %e, "Invalid menu input");
                writeln!(out, "INVALID ACTION")?;
                continue;
            }
        };

        let response = match action {
            MenuAction::Quit => return Ok(()),
            MenuAction::Index => client.index().await?,
            MenuAction::Create => {
                let Some(title) = prompt(input, out, "Task title: ")? else {
                    return Ok(());
                };
                let Some(description) = prompt(input, out, "Task description: ")? else {
                    return Ok(());
                };
                client.create(&NewTask::now(title, description)).await?
            }
            MenuAction::List => client.list().await?,
            MenuAction::DeleteAll => client.delete_all().await?,
        };

        writeln!(out)?;
        writeln!(out, "Response: {}", response)?;
    }
}

/// 標準入出力でセッションを実行
pub async fn run(url: &str) -> anyhow::Result<()> {
    let client = TaskClient::new(url)?;
    println!("タスクAPI: {}", client.base_url());

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    run_session(&client, &mut input, &mut out).await
}
