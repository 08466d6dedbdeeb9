//! Atelier - 创作助手编排核心
//!
//! 入口：初始化日志、创建 Studio 与命令循环，从 stdin 读取文本命令并把 feed 以 JSON 打印到 stdout。

use anyhow::Context;
use atelier::core::{create_studio, Command};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    atelier::observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let (studio, cmd_tx, feed_rx, _events_rx) = create_studio(config_path)
        .await
        .context("Failed to create studio")?;

    tracing::info!(
        actors = studio.registry().all().len(),
        mode = %studio.mode(),
        "Atelier ready (type `feed` to print the notification window, `quit` to exit)"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("feed") {
            let feed = feed_rx.borrow().clone();
            println!("{}", serde_json::to_string_pretty(&feed).context("Failed to encode feed")?);
            continue;
        }
        match Command::parse_line(line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => {
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    let _ = cmd_tx.send(Command::Quit);
    Ok(())
}
