use clap::Parser;
use shelf_count::{cli, config, device, error, ledger, operator, session, transport};
use shelf_count_common::{parse_detection_response, project_all, PromptDialect};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use operator::OperatorOptions;
use session::{CaptureSession, CountReport};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(verbose: bool) {
    let default = if verbose { "shelf_count=debug,shelf_count_common=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Count { label, source, reply_file, surface, manual, yes } => {
            println!("📷 shelf-count - 個数カウント\n");

            // 1. カメラ準備
            println!("[1/3] カメラを準備中... ({})", source.display());
            let transport = transport::build_transport(cli.ai_provider, &config, reply_file.as_deref())?;
            let mut session = CaptureSession::open(device::FolderDevice::new(&source), transport, label.trim())?;
            println!("✔ 対象: {}\n", session.label());

            // 2. 撮影・解析
            println!("[2/3] 撮影・AI解析");
            let options = OperatorOptions { surface, manual, auto_confirm: yes };
            let mut reports: Vec<CountReport> = Vec::new();
            let report = operator::run_session(&mut session, &mut reports, &options).await?;

            // 3. 結果
            println!("\n[3/3] 結果");
            match report {
                Some(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    println!("\n✅ {}個で確定", report.final_count);
                }
                None => println!("キャンセルしました"),
            }
        }

        Commands::Inventory { source, items, search, reply_file, surface } => {
            println!("📦 shelf-count - 棚卸し\n");

            let mut ledger = match items {
                Some(path) => ledger::InventoryLedger::from_json_file(&path)?,
                None => ledger::InventoryLedger::sample(),
            };
            println!("✔ {}品目を読み込み\n", ledger.items().len());

            let transport = transport::build_transport(cli.ai_provider, &config, reply_file.as_deref())?;
            let options = OperatorOptions { surface, ..Default::default() };
            operator::run_inventory(&mut ledger, &source, transport, search.as_deref(), &options).await?;

            println!("\n✅ 棚卸し終了");
        }

        Commands::Parse { input, label, surface } => {
            if !input.exists() {
                return Err(error::ShelfCountError::FileNotFound(input.display().to_string()));
            }
            let text = std::fs::read_to_string(&input)?;

            match parse_detection_response(&text, &label) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    if let Some(surface) = surface {
                        println!("\n投影先: {}", surface);
                        println!("{}", serde_json::to_string_pretty(&project_all(&result, surface))?);
                    }
                }
                Err(e) => {
                    eprintln!("⚠ {}", e.operator_message(&label));
                    println!("{}", serde_json::to_string_pretty(&e)?);
                }
            }
        }

        Commands::Config { set_api_key, set_prompt_dialect, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(dialect) = set_prompt_dialect {
                config.prompt_dialect = dialect.parse::<PromptDialect>()?;
                config.save()?;
                println!("✔ 応答形式を設定しました: {}", config.prompt_dialect);
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  応答形式: {}", config.prompt_dialect);
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
