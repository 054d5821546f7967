//! 対話式カウント
//!
//! 撮影 → AI解析 → 結果確認（確定 / 手入力 / 撮り直し / キャンセル）を
//! ターミナル上で進める。

use crate::device::{Device, FolderDevice, ImageCapture};
use crate::error::{Result, ShelfCountError};
use crate::ledger::{InventoryItem, InventoryLedger};
use crate::session::{CaptureSession, CountReport, Reconciler, SessionStatus};
use crate::transport::Transport;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use shelf_count_common::{project_all, SurfaceSize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 対話の振る舞い
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorOptions {
    /// 矩形の投影先（未指定なら撮影画像のサイズ）
    pub surface: Option<SurfaceSize>,
    /// この個数で確定する
    pub manual: Option<u32>,
    /// 確認なしで進める（エラー時はキャンセル）
    pub auto_confirm: bool,
}

/// 結果確認時の操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAction {
    /// AIの個数で確定
    Confirm,
    /// 個数を手入力して確定
    ManualCount,
    /// 撮り直し
    Retake,
    /// キャンセル
    Cancel,
}

impl ResolvedAction {
    fn label(&self) -> &'static str {
        match self {
            ResolvedAction::Confirm => "確定",
            ResolvedAction::ManualCount => "個数を手入力して確定",
            ResolvedAction::Retake => "撮り直し",
            ResolvedAction::Cancel => "キャンセル",
        }
    }
}

/// 選べる操作（エラー結果では確定系を出さない）
pub fn resolved_actions(has_result: bool) -> Vec<ResolvedAction> {
    let mut actions = Vec::with_capacity(4);
    if has_result {
        actions.extend([ResolvedAction::Confirm, ResolvedAction::ManualCount]);
    }
    actions.extend([ResolvedAction::Retake, ResolvedAction::Cancel]);
    actions
}

/// 矩形の投影先を決める
pub fn display_surface(surface: Option<SurfaceSize>, image: Option<&ImageCapture>) -> Option<SurfaceSize> {
    surface.or_else(|| {
        image
            .and_then(|i| i.dimensions())
            .map(|(w, h)| SurfaceSize::new(w as f64, h as f64))
    })
}

/// 1セッションを対話で最後まで進める
///
/// 確定した場合は `Some(report)`、キャンセルした場合は `None`。
pub async fn run_session<D: Device>(
    session: &mut CaptureSession<D>,
    reconciler: &mut dyn Reconciler,
    options: &OperatorOptions,
) -> Result<Option<CountReport>> {
    loop {
        match session.status() {
            SessionStatus::Live => {
                if !options.auto_confirm && !confirm("撮影しますか？")? {
                    session.cancel();
                    return Ok(None);
                }

                // 撮影失敗は Live のまま。自動モードでは諦めてキャンセル
                let submission = match session.capture() {
                    Ok(Some(submission)) => submission,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("⚠ 撮影できませんでした: {}", e);
                        tracing::warn!(session = %session.id(), error = %e, "capture failed");
                        if options.auto_confirm {
                            session.cancel();
                            return Ok(None);
                        }
                        continue;
                    }
                };

                let spinner = spinner(format!("AI解析中... ({})", session.label()));
                // 解析中の Ctrl-C はセッションごと破棄
                let reply = tokio::select! {
                    reply = submission.send() => reply,
                    _ = tokio::signal::ctrl_c() => {
                        spinner.finish_and_clear();
                        session.cancel();
                        println!("  → 解析を中断しました");
                        return Ok(None);
                    }
                };
                spinner.finish_and_clear();
                session.resolve(reply);
            }

            SessionStatus::Resolved => {
                print_outcome(session, options.surface);

                if options.auto_confirm {
                    if session.result().is_some() {
                        return session.confirm(options.manual, reconciler).map(Some);
                    }
                    session.cancel();
                    return Ok(None);
                }

                match prompt_action(session.result().is_some())? {
                    ResolvedAction::Confirm => {
                        return session.confirm(options.manual, reconciler).map(Some);
                    }
                    ResolvedAction::ManualCount => {
                        let initial = options.manual.or(session.result().map(|r| r.count));
                        let count = prompt_count(initial)?;
                        session.set_manual_count(Some(count))?;
                        return session.confirm(None, reconciler).map(Some);
                    }
                    ResolvedAction::Retake => match session.retake() {
                        Ok(()) => println!("  → 撮り直します\n"),
                        // 結果確認に留まるので、もう一度撮り直すかキャンセルを選べる
                        Err(e) => println!("⚠ カメラを開けませんでした: {}", e),
                    },
                    ResolvedAction::Cancel => {
                        session.cancel();
                        return Ok(None);
                    }
                }
            }

            SessionStatus::Closed => return Ok(None),

            SessionStatus::Captured | SessionStatus::Processing => {
                tracing::warn!(session = %session.id(), status = ?session.status(), "unexpected state in operator loop");
                session.cancel();
                return Ok(None);
            }
        }
    }
}

/// 商品に対する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// 撮影してAIでカウント
    Capture,
    /// 1個増やす
    Increment,
    /// 1個減らす
    Decrement,
    /// 個数を直接入力
    SetCount,
    /// 商品選択に戻る
    Back,
}

impl ItemAction {
    pub const ALL: [ItemAction; 5] = [
        ItemAction::Capture,
        ItemAction::Increment,
        ItemAction::Decrement,
        ItemAction::SetCount,
        ItemAction::Back,
    ];

    fn label(&self) -> &'static str {
        match self {
            ItemAction::Capture => "撮影してカウント",
            ItemAction::Increment => "+1",
            ItemAction::Decrement => "-1",
            ItemAction::SetCount => "個数を入力",
            ItemAction::Back => "戻る",
        }
    }
}

/// 手動調整を台帳に反映し、調整後の個数を返す（撮影・戻るは `None`）
pub fn adjust_item(
    ledger: &mut InventoryLedger,
    id: &str,
    action: ItemAction,
    entered: Option<u32>,
) -> Result<Option<u32>> {
    let count = match action {
        ItemAction::Increment => ledger.increment(id)?,
        ItemAction::Decrement => ledger.decrement(id)?,
        ItemAction::SetCount => {
            let count = entered.unwrap_or(0);
            ledger.set_count(id, count)?;
            count
        }
        ItemAction::Capture | ItemAction::Back => return Ok(None),
    };
    Ok(Some(count))
}

/// 1商品を撮影してカウントし、確定したら台帳に反映する
pub async fn count_item<D: Device>(
    ledger: &mut InventoryLedger,
    id: &str,
    device: D,
    transport: Arc<dyn Transport>,
    options: &OperatorOptions,
) -> Result<Option<CountReport>> {
    let label = ledger
        .get(id)
        .map(InventoryItem::expected_label)
        .ok_or_else(|| ShelfCountError::ItemNotFound(id.to_string()))?;

    let mut session = CaptureSession::open(device, transport, label)?;
    let mut slot = ledger.slot(id)?;
    run_session(&mut session, &mut slot, options).await
}

/// 台帳の商品を選んで順にカウントする
///
/// 途中で終わっても、それまでの結果は一覧表示する。
pub async fn run_inventory(
    ledger: &mut InventoryLedger,
    source: &Path,
    transport: Arc<dyn Transport>,
    search: Option<&str>,
    options: &OperatorOptions,
) -> Result<()> {
    let outcome = inventory_loop(ledger, source, transport, search, options).await;
    print_ledger(ledger);
    outcome
}

async fn inventory_loop(
    ledger: &mut InventoryLedger,
    source: &Path,
    transport: Arc<dyn Transport>,
    search: Option<&str>,
    options: &OperatorOptions,
) -> Result<()> {
    let mut device = FolderDevice::new(source);

    loop {
        let (total, counted) = ledger.progress();
        println!("進捗: {}/{} 品目カウント済み", counted, total);

        let candidates: Vec<(String, String)> = ledger
            .search(search.unwrap_or(""))
            .into_iter()
            .map(|item| (item.id.clone(), item_line(item)))
            .collect();

        if candidates.is_empty() {
            println!("該当する商品がありません");
            return Ok(());
        }

        let mut items: Vec<&str> = candidates.iter().map(|(_, line)| line.as_str()).collect();
        items.push("終了");

        let index = select("カウントする商品", &items)?;
        let Some((id, _)) = candidates.get(index) else {
            return Ok(());
        };

        let labels: Vec<&str> = ItemAction::ALL.iter().map(|a| a.label()).collect();
        let action = ItemAction::ALL
            .get(select("操作", &labels)?)
            .copied()
            .unwrap_or(ItemAction::Back);

        let outcome = match action {
            ItemAction::Capture => count_item(ledger, id, &mut device, Arc::clone(&transport), options)
                .await
                .map(|report| match report {
                    Some(report) => println!("✔ {}個で確定\n", report.final_count),
                    None => println!("  → キャンセルしました\n"),
                }),
            ItemAction::Back => continue,
            _ => {
                let entered = match action {
                    ItemAction::SetCount => {
                        Some(prompt_count(ledger.get(id).map(|item| item.count))?)
                    }
                    _ => None,
                };
                adjust_item(ledger, id, action, entered).map(|count| {
                    if let Some(count) = count {
                        println!("✔ {}個に更新\n", count);
                    }
                })
            }
        };

        // 端末操作の失敗以外は、その商品だけ諦めて続ける
        match outcome {
            Ok(()) => {}
            Err(e @ ShelfCountError::Interaction(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(item = %id, error = %e, "item skipped");
                println!("⚠ {}\n", e);
            }
        }
    }
}

fn item_line(item: &InventoryItem) -> String {
    let mark = if item.is_counted { "✔" } else { " " };
    format!("{} {} [{}] {}個", mark, item.product_name, item.sku, item.count)
}

/// 台帳を一覧表示
pub fn print_ledger(ledger: &InventoryLedger) {
    println!("\n📋 棚卸し結果");
    println!("{:<8} {:<24} {:>6}  {}", "SKU", "商品名", "個数", "状態");
    for item in ledger.items() {
        println!(
            "{:<8} {:<24} {:>6}  {}",
            item.sku,
            item.product_name,
            item.count,
            if item.is_counted { "済" } else { "未" }
        );
    }
}

fn print_outcome<D: Device>(session: &CaptureSession<D>, surface: Option<SurfaceSize>) {
    if let Some(error) = session.error() {
        println!("⚠ {}", error.operator_message(session.label()));
        return;
    }

    let Some(result) = session.result() else {
        return;
    };

    println!("✔ AI検出数: {}個（矩形 {}件）", result.count, result.boxes.len());

    if let Some(surface) = display_surface(surface, session.image()) {
        for (i, rect) in project_all(result, surface).iter().enumerate() {
            println!(
                "  [{}] left={} top={} width={} height={}",
                i + 1,
                rect.left,
                rect.top,
                rect.width,
                rect.height
            );
        }
    }
}

fn prompt_action(has_result: bool) -> Result<ResolvedAction> {
    let actions = resolved_actions(has_result);
    let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
    let index = select("操作", &labels)?;

    Ok(actions.get(index).copied().unwrap_or(ResolvedAction::Cancel))
}

fn select(prompt: &str, items: &[&str]) -> Result<usize> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(|e| ShelfCountError::Interaction(e.to_string()))
}

fn prompt_count(initial: Option<u32>) -> Result<u32> {
    let mut input = Input::<u32>::new().with_prompt("個数");
    if let Some(initial) = initial {
        input = input.with_initial_text(initial.to_string());
    }
    input
        .interact_text()
        .map_err(|e| ShelfCountError::Interaction(e.to_string()))
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()
        .map_err(|e| ShelfCountError::Interaction(e.to_string()))
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
