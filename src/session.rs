//! 撮影セッション
//!
//! 状態遷移:
//! - Live --capture()--> Captured --(自動)--> Processing --resolve()--> Resolved
//! - Resolved --retake()--> Live
//! - Resolved --confirm()--> Closed
//! - 任意の状態 --cancel()--> Closed
//!
//! モデル呼び出し中でも cancel() できるよう、撮影と応答の反映を分けている。
//! `capture()` が返す `Submission` を送信し、得られた `Reply` を `resolve()` に渡す。
//! 応答はチケット（セッションID + 撮影回数）が一致する場合のみ反映される。

use crate::device::{Device, ImageCapture};
use crate::error::{Result, ShelfCountError};
use crate::transport::{Transport, TransportError};
use serde::Serialize;
use shelf_count_common::{
    parse_detection_response, DetectionBox, DetectionError, DetectionResult, Interpretation,
    ReferenceSize,
};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// カメラ映像表示中（未撮影）
    Live,
    /// 静止画を撮影済み
    Captured,
    /// モデル応答待ち
    Processing,
    /// 結果（またはエラー）確認待ち
    Resolved,
    /// 終了
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Live => "撮影待ち",
            SessionStatus::Captured => "撮影済み",
            SessionStatus::Processing => "解析中",
            SessionStatus::Resolved => "結果確認",
            SessionStatus::Closed => "終了",
        };
        write!(f, "{}", name)
    }
}

/// どのセッションの何回目の撮影かを示す
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    session: Uuid,
    attempt: u64,
}

impl Ticket {
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

/// 送信待ちのモデル呼び出し（1撮影につき1つ）
pub struct Submission {
    ticket: Ticket,
    image: ImageCapture,
    label: String,
    transport: Arc<dyn Transport>,
}

impl Submission {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// モデルを呼び出す（リトライなし）
    pub async fn send(self) -> Reply {
        let outcome = self.transport.invoke_model(&self.image, &self.label).await;
        Reply {
            ticket: self.ticket,
            outcome,
        }
    }
}

/// モデル呼び出しの結果
#[derive(Debug)]
pub struct Reply {
    ticket: Ticket,
    outcome: std::result::Result<String, TransportError>,
}

impl Reply {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// 確定時に照合側へ渡す内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountReport {
    pub label: String,
    pub final_count: u32,
    /// AIが申告した個数
    pub detected_count: u32,
    /// 手入力の個数で確定したか
    pub manual_override: bool,
    pub boxes: Vec<DetectionBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_size: Option<ReferenceSize>,
}

/// 確定結果の受け取り手
///
/// 確定1回につきちょうど1回呼ばれる。キャンセル時は呼ばれない。
pub trait Reconciler {
    fn reconcile(&mut self, report: &CountReport);
}

impl Reconciler for Vec<CountReport> {
    fn reconcile(&mut self, report: &CountReport) {
        self.push(report.clone());
    }
}

pub struct CaptureSession<D: Device> {
    id: Uuid,
    label: String,
    device: D,
    transport: Arc<dyn Transport>,
    stream: Option<D::Stream>,
    status: SessionStatus,
    image: Option<ImageCapture>,
    outcome: Option<Interpretation>,
    manual_count: Option<u32>,
    attempt: u64,
}

impl<D: Device> CaptureSession<D> {
    /// カメラを開いて Live で開始
    pub fn open(mut device: D, transport: Arc<dyn Transport>, label: impl Into<String>) -> Result<Self> {
        let stream = device.open_stream()?;
        let session = Self {
            id: Uuid::new_v4(),
            label: label.into(),
            device,
            transport,
            stream: Some(stream),
            status: SessionStatus::Live,
            image: None,
            outcome: None,
            manual_count: None,
            attempt: 0,
        };
        tracing::info!(session = %session.id, label = %session.label, "capture session opened");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn is_stream_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn image(&self) -> Option<&ImageCapture> {
        self.image.as_ref()
    }

    pub fn outcome(&self) -> Option<&Interpretation> {
        self.outcome.as_ref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.outcome.as_ref().and_then(|o| o.as_ref().ok())
    }

    pub fn error(&self) -> Option<&DetectionError> {
        self.outcome.as_ref().and_then(|o| o.as_ref().err())
    }

    pub fn manual_count(&self) -> Option<u32> {
        self.manual_count
    }

    /// 撮影してモデル呼び出しを準備する
    ///
    /// Live 以外では何もせず `Ok(None)`。呼び出し中の二重送信はこれで防ぐ。
    /// 撮影に失敗した場合は Live のままエラーを返す。
    pub fn capture(&mut self) -> Result<Option<Submission>> {
        if self.status != SessionStatus::Live {
            tracing::debug!(session = %self.id, status = ?self.status, "capture ignored");
            return Ok(None);
        }

        let Some(stream) = self.stream.as_ref() else {
            return Err(ShelfCountError::Device("カメラが開いていません".into()));
        };
        let image = self.device.snapshot(stream)?;

        self.release_stream();
        self.image = Some(image.clone());
        self.status = SessionStatus::Captured;
        tracing::info!(session = %self.id, source = image.source(), bytes = image.len(), "frame captured");

        Ok(Some(self.submit(image)))
    }

    fn submit(&mut self, image: ImageCapture) -> Submission {
        self.attempt += 1;
        self.status = SessionStatus::Processing;

        Submission {
            ticket: self.current_ticket(),
            image,
            label: self.label.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    fn current_ticket(&self) -> Ticket {
        Ticket {
            session: self.id,
            attempt: self.attempt,
        }
    }

    /// モデル応答を反映する
    ///
    /// 他のセッション・前回の撮影・キャンセル後の応答は破棄して `false` を返す。
    pub fn resolve(&mut self, reply: Reply) -> bool {
        if self.status != SessionStatus::Processing || reply.ticket != self.current_ticket() {
            tracing::warn!(
                session = %self.id,
                status = ?self.status,
                reply_session = %reply.ticket.session,
                reply_attempt = reply.ticket.attempt,
                "stale reply discarded"
            );
            return false;
        }

        let outcome = match reply.outcome {
            Ok(text) => parse_detection_response(&text, &self.label),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "transport failed");
                Err(DetectionError::TransportFailure { cause: e.to_string() })
            }
        };

        match &outcome {
            Ok(result) => tracing::info!(
                session = %self.id,
                count = result.count,
                boxes = result.boxes.len(),
                "detection resolved"
            ),
            Err(DetectionError::UnparseableResponse { raw_text }) => {
                tracing::warn!(session = %self.id, "unparseable model reply");
                tracing::debug!(session = %self.id, raw = %raw_text, "raw model reply");
            }
            Err(e) => tracing::info!(session = %self.id, error = %e, "detection failed"),
        }

        self.outcome = Some(outcome);
        self.status = SessionStatus::Resolved;
        true
    }

    /// 撮影 → モデル呼び出し → 反映 を続けて行う
    pub async fn capture_and_resolve(&mut self) -> Result<SessionStatus> {
        if let Some(submission) = self.capture()? {
            let reply = submission.send().await;
            self.resolve(reply);
        }
        Ok(self.status)
    }

    /// 手入力の個数を設定（None で解除）
    pub fn set_manual_count(&mut self, count: Option<u32>) -> Result<()> {
        self.require(SessionStatus::Resolved, "手入力")?;
        self.manual_count = count;
        Ok(())
    }

    /// 撮り直し（撮影画像と結果を破棄してカメラを開き直す）
    pub fn retake(&mut self) -> Result<()> {
        self.require(SessionStatus::Resolved, "撮り直し")?;

        let stream = self.device.open_stream()?;
        self.stream = Some(stream);
        self.image = None;
        self.outcome = None;
        self.manual_count = None;
        self.status = SessionStatus::Live;

        tracing::info!(session = %self.id, "retake");
        Ok(())
    }

    /// 個数を確定して照合側に渡す
    ///
    /// `manual_override` → 設定済みの手入力 → AI申告値 の順で採用する。
    /// エラー結果の上では確定できない。
    pub fn confirm(
        &mut self,
        manual_override: Option<u32>,
        reconciler: &mut dyn Reconciler,
    ) -> Result<CountReport> {
        self.require(SessionStatus::Resolved, "確定")?;

        let result = match &self.outcome {
            Some(Ok(result)) => result,
            _ => return Err(ShelfCountError::NothingToConfirm),
        };

        let manual = manual_override.or(self.manual_count);
        let report = CountReport {
            label: self.label.clone(),
            final_count: manual.unwrap_or(result.count),
            detected_count: result.count,
            manual_override: manual.is_some(),
            boxes: result.boxes.clone(),
            reference_size: result.reference_size,
        };

        reconciler.reconcile(&report);
        tracing::info!(
            session = %self.id,
            final_count = report.final_count,
            detected = report.detected_count,
            "count confirmed"
        );

        self.close();
        Ok(report)
    }

    /// セッションを破棄（照合側には何も渡さない）
    pub fn cancel(&mut self) {
        if self.status == SessionStatus::Closed {
            return;
        }
        tracing::info!(session = %self.id, status = ?self.status, "capture session cancelled");
        self.close();
    }

    fn require(&self, expected: SessionStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ShelfCountError::InvalidTransition {
                state: self.status,
                action,
            })
        }
    }

    fn close(&mut self) {
        self.release_stream();
        self.image = None;
        self.outcome = None;
        self.manual_count = None;
        self.status = SessionStatus::Closed;
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.device.close_stream(stream);
        }
    }
}

impl<D: Device> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.release_stream();
    }
}
