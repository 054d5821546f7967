//! AIモデル呼び出し
//!
//! 画像と対象物体名を送り、モデルの生テキスト応答を受け取る。
//! 応答の解釈はここでは行わない（shelf_count_common::parser の役割）。

mod cli_command;
mod gemini;
mod reply_file;

pub use cli_command::CliTransport;
pub use gemini::GeminiTransport;
pub use reply_file::ReplyFileTransport;

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::device::ImageCapture;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// 通信レベルのエラー（モデル応答としては解釈しない）
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTPエラー: {0}")]
    Http(String),

    #[error("APIエラー (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("応答が空です")]
    EmptyResponse,

    #[error("CLI実行エラー: {0}")]
    Command(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

/// モデル呼び出し
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke_model(
        &self,
        image: &ImageCapture,
        expected_label: &str,
    ) -> std::result::Result<String, TransportError>;
}

/// プロバイダ指定から Transport を組み立てる
///
/// `reply_file` 指定時は保存済み応答を返すオフライン動作になる。
pub fn build_transport(
    provider: AiProvider,
    config: &Config,
    reply_file: Option<&Path>,
) -> Result<Arc<dyn Transport>> {
    if let Some(path) = reply_file {
        return Ok(Arc::new(ReplyFileTransport::new(path)));
    }

    if provider.is_cli() {
        return Ok(Arc::new(CliTransport::new(provider, config.prompt_dialect)));
    }

    Ok(Arc::new(GeminiTransport::from_config(config)?))
}
