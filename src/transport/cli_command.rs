//! AI CLI連携（claude / codex）
//!
//! 撮影画像を一時ファイルに書き出し、そのパスをプロンプトに含めて
//! CLIを実行する。標準出力をそのまま応答として返す。

use super::{Transport, TransportError};
use crate::ai_provider::AiProvider;
use crate::device::ImageCapture;
use async_trait::async_trait;
use shelf_count_common::{build_count_prompt, PromptDialect};
use std::io::Write;
use tokio::process::Command;

pub struct CliTransport {
    provider: AiProvider,
    dialect: PromptDialect,
}

impl CliTransport {
    pub fn new(provider: AiProvider, dialect: PromptDialect) -> Self {
        Self { provider, dialect }
    }

    fn build_prompt(&self, image_path: &str, expected_label: &str) -> String {
        format!(
            "Read the following image file and analyze it: {}\n\n{}",
            image_path,
            build_count_prompt(expected_label, self.dialect)
        )
    }

    fn command_args(&self, prompt: String) -> Vec<String> {
        match self.provider {
            AiProvider::Claude => vec!["-p".into(), prompt, "--output-format".into(), "text".into()],
            AiProvider::Codex => vec!["exec".into(), prompt],
            AiProvider::Gemini => vec!["-p".into(), prompt],
        }
    }
}

#[async_trait]
impl Transport for CliTransport {
    async fn invoke_model(
        &self,
        image: &ImageCapture,
        expected_label: &str,
    ) -> Result<String, TransportError> {
        let mut file = tempfile::Builder::new()
            .prefix("shelf-count-")
            .suffix(&format!(".{}", image.file_extension()))
            .tempfile()?;
        file.write_all(image.bytes())?;
        file.flush()?;

        let image_path = file.path().display().to_string().replace('\\', "/");
        let prompt = self.build_prompt(&image_path, expected_label);
        let name = self.provider.command_name();

        tracing::info!(cli = name, label = expected_label, prompt_chars = prompt.len(), "calling ai cli");

        // Windowsではcmd /c経由（改行はスペースに置換）
        #[cfg(windows)]
        let output = Command::new("cmd")
            .arg("/c")
            .arg(name)
            .args(self.command_args(prompt.replace('\n', " ")))
            .output()
            .await;

        #[cfg(not(windows))]
        let output = Command::new(name).args(self.command_args(prompt)).output().await;

        let output = output.map_err(|e| TransportError::Command(format!("{} 実行エラー: {}", name, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Command(format!(
                "{} failed (code {:?}): {}",
                name,
                output.status.code(),
                stderr.trim()
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();
        if response.trim().is_empty() {
            return Err(TransportError::EmptyResponse);
        }

        let preview: String = response.chars().take(200).collect();
        tracing::debug!(chars = response.len(), preview = %preview, "ai cli replied");

        Ok(response)
    }
}
