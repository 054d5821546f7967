use clap::ValueEnum;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AiProvider {
    /// Gemini API（HTTP）
    Gemini,
    /// Claude CLI
    Claude,
    /// Codex CLI
    Codex,
}

impl AiProvider {
    pub fn command_name(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::Claude => "claude",
            AiProvider::Codex => "codex",
        }
    }

    /// ローカルCLI経由で呼び出すか
    pub fn is_cli(&self) -> bool {
        !matches!(self, AiProvider::Gemini)
    }
}
