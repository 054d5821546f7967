use crate::session::SessionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfCountError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`shelf-count config --set-api-key YOUR_KEY` で設定するか GEMINI_API_KEY を指定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("カメラエラー: {0}")]
    Device(String),

    #[error("{state}状態では{action}できません")]
    InvalidTransition {
        state: SessionStatus,
        action: &'static str,
    },

    #[error("確定できる検出結果がありません（撮り直しかキャンセルしてください）")]
    NothingToConfirm,

    #[error("商品が見つかりません: {0}")]
    ItemNotFound(String),

    #[error("入力エラー: {0}")]
    Interaction(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] shelf_count_common::Error),
}

pub type Result<T> = std::result::Result<T, ShelfCountError>;
