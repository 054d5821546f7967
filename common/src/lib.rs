//! Shelf Count Common Library
//!
//! 個数カウントの中核ロジック（I/Oなし）:
//! - parser: AI応答 → DetectionResult / DetectionError
//! - projector: 検出矩形 → 描画ピクセル矩形
//! - prompts: モデルに送るプロンプト

pub mod types;
pub mod error;
pub mod parser;
pub mod projector;
pub mod prompts;

pub use types::{
    CoordinateSpace, DetectionBox, DetectionError, DetectionResult, PixelRect, RectF,
    ReferenceSize, SurfaceSize,
};
pub use error::{Error, Result};
pub use parser::{parse_detection_response, Interpretation, WRONG_ITEM_MARKER};
pub use projector::{project, project_all, project_precise};
pub use prompts::{build_count_prompt, PromptDialect};
