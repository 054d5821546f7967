//! プロンプト生成モジュール
//!
//! 個数カウント用プロンプト。応答形式は `PromptDialect` で選ぶ:
//! - Normalized: 0〜1の正規化座標（既定）
//! - Pixel: 画像サイズ宣言 + 絶対ピクセル座標
//!
//! どちらの形式の応答も parser 側で解釈できる。

use crate::error::{Error, Result};
use crate::parser::WRONG_ITEM_MARKER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 要求する応答形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptDialect {
    /// 正規化座標 `x1, y1, x2, y2`
    #[default]
    Normalized,
    /// 絶対ピクセル `top, left, width, height`
    Pixel,
}

impl FromStr for PromptDialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normalized" | "norm" | "n" => Ok(PromptDialect::Normalized),
            "pixel" | "px" | "p" => Ok(PromptDialect::Pixel),
            _ => Err(Error::Config(format!(
                "Unknown prompt dialect: {}. Use normalized or pixel",
                s
            ))),
        }
    }
}

impl fmt::Display for PromptDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptDialect::Normalized => write!(f, "normalized"),
            PromptDialect::Pixel => write!(f, "pixel"),
        }
    }
}

/// 個数カウント用プロンプト生成
///
/// # Arguments
/// * `expected_label` - 数えたい物体名
/// * `dialect` - 応答形式
pub fn build_count_prompt(expected_label: &str, dialect: PromptDialect) -> String {
    let (format_rules, example) = match dialect {
        PromptDialect::Normalized => (
            r#"   3. For each object, provide normalized coordinates (0-1 range) for bounding boxes.
Format:
- The response should contain:
  1. Number of items found.
  2. A list of objects, each with normalized coordinates (0-1 range):
     - x1: Left position (0-1)
     - y1: Top position (0-1)
     - x2: Right position (0-1)
     - y2: Bottom position (0-1)"#,
            "1, [[x1: 0.2, y1: 0.3, x2: 0.8, y2: 0.7]]",
        ),
        PromptDialect::Pixel => (
            r#"   3. First state the image dimensions in pixels.
   4. For each object, provide its bounding box in pixels relative to those dimensions.
Format:
- The response should contain:
  1. The image dimensions.
  2. Number of items found.
  3. A list of objects, each with pixel values:
     - top: Distance from the top edge
     - left: Distance from the left edge
     - width: Box width
     - height: Box height"#,
            "Image dimensions: width: 1024px, height: 768px. 1, [[top: 120, left: 200, width: 300, height: 240]]",
        ),
    };

    format!(
        r#"Task: Count objects in inventory image.
Context: Looking for {label}.
Rules:
   1. If image shows a different item, respond '{marker} [item name]'.
   2. If image shows the correct item, respond with the number of objects found.
{format_rules}
Example response:
- For wrong item: '{marker} keyboard'
- For correct item: '{example}'
Respond with the result only."#,
        label = expected_label,
        marker = WRONG_ITEM_MARKER,
        format_rules = format_rules,
        example = example,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_detection_response;

    #[test]
    fn test_prompt_contains_label_and_marker() {
        let prompt = build_count_prompt("usb-c cable", PromptDialect::Normalized);
        assert!(prompt.contains("Looking for usb-c cable."));
        assert!(prompt.contains("WRONG_ITEM:"));
        assert!(prompt.contains("x1"));
        assert!(!prompt.contains("Image dimensions"));
    }

    #[test]
    fn test_pixel_prompt_requests_dimensions() {
        let prompt = build_count_prompt("monitor stand", PromptDialect::Pixel);
        assert!(prompt.contains("Image dimensions"));
        assert!(prompt.contains("top"));
    }

    #[test]
    fn test_prompt_examples_are_parseable() {
        // プロンプト内の例示がそのままパーサーで解釈できること
        let normalized = parse_detection_response("1, [[x1: 0.2, y1: 0.3, x2: 0.8, y2: 0.7]]", "x").unwrap();
        assert_eq!(normalized.boxes.len(), 1);

        let pixel = parse_detection_response(
            "Image dimensions: width: 1024px, height: 768px. 1, [[top: 120, left: 200, width: 300, height: 240]]",
            "x",
        )
        .unwrap();
        assert_eq!(pixel.boxes.len(), 1);
        assert!(pixel.reference_size.is_some());
    }

    #[test]
    fn test_prompt_dialect_from_str() {
        assert_eq!("normalized".parse::<PromptDialect>().unwrap(), PromptDialect::Normalized);
        assert_eq!("PIXEL".parse::<PromptDialect>().unwrap(), PromptDialect::Pixel);
        assert!("json".parse::<PromptDialect>().is_err());
    }

    #[test]
    fn test_prompt_dialect_display_roundtrip() {
        for d in [PromptDialect::Normalized, PromptDialect::Pixel] {
            assert_eq!(d.to_string().parse::<PromptDialect>().unwrap(), d);
        }
    }
}
