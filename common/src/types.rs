//! 検出結果の型定義
//!
//! CLIと解析ロジックで共有される型:
//! - DetectionBox: 1物体分の矩形（座標系タグ付き）
//! - DetectionResult: AI応答から得られた個数と矩形リスト
//! - DetectionError: 応答を結果にできなかった理由
//! - SurfaceSize / PixelRect: オーバーレイ描画先と描画矩形

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as ThisError;

/// AIが宣言した画像サイズ（絶対ピクセル座標の基準）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSize {
    pub width: f64,
    pub height: f64,
}

impl ReferenceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 幅・高さともに正の有限値か
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// 矩形座標の単位
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CoordinateSpace {
    /// 0〜1に正規化済み（左上原点）
    Normalized01,
    /// `reference` を基準とした絶対ピクセル
    AbsolutePixels { reference: ReferenceSize },
}

/// 検出された1物体の範囲
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub space: CoordinateSpace,
}

impl DetectionBox {
    pub fn normalized(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2, space: CoordinateSpace::Normalized01 }
    }

    /// top/left/width/height 形式から絶対ピクセル矩形を作る
    pub fn from_top_left(top: f64, left: f64, width: f64, height: f64, reference: ReferenceSize) -> Self {
        Self {
            x1: left,
            y1: top,
            x2: left + width,
            y2: top + height,
            space: CoordinateSpace::AbsolutePixels { reference },
        }
    }

    /// 表示してよい矩形か
    ///
    /// - 全座標が有限
    /// - x2 > x1 かつ y2 > y1
    /// - 正規化座標は全て [0,1] 内
    /// - 絶対ピクセルは基準サイズが正
    pub fn is_valid(&self) -> bool {
        let coords = [self.x1, self.y1, self.x2, self.y2];
        if coords.iter().any(|v| !v.is_finite()) {
            return false;
        }
        if self.x2 <= self.x1 || self.y2 <= self.y1 {
            return false;
        }
        match self.space {
            CoordinateSpace::Normalized01 => coords.iter().all(|v| (0.0..=1.0).contains(v)),
            CoordinateSpace::AbsolutePixels { reference } => reference.is_usable(),
        }
    }
}

/// AI応答の解釈結果
///
/// `boxes.len()` と `count` は一致するとは限らない。
/// 個数はAIの申告値を正とする。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub count: u32,
    #[serde(default)]
    pub boxes: Vec<DetectionBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_size: Option<ReferenceSize>,
}

impl DetectionResult {
    pub fn count_only(count: u32) -> Self {
        Self { count, ..Default::default() }
    }
}

/// 解析失敗の種別
///
/// Displayはオペレーター向けの文言。`raw_text` は診断用でメッセージには含めない。
#[derive(ThisError, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DetectionError {
    #[error("対象外の物体が写っています: {observed_label}")]
    #[serde(rename_all = "camelCase")]
    LabelMismatch { observed_label: String },

    #[error("AIの応答を解釈できませんでした")]
    #[serde(rename_all = "camelCase")]
    UnparseableResponse { raw_text: String },

    #[error("AI呼び出しに失敗しました: {cause}")]
    TransportFailure { cause: String },
}

impl DetectionError {
    /// 画面表示用メッセージ（撮り直しの案内付き）
    pub fn operator_message(&self, expected_label: &str) -> String {
        match self {
            DetectionError::LabelMismatch { observed_label } if observed_label.is_empty() => {
                format!("「{}」以外の物体が検出されました。撮り直してください", expected_label)
            }
            DetectionError::LabelMismatch { observed_label } => format!(
                "「{}」ではなく「{}」が検出されました。撮り直してください",
                expected_label, observed_label
            ),
            DetectionError::UnparseableResponse { .. } => {
                "AIの応答形式が不正です。撮り直すか手動で入力してください".to_string()
            }
            DetectionError::TransportFailure { .. } => {
                format!("{}。通信状態を確認して撮り直してください", self)
            }
        }
    }
}

/// オーバーレイを描く画像要素の表示サイズ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSize {
    pub rendered_width: f64,
    pub rendered_height: f64,
}

impl SurfaceSize {
    pub fn new(rendered_width: f64, rendered_height: f64) -> Self {
        Self { rendered_width, rendered_height }
    }

    fn is_usable(&self) -> bool {
        self.rendered_width.is_finite()
            && self.rendered_height.is_finite()
            && self.rendered_width >= 0.0
            && self.rendered_height >= 0.0
    }

    pub(crate) fn checked(&self) -> Option<Self> {
        self.is_usable().then_some(*self)
    }
}

impl FromStr for SurfaceSize {
    type Err = Error;

    /// "640x480" 形式をパース
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let (w, h) = lower
            .split_once(['x', '*'])
            .ok_or_else(|| Error::Parse(format!("サイズは 幅x高さ で指定してください: {}", s)))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .ok_or_else(|| Error::Parse(format!("サイズの数値が不正です: {}", s)))
        };

        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rendered_width, self.rendered_height)
    }
}

/// 描画用の整数ピクセル矩形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 丸め前の矩形
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_validity() {
        assert!(DetectionBox::normalized(0.1, 0.2, 0.3, 0.4).is_valid());
        assert!(!DetectionBox::normalized(0.3, 0.2, 0.3, 0.4).is_valid());
        assert!(!DetectionBox::normalized(0.1, 0.4, 0.3, 0.2).is_valid());
        assert!(!DetectionBox::normalized(0.1, 0.2, 1.3, 0.4).is_valid());
        assert!(!DetectionBox::normalized(f64::NAN, 0.2, 0.3, 0.4).is_valid());
    }

    #[test]
    fn test_absolute_box_from_top_left() {
        let reference = ReferenceSize::new(640.0, 480.0);
        let b = DetectionBox::from_top_left(10.0, 20.0, 100.0, 50.0, reference);
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (20.0, 10.0, 120.0, 60.0));
        assert!(b.is_valid());

        let zero_ref = DetectionBox::from_top_left(10.0, 20.0, 100.0, 50.0, ReferenceSize::new(0.0, 480.0));
        assert!(!zero_ref.is_valid());

        let zero_width = DetectionBox::from_top_left(10.0, 20.0, 0.0, 50.0, reference);
        assert!(!zero_width.is_valid());
    }

    #[test]
    fn test_surface_size_from_str() {
        let size: SurfaceSize = "640x480".parse().unwrap();
        assert_eq!(size, SurfaceSize::new(640.0, 480.0));

        let size: SurfaceSize = " 320 X 200 ".parse().unwrap();
        assert_eq!(size, SurfaceSize::new(320.0, 200.0));

        assert!("640".parse::<SurfaceSize>().is_err());
        assert!("axb".parse::<SurfaceSize>().is_err());
        assert!("-1x10".parse::<SurfaceSize>().is_err());
    }

    #[test]
    fn test_detection_error_display_hides_raw_text() {
        let err = DetectionError::UnparseableResponse { raw_text: "secret model chatter".into() };
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_operator_message_label_mismatch() {
        let err = DetectionError::LabelMismatch { observed_label: "keyboard".into() };
        let msg = err.operator_message("wireless mouse");
        assert!(msg.contains("wireless mouse"));
        assert!(msg.contains("keyboard"));
    }

    #[test]
    fn test_detection_error_serialize_tagged() {
        let err = DetectionError::LabelMismatch { observed_label: "cup".into() };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"labelMismatch\""));
        assert!(json.contains("\"observedLabel\":\"cup\""));
    }

    #[test]
    fn test_detection_result_serialize_skips_missing_reference() {
        let result = DetectionResult::count_only(3);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"count\":3"));
        assert!(!json.contains("referenceSize"));
    }
}
