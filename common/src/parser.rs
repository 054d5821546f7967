//! AI応答パーサー
//!
//! ビジョンモデルの自由文応答から個数と物体矩形を抽出する。
//! 応答形式はモデルのバージョンによって異なるため、バージョン情報で分岐せず
//! 以下の優先順位で各パターンを順に試す:
//!
//! 1. `WRONG_ITEM:` マーカー（対象外の物体）
//! 2. 画像サイズ宣言付きの絶対ピクセル形式
//!    `Image dimensions: width: 640px, height: 480px. 2, [[top: .., left: .., width: .., height: ..], ...]`
//! 3. 正規化座標形式 `2, [[x1: .., y1: .., x2: .., y2: ..], ...]`
//! 4. 個数のみ（本文中の最初の整数）
//!
//! 全角の数字・記号は半角に揃えてから解釈する。数字として扱うのはASCIIの0〜9のみ。
//!
//! どの入力でもパニックせず、解釈できない場合は `UnparseableResponse` を返す。

use crate::types::{DetectionBox, DetectionError, DetectionResult, ReferenceSize};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::num::IntErrorKind;

const PIXEL_FIELDS: [&str; 4] = ["top", "left", "width", "height"];

/// 対象外の物体を示すマーカー
pub const WRONG_ITEM_MARKER: &str = "WRONG_ITEM:";

/// 解釈結果
pub type Interpretation = std::result::Result<DetectionResult, DetectionError>;

lazy_static! {
    // 数字はASCIIの0〜9のみ（\d はUnicodeの数字にも一致する）
    static ref DIMENSIONS_RE: Regex = Regex::new(
        r"(?i)image\s+dimensions\s*:\s*width\s*:\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\s*,?\s*height\s*:\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\.?"
    )
    .expect("dimensions pattern");
    static ref COUNTED_LIST_RE: Regex =
        Regex::new(r"(?s)(?:^|[^0-9.-])(-?[0-9]+)\s*,\s*\[\[(.*?)\]\]").expect("counted list pattern");
    static ref BRACKET_LIST_RE: Regex = Regex::new(r"(?s)\[\[.*?\]\]").expect("bracket list pattern");
    static ref OBJECT_SPLIT_RE: Regex = Regex::new(r"\]\s*,\s*\[").expect("object split pattern");
    static ref FIELD_RE: Regex =
        Regex::new(r"(?i)\b([a-z][a-z0-9]*)\s*:\s*(-?[0-9]*\.?[0-9]+)").expect("field pattern");
    static ref INTEGER_RE: Regex = Regex::new(r"-?[0-9]+").expect("integer pattern");
}

/// AI応答をパース
///
/// # Arguments
/// * `raw_text` - モデルの生テキスト応答
/// * `_expected_label` - 数えたい物体名（解析自体には影響しない）
///
/// # Returns
/// * `Ok(DetectionResult)` - 個数と矩形（矩形は空のこともある）
/// * `Err(DetectionError)` - `LabelMismatch` または `UnparseableResponse`
///
/// # Examples
/// ```
/// use shelf_count_common::parse_detection_response;
///
/// let result = parse_detection_response("1, [[x1: 0.2, y1: 0.3, x2: 0.8, y2: 0.7]]", "mouse").unwrap();
/// assert_eq!(result.count, 1);
/// assert_eq!(result.boxes.len(), 1);
/// ```
pub fn parse_detection_response(raw_text: &str, _expected_label: &str) -> Interpretation {
    let text = to_halfwidth(raw_text);

    if let Some(observed) = find_wrong_item(&text) {
        return Err(DetectionError::LabelMismatch { observed_label: observed });
    }

    if let Some(result) = parse_pixel_dialect(&text) {
        return Ok(result);
    }

    if let Some(result) = parse_normalized_dialect(&text) {
        return Ok(result);
    }

    if let Some(result) = parse_count_only(&text) {
        return Ok(result);
    }

    Err(DetectionError::UnparseableResponse { raw_text: raw_text.to_string() })
}

/// 全角の数字・記号を半角に揃える（文字は変えない）
fn to_halfwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => ((c as u32) - '０' as u32 + '0' as u32) as u8 as char,
            '，' | '、' => ',',
            '：' => ':',
            '．' => '.',
            '－' => '-',
            '［' => '[',
            '］' => ']',
            '　' => ' ',
            _ => c,
        })
        .collect()
}

/// マーカー以降のテキストを物体名として取り出す
fn find_wrong_item(text: &str) -> Option<String> {
    let start = text.find(WRONG_ITEM_MARKER)? + WRONG_ITEM_MARKER.len();
    let label = text[start..]
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '\'' | '"' | '`' | '[' | ']'));
    Some(label.to_string())
}

/// 画像サイズ宣言 + 絶対ピクセル形式
fn parse_pixel_dialect(text: &str) -> Option<DetectionResult> {
    let dims = DIMENSIONS_RE.captures(text)?;
    let reference = ReferenceSize::new(dims[1].parse().ok()?, dims[2].parse().ok()?);
    if !reference.is_usable() {
        return None;
    }

    let rest = &text[dims.get(0)?.end()..];
    let list = COUNTED_LIST_RE.captures(rest)?;

    // top/left/width/height を1つも持たないリストは別形式
    let objects: Vec<HashMap<String, f64>> = split_objects(&list[2]).map(extract_fields).collect();
    if !objects.iter().any(|f| PIXEL_FIELDS.iter().any(|k| f.contains_key(*k))) {
        return None;
    }

    let boxes = objects
        .iter()
        .filter_map(|f| {
            let b = DetectionBox::from_top_left(
                *f.get("top")?,
                *f.get("left")?,
                *f.get("width")?,
                *f.get("height")?,
                reference,
            );
            b.is_valid().then_some(b)
        })
        .collect();

    Some(DetectionResult {
        count: parse_count(&list[1])?,
        boxes,
        reference_size: Some(reference),
    })
}

/// 正規化座標形式
fn parse_normalized_dialect(text: &str) -> Option<DetectionResult> {
    let list = COUNTED_LIST_RE.captures(text)?;

    let boxes = split_objects(&list[2])
        .filter_map(|obj| {
            let f = extract_fields(obj);
            let b = DetectionBox::normalized(*f.get("x1")?, *f.get("y1")?, *f.get("x2")?, *f.get("y2")?);
            b.is_valid().then_some(b)
        })
        .collect();

    Some(DetectionResult {
        count: parse_count(&list[1])?,
        boxes,
        reference_size: None,
    })
}

/// 個数のみ
///
/// サイズ宣言と [[...]] を取り除いてから最初の整数を探す。
/// 宣言された幅や座標値を個数と取り違えないため。
fn parse_count_only(text: &str) -> Option<DetectionResult> {
    let without_header = DIMENSIONS_RE.replace_all(text, " ");
    let stripped = BRACKET_LIST_RE.replace_all(&without_header, " ");
    let count = INTEGER_RE.find_iter(&stripped).find_map(|m| parse_count(m.as_str()))?;
    Some(DetectionResult::count_only(count))
}

fn split_objects(list: &str) -> impl Iterator<Item = &str> {
    OBJECT_SPLIT_RE.split(list).map(str::trim).filter(|s| !s.is_empty())
}

/// `name: value` を全て抽出（名前は小文字化、重複時は先勝ち）
fn extract_fields(obj: &str) -> HashMap<String, f64> {
    let mut fields = HashMap::new();
    for cap in FIELD_RE.captures_iter(obj) {
        if let Ok(value) = cap[2].parse::<f64>() {
            fields.entry(cap[1].to_lowercase()).or_insert(value);
        }
    }
    fields
}

/// 個数は非負整数。負数は0、u32を超える値は飽和させる
///
/// 桁あふれ以外で整数にできない場合は `None`。
fn parse_count(literal: &str) -> Option<u32> {
    match literal.parse::<i64>() {
        Ok(n) => Some(n.clamp(0, u32::MAX as i64) as u32),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(u32::MAX),
            IntErrorKind::NegOverflow => Some(0),
            _ => None,
        },
    }
}
