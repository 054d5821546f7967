//! 検出矩形の描画座標変換
//!
//! 正規化座標・絶対ピクセル座標のどちらで返ってきた矩形も、
//! 実際に表示されている画像要素のピクセル矩形に変換する。
//! クリッピングはしない（描画側の責務）。

use crate::types::{CoordinateSpace, DetectionBox, DetectionResult, PixelRect, RectF, SurfaceSize};

/// 矩形を表示サイズに投影（丸めなし）
///
/// 縦横は独立にスケールする。基準サイズと表示サイズのアスペクト比が
/// 異なる場合の歪みはそのまま受け入れる。
///
/// 不正な矩形・表示サイズの場合は全て0の矩形を返す。
pub fn project_precise(detection: &DetectionBox, surface: SurfaceSize) -> RectF {
    let Some(surface) = surface.checked() else {
        return RectF::default();
    };
    if !detection.is_valid() {
        return RectF::default();
    }

    let (sx, sy) = match detection.space {
        CoordinateSpace::Normalized01 => (surface.rendered_width, surface.rendered_height),
        CoordinateSpace::AbsolutePixels { reference } => (
            surface.rendered_width / reference.width,
            surface.rendered_height / reference.height,
        ),
    };

    RectF {
        left: detection.x1 * sx,
        top: detection.y1 * sy,
        width: (detection.x2 - detection.x1) * sx,
        height: (detection.y2 - detection.y1) * sy,
    }
}

/// 矩形を表示サイズに投影（整数ピクセル）
///
/// 各値を独立に四捨五入する（右端を丸めてから引き算しない）。
///
/// # Examples
/// ```
/// use shelf_count_common::{project, DetectionBox, PixelRect, SurfaceSize};
///
/// let b = DetectionBox::normalized(0.2, 0.3, 0.8, 0.7);
/// let rect = project(&b, SurfaceSize::new(100.0, 200.0));
/// assert_eq!(rect, PixelRect { left: 20, top: 60, width: 60, height: 80 });
/// ```
pub fn project(detection: &DetectionBox, surface: SurfaceSize) -> PixelRect {
    let rect = project_precise(detection, surface);
    PixelRect {
        left: rect.left.round() as i64,
        top: rect.top.round() as i64,
        width: rect.width.round() as i64,
        height: rect.height.round() as i64,
    }
}

/// 結果内の全矩形を順に投影
pub fn project_all(result: &DetectionResult, surface: SurfaceSize) -> Vec<PixelRect> {
    result.boxes.iter().map(|b| project(b, surface)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceSize;

    #[test]
    fn test_project_normalized() {
        let b = DetectionBox::normalized(0.25, 0.5, 0.75, 1.0);
        let rect = project(&b, SurfaceSize::new(400.0, 300.0));
        assert_eq!(rect, PixelRect { left: 100, top: 150, width: 200, height: 150 });
    }

    #[test]
    fn test_project_rounds_each_field_independently() {
        // x1*W = 33.3, x2*W = 66.6, 幅 = 33.3
        let b = DetectionBox::normalized(0.333, 0.0, 0.666, 0.5);
        let rect = project(&b, SurfaceSize::new(100.0, 10.0));
        assert_eq!(rect.left, 33);
        assert_eq!(rect.width, 33);
        assert_eq!(rect.height, 5);
    }

    #[test]
    fn test_project_absolute_same_size() {
        let reference = ReferenceSize::new(640.0, 480.0);
        let b = DetectionBox::from_top_left(10.0, 20.0, 100.0, 50.0, reference);
        let rect = project(&b, SurfaceSize::new(640.0, 480.0));
        assert_eq!(rect, PixelRect { left: 20, top: 10, width: 100, height: 50 });
    }

    #[test]
    fn test_project_absolute_rescaled_per_axis() {
        let reference = ReferenceSize::new(640.0, 480.0);
        let b = DetectionBox::from_top_left(48.0, 64.0, 128.0, 96.0, reference);

        // 横1/2、縦1/4（アスペクト比が異なっても補正しない）
        let rect = project(&b, SurfaceSize::new(320.0, 120.0));
        assert_eq!(rect, PixelRect { left: 32, top: 12, width: 64, height: 24 });
    }

    #[test]
    fn test_project_is_idempotent() {
        let b = DetectionBox::normalized(0.13, 0.27, 0.61, 0.94);
        let surface = SurfaceSize::new(777.0, 333.0);
        assert_eq!(project(&b, surface), project(&b, surface));
    }

    #[test]
    fn test_project_scales_linearly() {
        let b = DetectionBox::normalized(0.125, 0.25, 0.625, 0.75);
        let small = project(&b, SurfaceSize::new(160.0, 120.0));
        let large = project(&b, SurfaceSize::new(320.0, 240.0));
        assert_eq!(large.left, small.left * 2);
        assert_eq!(large.top, small.top * 2);
        assert_eq!(large.width, small.width * 2);
        assert_eq!(large.height, small.height * 2);

        let small = project_precise(&b, SurfaceSize::new(123.0, 457.0));
        let large = project_precise(&b, SurfaceSize::new(246.0, 914.0));
        assert_eq!(large.left, small.left * 2.0);
        assert_eq!(large.width, small.width * 2.0);
        assert_eq!(large.height, small.height * 2.0);
    }

    #[test]
    fn test_project_no_clipping() {
        let reference = ReferenceSize::new(100.0, 100.0);
        let b = DetectionBox::from_top_left(90.0, 90.0, 50.0, 50.0, reference);
        let rect = project(&b, SurfaceSize::new(100.0, 100.0));
        assert_eq!(rect, PixelRect { left: 90, top: 90, width: 50, height: 50 });
    }

    #[test]
    fn test_project_invalid_box_degenerates() {
        let b = DetectionBox::normalized(0.8, 0.3, 0.2, 0.7);
        assert_eq!(project(&b, SurfaceSize::new(100.0, 100.0)), PixelRect::default());

        let zero_ref = DetectionBox::from_top_left(1.0, 1.0, 5.0, 5.0, ReferenceSize::new(0.0, 0.0));
        assert_eq!(project(&zero_ref, SurfaceSize::new(100.0, 100.0)), PixelRect::default());
    }

    #[test]
    fn test_project_invalid_surface_degenerates() {
        let b = DetectionBox::normalized(0.2, 0.3, 0.8, 0.7);
        assert_eq!(project(&b, SurfaceSize::new(f64::NAN, 100.0)), PixelRect::default());
        assert_eq!(project(&b, SurfaceSize::new(-10.0, 100.0)), PixelRect::default());
        assert!(project(&b, SurfaceSize::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_project_all_keeps_order() {
        let result = DetectionResult {
            count: 5,
            boxes: vec![
                DetectionBox::normalized(0.0, 0.0, 0.5, 0.5),
                DetectionBox::normalized(0.5, 0.5, 1.0, 1.0),
            ],
            reference_size: None,
        };
        let rects = project_all(&result, SurfaceSize::new(10.0, 10.0));
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].left, 0);
        assert_eq!(rects[1].left, 5);
    }
}
