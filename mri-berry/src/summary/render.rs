//! 日志图像的渲染.

use crate::error::Result;
use image::{GenericImage, Rgb, RgbImage};
use ndarray::ArrayView2;

/// 空白与背景色.
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[inline]
fn unit_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `jet` 色图. `t` 截断到 `[0, 1]`: 0 为深蓝, 1 为深红.
pub fn jet(t: f64) -> Rgb<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let channel = |center: f64| unit_to_u8(1.5 - (4.0 * t - center).abs());
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// `Blues` 色图. `t` 截断到 `[0, 1]`: 0 近白, 1 为深蓝.
pub fn blues(t: f64) -> Rgb<u8> {
    const LOW: [f64; 3] = [247.0, 251.0, 255.0];
    const HIGH: [f64; 3] = [8.0, 48.0, 107.0];
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    Rgb([0, 1, 2].map(|i| (LOW[i] + (HIGH[i] - LOW[i]) * t).round() as u8))
}

/// 将类别图按 `jet` 色图映射为彩色图像, 色阶覆盖 `[0, num_class - 1]`.
pub fn label_to_rgb(labels: ArrayView2<u8>, num_class: usize) -> RgbImage {
    let (height, width) = labels.dim();
    let vmax = num_class.saturating_sub(1).max(1) as f64;
    let mut buf = RgbImage::new(width as u32, height as u32);
    for ((h, w), &class) in labels.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, jet(class as f64 / vmax));
    }
    buf
}

/// 左右并排两张图像, 中间留 `gap` 像素白边. 高度不同时以较高者为准, 空白处为白色.
pub fn side_by_side(left: &RgbImage, right: &RgbImage, gap: u32) -> Result<RgbImage> {
    let width = left.width() + gap + right.width();
    let height = left.height().max(right.height());
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    canvas.copy_from(left, 0, 0)?;
    canvas.copy_from(right, left.width() + gap, 0)?;
    Ok(canvas)
}

/// 混淆矩阵热力图. 每个单元格为 `cell * cell` 像素, 颜色按矩阵最大值归一化后取 `Blues`.
///
/// 第 `i` 行对应真值类别 `i`, 第 `j` 列对应预测类别 `j`.
pub fn confusion_heatmap(values: ArrayView2<f64>, cell: u32) -> RgbImage {
    let (rows, cols) = values.dim();
    let cell = cell.max(1);
    let vmax = values.iter().copied().fold(0.0f64, f64::max);
    let scale = if vmax > 0.0 { 1.0 / vmax } else { 0.0 };

    let mut buf = RgbImage::new(cols as u32 * cell, rows as u32 * cell);
    for ((i, j), &v) in values.indexed_iter() {
        let color = blues(v * scale);
        for dy in 0..cell {
            for dx in 0..cell {
                buf.put_pixel(j as u32 * cell + dx, i as u32 * cell + dy, color);
            }
        }
    }
    buf
}

/// 带标注混淆矩阵中单元格的边长.
#[cfg(feature = "plot")]
const LABELLED_CELL: u32 = 32;

/// 带刻度与数值标注的混淆矩阵图.
///
/// 第 `i` 行 (自上而下) 为真值类别 `i`, 左侧标注 `class_names[i]`; 第 `j` 列为预测类别 `j`,
/// 下方标注编号 `j`. 每个单元格中写出两位小数的数值.
#[cfg(feature = "plot")]
pub fn labelled_confusion_heatmap<N: AsRef<str>>(
    values: ArrayView2<f64>,
    class_names: &[N],
    title: &str,
) -> Result<RgbImage> {
    use crate::error::Error;
    use plotters::prelude::{
        BitMapBackend, Color, IntoDrawingArea, IntoFont, RGBColor, Rectangle, Text, TextStyle,
    };
    use plotters::style::text_anchor::{HPos, Pos, VPos};

    const TITLE: u32 = 32;
    const TICKS: u32 = 20;
    const MARGIN: u32 = 8;

    let plot_err = |e: &dyn std::fmt::Display| Error::Plot(e.to_string());
    let (rows, cols) = values.dim();
    let longest = class_names.iter().map(|n| n.as_ref().chars().count()).max();
    let label_area = (longest.unwrap_or(0) as u32 * 7 + 2 * MARGIN).min(200);
    let width = label_area + cols as u32 * LABELLED_CELL + MARGIN;
    let height = TITLE + rows as u32 * LABELLED_CELL + TICKS + MARGIN;

    let vmax = values.iter().copied().fold(0.0f64, f64::max);
    let scale = if vmax > 0.0 { 1.0 / vmax } else { 0.0 };
    let cell = LABELLED_CELL as i32;
    let (left, top) = (label_area as i32, TITLE as i32);
    let style = |anchor: Pos, color: RGBColor| {
        TextStyle {
            color: color.to_backend_color(),
            ..TextStyle::from(("sans-serif", 12).into_font()).pos(anchor)
        }
    };
    let black = RGBColor(0, 0, 0);
    let white = RGBColor(255, 255, 255);

    let mut buf = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        root.fill(&white).map_err(|e| plot_err(&e))?;
        root.draw(&Text::new(
            title.to_string(),
            (width as i32 / 2, TITLE as i32 / 2),
            TextStyle::from(("sans-serif", 16).into_font()).pos(Pos::new(HPos::Center, VPos::Center)),
        ))
        .map_err(|e| plot_err(&e))?;

        for ((i, j), &v) in values.indexed_iter() {
            let t = v * scale;
            let Rgb([r, g, b]) = blues(t);
            let (x, y) = (left + j as i32 * cell, top + i as i32 * cell);
            root.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                RGBColor(r, g, b).filled(),
            ))
            .map_err(|e| plot_err(&e))?;
            let ink = if t > 0.5 { white } else { black };
            root.draw(&Text::new(
                format!("{v:.2}"),
                (x + cell / 2, y + cell / 2),
                style(Pos::new(HPos::Center, VPos::Center), ink),
            ))
            .map_err(|e| plot_err(&e))?;
        }
        for (i, name) in class_names.iter().enumerate().take(rows) {
            root.draw(&Text::new(
                name.as_ref().to_string(),
                (left - MARGIN as i32, top + i as i32 * cell + cell / 2),
                style(Pos::new(HPos::Right, VPos::Center), black),
            ))
            .map_err(|e| plot_err(&e))?;
        }
        let tick_y = top + rows as i32 * cell + TICKS as i32 / 2;
        for j in 0..cols {
            root.draw(&Text::new(
                j.to_string(),
                (left + j as i32 * cell + cell / 2, tick_y),
                style(Pos::new(HPos::Center, VPos::Center), black),
            ))
            .map_err(|e| plot_err(&e))?;
        }
        root.present().map_err(|e| plot_err(&e))?;
    }
    RgbImage::from_raw(width, height, buf).ok_or_else(|| Error::Plot("image buffer size".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0.0), Rgb([0, 0, 128]));
        assert_eq!(jet(1.0), Rgb([128, 0, 0]));
        assert_eq!(jet(0.5), Rgb([128, 255, 128]));
        assert_eq!(jet(-3.0), jet(0.0));
        assert_eq!(jet(f64::NAN), jet(0.0));
    }

    #[test]
    fn test_blues_endpoints() {
        assert_eq!(blues(0.0), Rgb([247, 251, 255]));
        assert_eq!(blues(1.0), Rgb([8, 48, 107]));
    }

    #[test]
    fn test_label_image_and_side_by_side() {
        let labels = arr2(&[[0u8, 2], [1, 2]]);
        let img = label_to_rgb(labels.view(), 3);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(*img.get_pixel(0, 0), jet(0.0));
        assert_eq!(*img.get_pixel(1, 0), jet(1.0));

        let tall = RgbImage::new(1, 3);
        let both = side_by_side(&img, &tall, 2).unwrap();
        assert_eq!(both.dimensions(), (5, 3));
        assert_eq!(*both.get_pixel(2, 0), WHITE);
        assert_eq!(*both.get_pixel(0, 2), WHITE);
        assert_eq!(*both.get_pixel(4, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_heatmap_cells() {
        let cm = arr2(&[[4.0, 0.0], [1.0, 3.0]]);
        let img = confusion_heatmap(cm.view(), 3);
        assert_eq!(img.dimensions(), (6, 6));
        assert_eq!(*img.get_pixel(2, 2), blues(1.0));
        assert_eq!(*img.get_pixel(5, 0), blues(0.0));
    }

    #[cfg(feature = "plot")]
    #[test]
    fn test_labelled_heatmap_layout() {
        let cm = arr2(&[[1.0, 0.0], [0.25, 0.75]]);
        let img = labelled_confusion_heatmap(cm.view(), &["Background", "Hippocampus"], "cm")
            .unwrap();
        let (w, h) = img.dimensions();
        assert!(w > 2 * LABELLED_CELL && h > 2 * LABELLED_CELL);
        // 右下单元格的角落不会被数值文字覆盖.
        assert_eq!(*img.get_pixel(w - 9, h - 29), blues(0.75));
    }
}
