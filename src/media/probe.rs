//! # 尺寸探测
//!
//! 只读图片头部获取宽高，不做完整解码。探测是一个显式的挂起点：
//! 放到阻塞线程执行，并受超时约束，调用方总能拿到明确的成功或失败结果。
//! SVG 没有像素尺寸，从根元素的 `width`/`height` 或 `viewBox` 读取。

use std::io::Cursor;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::MediaError;
use super::loader::looks_like_svg;

static SVG_ROOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<svg\b[^>]*>").expect("SVG 根元素正则必须可编译"));
static SVG_WIDTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\swidth\s*=\s*["']\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\s*["']"#).expect("SVG 宽度正则必须可编译")
});
static SVG_HEIGHT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\sheight\s*=\s*["']\s*([0-9]+(?:\.[0-9]+)?)\s*(?:px)?\s*["']"#).expect("SVG 高度正则必须可编译")
});
static SVG_VIEWBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\sviewBox\s*=\s*["']\s*[-0-9.]+[\s,]+[-0-9.]+[\s,]+([0-9.]+)[\s,]+([0-9.]+)\s*["']"#)
        .expect("SVG viewBox 正则必须可编译")
});

/// 在阻塞线程中读取图片宽高，超时或失败都返回错误。
pub async fn probe_dimensions(bytes: &[u8], timeout: Duration) -> Result<(u32, u32), MediaError> {
    let owned = bytes.to_vec();
    let task = tokio::task::spawn_blocking(move || read_dimensions(&owned));

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(|e| MediaError::Decode(format!("尺寸探测线程异常：{}", e)))?,
        Err(_) => Err(MediaError::Timeout(format!("尺寸探测超时（{}ms）", timeout.as_millis()))),
    }
}

/// 同步读取宽高（位图读头部，SVG 读属性）。
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    if looks_like_svg(bytes) {
        return svg_dimensions(bytes);
    }

    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| MediaError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))?;

    if width == 0 || height == 0 {
        return Err(MediaError::InvalidFormat("图片尺寸为 0".to_string()));
    }
    Ok((width, height))
}

fn svg_dimensions(bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    let text = String::from_utf8_lossy(bytes);
    let root = SVG_ROOT_RE
        .find(&text)
        .ok_or_else(|| MediaError::InvalidFormat("SVG 缺少根元素".to_string()))?
        .as_str();

    let parse = |re: &Regex, group: usize| -> Option<u32> {
        let value: f64 = re.captures(root)?.get(group)?.as_str().parse().ok()?;
        let rounded = value.round();
        (rounded >= 1.0 && rounded <= u32::MAX as f64).then_some(rounded as u32)
    };

    if let (Some(w), Some(h)) = (parse(&SVG_WIDTH_RE, 1), parse(&SVG_HEIGHT_RE, 1)) {
        return Ok((w, h));
    }
    if let (Some(w), Some(h)) = (parse(&SVG_VIEWBOX_RE, 1), parse(&SVG_VIEWBOX_RE, 2)) {
        return Ok((w, h));
    }

    Err(MediaError::InvalidFormat("SVG 未声明尺寸".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10_u8, 20, 30, 255]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[tokio::test]
    async fn probes_png_header() {
        let dims = probe_dimensions(&png_bytes(37, 12), Duration::from_secs(2))
            .await
            .expect("probe png");
        assert_eq!(dims, (37, 12));
    }

    #[tokio::test]
    async fn garbage_is_an_explicit_error() {
        let result = probe_dimensions(b"definitely not an image", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(MediaError::InvalidFormat(_))));
    }

    #[test]
    fn svg_uses_width_and_height_attributes() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="120px" height="40" viewBox="0 0 10 10"></svg>"#;
        assert_eq!(read_dimensions(svg).expect("svg dims"), (120, 40));
    }

    #[test]
    fn svg_falls_back_to_viewbox() {
        let svg = br#"<?xml version="1.0"?><svg viewBox="0 0 300.4 150" xmlns="http://www.w3.org/2000/svg"></svg>"#;
        assert_eq!(read_dimensions(svg).expect("svg dims"), (300, 150));
    }

    #[test]
    fn svg_with_percentage_size_is_rejected() {
        let svg = br#"<svg width="100%" height="100%"></svg>"#;
        assert!(read_dimensions(svg).is_err());
    }
}
