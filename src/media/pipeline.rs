//! # 解码与降采样流水线模块
//!
//! ## 设计思路
//!
//! 上传的图片会以 Data URI 形式内联进每一封邮件，体积直接影响展开与粘贴速度。
//! 超过 `max_upload_dimension` 的位图在入库前降采样并重新编码。
//!
//! ## 实现思路
//!
//! 1. SVG、GIF（可能是动图）与尺寸达标的图片原样返回
//! 2. 按像素上限快速拒绝
//! 3. 完整解码
//! 4. `fast_image_resize` 降采样，失败回退 `image::resize_exact`
//! 5. JPEG 输入仍编码为 JPEG，其余编码为 PNG

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba};

use super::{LoadedImage, MediaConfig, MediaError};

const JPEG_QUALITY: u8 = 85;

/// 降采样后的图片与最终尺寸。
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: LoadedImage,
    pub width: u32,
    pub height: u32,
    pub resized: bool,
}

/// 按配置执行降采样（同步，调用方负责放到阻塞线程）。
pub fn maybe_downscale(
    image: LoadedImage,
    (width, height): (u32, u32),
    config: &MediaConfig,
) -> Result<PreparedImage, MediaError> {
    let max_dim = config.max_upload_dimension.max(1);
    let passthrough = image.mime_type == "image/svg+xml"
        || image.mime_type == "image/gif"
        || (width <= max_dim && height <= max_dim);

    if passthrough {
        return Ok(PreparedImage {
            image,
            width,
            height,
            resized: false,
        });
    }

    validate_pixel_limits(config, width, height)?;

    let decoded = image::load_from_memory(&image.bytes)
        .map_err(|e| MediaError::Decode(format!("图片解码失败：{}", e)))?;
    let (raw_width, raw_height) = decoded.dimensions();

    let scale = (max_dim as f64 / raw_width as f64).min(max_dim as f64 / raw_height as f64).min(1.0);
    let target_width = ((raw_width as f64 * scale).floor() as u32).max(1);
    let target_height = ((raw_height as f64 * scale).floor() as u32).max(1);

    log::info!(
        "🧩 上传降采样：{}x{} -> {}x{}（filter={:?}）",
        raw_width,
        raw_height,
        target_width,
        target_height,
        config.resize_filter
    );

    let resized = match resize_with_fast_image_resize(&decoded, target_width, target_height, config.resize_filter) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
            decoded.resize_exact(target_width, target_height, config.resize_filter)
        }
    };

    let (bytes, mime_type) = encode(&resized, image.mime_type == "image/jpeg")?;

    Ok(PreparedImage {
        image: LoadedImage {
            bytes,
            mime_type,
            source_hint: image.source_hint,
        },
        width: target_width,
        height: target_height,
        resized: true,
    })
}

fn validate_pixel_limits(config: &MediaConfig, width: u32, height: u32) -> Result<(), MediaError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| MediaError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(MediaError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn encode(image: &DynamicImage, as_jpeg: bool) -> Result<(Vec<u8>, String), MediaError> {
    let mut cursor = Cursor::new(Vec::new());

    if as_jpeg {
        let rgb = image.to_rgb8();
        JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| MediaError::Decode(format!("JPEG 编码失败：{}", e)))?;
        return Ok((cursor.into_inner(), "image/jpeg".to_string()));
    }

    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| MediaError::Decode(format!("PNG 编码失败：{}", e)))?;
    Ok((cursor.into_inner(), "image/png".to_string()))
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: image::imageops::FilterType,
) -> Result<DynamicImage, MediaError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
        .map_err(|e| MediaError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| MediaError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| MediaError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
    match filter {
        image::imageops::FilterType::Nearest => fr::FilterType::Box,
        image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
        image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
        image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
        image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
