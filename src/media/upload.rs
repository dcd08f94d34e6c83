//! # 上传预处理
//!
//! 把任意来源的图片整理成可入库的 `NewImageResource`：
//! 加载校验 → 尺寸探测（有超时）→ 按需降采样 → 编码为 Data URI。
//! 尺寸探测失败不阻止上传，只是不写宽高。

use std::time::Instant;

use super::pipeline::maybe_downscale;
use super::probe::probe_dimensions;
use super::{ImageSource, MediaError, MediaLoader};
use crate::library::{ImageCategory, NewImageResource};

/// 上传时由用户提供的元数据。
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub name: String,
    pub description: Option<String>,
    pub category: ImageCategory,
}

/// 加载并整理一张待上传的图片。
pub async fn prepare_upload(
    loader: &MediaLoader,
    source: &ImageSource,
    meta: UploadMeta,
) -> Result<NewImageResource, MediaError> {
    let total_start = Instant::now();
    let config = loader.config().clone();

    let load_start = Instant::now();
    let loaded = loader.load(source).await?;
    let load_elapsed = load_start.elapsed();

    let probe_start = Instant::now();
    let dimensions = match probe_dimensions(&loaded.bytes, config.probe_timeout).await {
        Ok(dims) => Some(dims),
        Err(err) => {
            log::warn!("⚠️ 无法读取图片尺寸，按未知尺寸保存：{}", err);
            None
        }
    };
    let probe_elapsed = probe_start.elapsed();

    let (image, width, height) = match dimensions {
        Some(dims) => {
            let prepared = tokio::task::spawn_blocking(move || maybe_downscale(loaded, dims, &config))
                .await
                .map_err(|e| MediaError::Decode(format!("降采样线程异常：{}", e)))??;
            (prepared.image, Some(prepared.width), Some(prepared.height))
        }
        None => (loaded, None, None),
    };

    let payload = image.to_data_uri();

    log::info!(
        "✅ 上传预处理完成 - 来源: {} mime: {} 载荷: {}KB load={}ms probe={}ms total={}ms",
        image.source_hint,
        image.mime_type,
        payload.len() / 1024,
        load_elapsed.as_millis(),
        probe_elapsed.as_millis(),
        total_start.elapsed().as_millis()
    );

    Ok(NewImageResource {
        name: meta.name,
        description: meta.description,
        payload,
        mime_type: Some(image.mime_type),
        category: meta.category,
        width,
        height,
    })
}
