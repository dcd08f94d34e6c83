//! # 截图前的远程图片落定
//!
//! 缩略图截取前，文档里的远程图片（`<img src="http...">`）需要先加载完成，
//! 否则截到的是空白。每张图片的等待都有上限：超时或失败的图片保持原样，
//! 流程继续，绝不因为某一张不可达的图片卡住整个预览/导出链路。
//!
//! 加载成功的图片内联为 Data URI，截图结果不再依赖网络。

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::media::MediaLoader;

static REMOTE_IMG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*)(?:"(https?://[^"]+)"|'(https?://[^']+)')"#)
        .expect("远程图片正则必须可编译")
});

/// 截图准备配置。
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// 单张图片的最长等待时间。
    pub image_wait: Duration,
    /// 单个文档最多处理的远程图片数量，超出部分保持原样。
    pub max_images: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            image_wait: Duration::from_secs(2),
            max_images: 32,
        }
    }
}

/// 落定结果统计。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettleReport {
    /// 已内联的图片地址。
    pub inlined: Vec<String>,
    /// 超时、失败或超出数量上限而保持原样的图片地址。
    pub skipped: Vec<String>,
}

fn attribute_url(caps: &Captures<'_>) -> Option<String> {
    caps.get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

/// 并发加载文档中的远程图片，每张受 `image_wait` 约束，成功的内联为 Data URI。
pub async fn settle_remote_images(
    html: &str,
    loader: &MediaLoader,
    config: &CaptureConfig,
) -> (String, SettleReport) {
    let mut seen = HashSet::new();
    let urls: Vec<String> = REMOTE_IMG_RE
        .captures_iter(html)
        .filter_map(|caps| attribute_url(&caps))
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if urls.is_empty() {
        return (html.to_string(), SettleReport::default());
    }

    let started = Instant::now();
    let (attempted, overflow) = urls.split_at(urls.len().min(config.max_images));

    let loads = attempted.iter().map(|url| async move {
        let result = tokio::time::timeout(config.image_wait, loader.load_from_url(url)).await;
        (url, result)
    });

    let mut inlined: HashMap<String, String> = HashMap::new();
    let mut report = SettleReport::default();
    for (url, result) in join_all(loads).await {
        match result {
            Ok(Ok(image)) => {
                inlined.insert(url.clone(), image.to_data_uri());
                report.inlined.push(url.clone());
            }
            Ok(Err(err)) => {
                log::warn!("⚠️ 远程图片加载失败，保持原样：{}", err);
                report.skipped.push(url.clone());
            }
            Err(_) => {
                log::warn!(
                    "⏱️ 远程图片等待超过 {}ms，保持原样",
                    config.image_wait.as_millis()
                );
                report.skipped.push(url.clone());
            }
        }
    }
    report.skipped.extend(overflow.iter().cloned());

    let settled = REMOTE_IMG_RE
        .replace_all(html, |caps: &Captures<'_>| {
            match attribute_url(caps).and_then(|url| inlined.get(&url)) {
                Some(data_uri) => format!("{}\"{}\"", &caps[1], data_uri),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    log::info!(
        "✅ 远程图片落定完成 - inlined={} skipped={} elapsed={}ms",
        report.inlined.len(),
        report.skipped.len(),
        started.elapsed().as_millis()
    );

    (settled, report)
}
