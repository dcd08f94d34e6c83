//! # 渲染宿主
//!
//! ## 设计思路
//!
//! 渲染宿主是与编辑面隔离的绘制面，只接收**已展开**的完整文档，从不接收原始占位符。
//!
//! - 每次 `refresh` 先分配一个单调递增的代号，再等待展开完成；
//!   等待期间若有更新的 `refresh` 开始，本次结果直接丢弃（`Stale`），
//!   快速连续编辑时旧结果不会覆盖新结果。
//! - 展开中途的系统性失败由展开器降级为原文，宿主照常绘制，预览从不变成空白。
//! - 绘制面抽象为 `RenderSurface`：`FileSurface` 写到磁盘供外部窗口加载，
//!   `MemorySurface` 记录每次绘制。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use super::capture::{CaptureConfig, SettleReport, settle_remote_images};
use super::document::build_document;
use super::paper::RenderOptions;
use crate::error::AppError;
use crate::expander::{ExpansionOutcome, ReferenceExpander};
use crate::media::MediaLoader;

/// 绘制面。
pub trait RenderSurface: Send + Sync {
    /// 用完整文档替换当前内容。
    fn paint(&self, document: &str) -> Result<(), AppError>;
}

/// 把文档写到固定文件，外部浏览器窗口或截图工具加载该文件。
#[derive(Debug, Clone)]
pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RenderSurface for FileSurface {
    fn paint(&self, document: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // 先写临时文件再改名，加载方不会读到写了一半的文档
        let tmp = self.path.with_extension("html.tmp");
        std::fs::write(&tmp, document)?;
        std::fs::rename(&tmp, &self.path)?;

        log::debug!("🖼️ 已绘制到文件 - {} ({}KB)", self.path.display(), document.len() / 1024);
        Ok(())
    }
}

/// 记录所有绘制内容的内存绘制面。
#[derive(Debug, Default)]
pub struct MemorySurface {
    paints: Mutex<Vec<String>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paints(&self) -> Vec<String> {
        self.paints.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.paints.lock().ok().and_then(|p| p.last().cloned())
    }
}

impl RenderSurface for MemorySurface {
    fn paint(&self, document: &str) -> Result<(), AppError> {
        self.paints
            .lock()
            .map_err(|_| AppError::Render("绘制记录锁已中毒".to_string()))?
            .push(document.to_string());
        Ok(())
    }
}

/// `refresh` 的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// 已绘制。
    Painted {
        generation: u64,
        expansion: ExpansionOutcome,
    },
    /// 等待展开期间有更新的刷新开始，本次结果已丢弃。
    Stale { generation: u64, latest: u64 },
}

/// 截图准备结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDocument {
    pub html: String,
    pub expansion: ExpansionOutcome,
    pub images: SettleReport,
}

/// 渲染宿主。
pub struct RenderHost {
    expander: ReferenceExpander,
    surface: Arc<dyn RenderSurface>,
    loader: MediaLoader,
    capture: CaptureConfig,
    options: RwLock<RenderOptions>,
    generation: AtomicU64,
    paint_lock: Mutex<()>,
}

impl RenderHost {
    pub fn new(expander: ReferenceExpander, surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            expander,
            surface,
            loader: MediaLoader::default(),
            capture: CaptureConfig::default(),
            options: RwLock::new(RenderOptions::default()),
            generation: AtomicU64::new(0),
            paint_lock: Mutex::new(()),
        }
    }

    pub fn with_capture(mut self, loader: MediaLoader, capture: CaptureConfig) -> Self {
        self.loader = loader;
        self.capture = capture;
        self
    }

    pub fn with_options(self, options: RenderOptions) -> Self {
        if let Ok(mut current) = self.options.write() {
            *current = options;
        }
        self
    }

    /// 当前渲染选项快照。
    pub fn options(&self) -> RenderOptions {
        self.options.read().map(|o| *o).unwrap_or_default()
    }

    /// 切换渲染选项（模式、纸张、网格），下一次 `refresh` 生效。
    pub fn set_options(&self, options: RenderOptions) -> Result<(), AppError> {
        let mut current = self
            .options
            .write()
            .map_err(|_| AppError::Render("渲染选项锁已中毒".to_string()))?;
        *current = options;
        Ok(())
    }

    /// 最近一次发出的刷新代号。
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 展开正文并绘制。过期结果被丢弃，不会覆盖更新的内容。
    pub async fn refresh(&self, body: &str) -> Result<RefreshOutcome, AppError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let expansion = self.expander.expand_with_report(body).await;

        // 代号检查与绘制在同一把锁内完成，检查通过后不会被更新的刷新抢先绘制再被覆盖
        let _guard = self
            .paint_lock
            .lock()
            .map_err(|_| AppError::Render("绘制锁已中毒".to_string()))?;

        let latest = self.latest_generation();
        if latest != generation {
            log::debug!("🗑️ 丢弃过期的渲染结果 - generation={} latest={}", generation, latest);
            return Ok(RefreshOutcome::Stale { generation, latest });
        }

        let document = build_document(&expansion.html, &self.options());
        self.surface.paint(&document)?;

        log::info!("✅ 渲染完成 - generation={} 文档: {}KB", generation, document.len() / 1024);
        Ok(RefreshOutcome::Painted {
            generation,
            expansion: expansion.outcome,
        })
    }

    /// 准备截图用文档：展开、落定远程图片（每张有等待上限）、构建完整文档。
    ///
    /// 不经过绘制面，也不影响刷新代号。
    pub async fn prepare_capture(&self, body: &str) -> CaptureDocument {
        let expansion = self.expander.expand_with_report(body).await;
        let (settled, images) = settle_remote_images(&expansion.html, &self.loader, &self.capture).await;

        CaptureDocument {
            html: build_document(&settled, &self.options()),
            expansion: expansion.outcome,
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryResourceStore;

    fn host() -> (RenderHost, Arc<MemorySurface>) {
        let surface = Arc::new(MemorySurface::new());
        let expander = ReferenceExpander::new(Arc::new(MemoryResourceStore::new()));
        (RenderHost::new(expander, surface.clone()), surface)
    }

    #[tokio::test]
    async fn refresh_paints_full_document() {
        let (host, surface) = host();

        let outcome = host.refresh("<p>hello</p>").await.expect("refresh");

        assert_eq!(
            outcome,
            RefreshOutcome::Painted {
                generation: 1,
                expansion: ExpansionOutcome::Unchanged
            }
        );
        let painted = surface.last().expect("painted");
        assert!(painted.starts_with("<!DOCTYPE html>"));
        assert!(painted.contains("<p>hello</p>"));
    }

    #[tokio::test]
    async fn file_surface_writes_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("preview").join("index.html");
        let surface = FileSurface::new(&path);

        surface.paint("<html></html>").expect("paint");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "<html></html>");
        assert!(!path.with_extension("html.tmp").exists());
    }

    #[tokio::test]
    async fn options_change_applies_to_next_refresh() {
        let (host, surface) = host();
        host.set_options(RenderOptions::print(
            crate::render::PaperSize::Letter,
            crate::render::Orientation::Portrait,
        ))
        .expect("set options");

        host.refresh("a<!-- pagebreak -->b").await.expect("refresh");

        let painted = surface.last().expect("painted");
        assert_eq!(painted.matches("<section class=\"page\">").count(), 2);
    }
}
