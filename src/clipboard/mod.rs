//! 剪贴板导出模块
//!
//! # 设计思路
//!
//! 复制到剪贴板的内容必须是**已展开**的 HTML：粘贴到邮件客户端的一方
//! 无法解析 `{{IMAGE:<id>}}` 占位符，只认内联图片。
//!
//! - **展开**：复用 `ReferenceExpander`，与预览、导出走同一条路径
//! - **纯文本降级**：`plain_text` 子模块生成纯文本版本，两种格式一起写入
//! - **写入**：`ClipboardSink` 抽象系统剪贴板，`ArboardSink` 为真实实现（含重试），
//!   `MemoryClipboard` 记录写入内容
//!
//! # 实现思路
//!
//! ```text
//! 正文 ─► expand_with_report ─► html_to_plain_text ─► ClipboardSink::write
//! ```
//!
//! 展开中途的系统性失败会降级为原文；复制照常进行，由调用方根据
//! `CopyReport::expansion` 决定是否提示用户。

mod plain_text;
mod writer;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::expander::{ExpansionOutcome, ReferenceExpander};

pub use plain_text::html_to_plain_text;
pub use writer::{ArboardSink, ClipboardConfig};

/// 剪贴板错误。
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("剪贴板被占用：{0}")]
    Busy(String),

    #[error("剪贴板写入失败：{0}")]
    Write(String),

    #[error("剪贴板线程执行失败：{0}")]
    Thread(String),
}

/// 一次写入剪贴板的内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: String,
    pub plain_text: String,
}

impl ClipboardPayload {
    /// 由 HTML 生成负载，纯文本版本自动派生。
    pub fn from_html(html: String) -> Self {
        let plain_text = html_to_plain_text(&html);
        Self { html, plain_text }
    }
}

/// 剪贴板写入端。
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    async fn write(&self, payload: &ClipboardPayload) -> Result<(), ClipboardError>;
}

/// 只记录写入内容的剪贴板。
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<ClipboardPayload>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<ClipboardPayload> {
        self.writes.lock().ok().and_then(|w| w.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClipboardSink for MemoryClipboard {
    async fn write(&self, payload: &ClipboardPayload) -> Result<(), ClipboardError> {
        self.writes
            .lock()
            .map_err(|_| ClipboardError::Write("剪贴板记录锁已中毒".to_string()))?
            .push(payload.clone());
        Ok(())
    }
}

/// 复制结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub expansion: ExpansionOutcome,
    pub html_bytes: usize,
    pub plain_text_chars: usize,
}

/// 展开正文并写入剪贴板。
pub struct ClipboardExporter {
    expander: ReferenceExpander,
    sink: Arc<dyn ClipboardSink>,
}

impl ClipboardExporter {
    pub fn new(expander: ReferenceExpander, sink: Arc<dyn ClipboardSink>) -> Self {
        Self { expander, sink }
    }

    pub async fn copy(&self, body: &str) -> Result<CopyReport, AppError> {
        let expansion = self.expander.expand_with_report(body).await;
        if expansion.is_aborted() {
            log::warn!("⚠️ 展开中止，剪贴板写入原文");
        }

        let payload = ClipboardPayload::from_html(expansion.html);
        self.sink.write(&payload).await?;

        Ok(CopyReport {
            expansion: expansion.outcome,
            html_bytes: payload.html.len(),
            plain_text_chars: payload.plain_text.chars().count(),
        })
    }
}
