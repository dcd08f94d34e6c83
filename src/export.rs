//! # 文件导出
//!
//! 导出与预览、复制走同一条展开路径：先展开占位符，再按渲染模式构建完整文档，最后落盘。
//! 写入先落到同目录临时文件再改名，导出目标不会出现写了一半的文件。

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;
use crate::expander::{ExpansionOutcome, ReferenceExpander};
use crate::render::{RenderOptions, build_document};

/// 导出结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: usize,
    pub expansion: ExpansionOutcome,
}

/// 展开正文、构建文档并写入 `path`。
pub async fn export_document(
    expander: &ReferenceExpander,
    body: &str,
    options: &RenderOptions,
    path: &Path,
) -> Result<ExportReport, AppError> {
    let expansion = expander.expand_with_report(body).await;
    if expansion.is_aborted() {
        log::warn!("⚠️ 展开中止，导出内容保留原始占位符");
    }

    let document = build_document(&expansion.html, options);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("创建导出目录失败: {}", e)))?;
        }
    }

    let tmp = path.with_extension("export.tmp");
    fs::write(&tmp, &document).map_err(|e| AppError::Storage(format!("写入导出文件失败: {}", e)))?;
    fs::rename(&tmp, path).map_err(|e| AppError::Storage(format!("移动导出文件失败: {}", e)))?;

    log::info!("📁 已导出 - {} ({}KB)", path.display(), document.len() / 1024);

    Ok(ExportReport {
        path: path.to_path_buf(),
        bytes: document.len(),
        expansion: expansion.outcome,
    })
}
