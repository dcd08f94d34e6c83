//! # 图片占位符展开模块（expander）
//!
//! ## 设计思路
//!
//! 编辑中的文档只保存紧凑的占位符 `{{IMAGE:<id>}}`，大体积的图片载荷存放在资源库中。
//! 预览、复制、导出之前把占位符展开为内联、自包含、适合 Gmail 的 `<img>` 标签。
//!
//! - `codec`：占位符生成与扫描（纯文本）
//! - `tag`：由资源记录合成 `<img>` 标签（从不失败）
//! - `remap`：目标宿主颜色重映射（字面量白名单）
//! - `handler`：展开编排（扇出查询、容错、单趟替换）
//! - `config`：超时等可调参数
//!
//! ```text
//! 文档 HTML
//!    ↓
//! codec::find_references
//!    ↓
//! ResourceStore::fetch_by_id × N（并发）
//!    ↓
//! tag::synthesize_tag → 单趟替换 → remap::remap_colors
//!    ↓
//! 展开后的 HTML（渲染宿主 / 剪贴板 / 导出）
//! ```

mod codec;
mod config;
mod handler;
mod remap;
mod tag;

pub use codec::{ImageReference, REFERENCE_PREFIX, contains_reference_prefix, find_references, make_reference};
pub use config::ExpanderConfig;
pub use handler::{Expansion, ExpansionOutcome, ReferenceExpander};
pub use remap::remap_colors;
pub use tag::{BROKEN_IMAGE_DATA_URI, broken_image_tag, synthesize_tag};
