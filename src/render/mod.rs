//! # 渲染宿主模块（render）
//!
//! ## 设计思路
//!
//! 所见即所得预览、打印分页、缩略图截取共用同一个隔离绘制面。
//! 调用方在每次内容变化时调用 `RenderHost::refresh`，宿主负责展开、丢弃过期结果、构建完整文档并绘制。
//!
//! - `paper`：纸张、方向、页面盒子与渲染模式
//! - `document`：完整文档构建（邮件 / 打印分页 / 不打印的网格层）
//! - `host`：刷新代号、绘制面抽象
//! - `capture`：截图前的远程图片落定（每张图片有等待上限）

mod capture;
mod document;
mod host;
mod paper;

pub use capture::{CaptureConfig, SettleReport, settle_remote_images};
pub use document::{EMAIL_BODY_WIDTH_PX, PAGE_BREAK_MARKER, build_document, split_pages};
pub use host::{CaptureDocument, FileSurface, MemorySurface, RefreshOutcome, RenderHost, RenderSurface};
pub use paper::{CSS_PX_PER_INCH, Orientation, PageBox, PaperSize, RenderMode, RenderOptions, page_box};
