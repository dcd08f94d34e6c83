//! # HTML 制品编辑器 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           编辑面（保存规范正文，含 {{IMAGE:<id>}}）        │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ 正文
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ expander ──── 占位符展开（并发查询 + 单趟替换 + 配色）│
//! │  │     ↑                                                 │
//! │  ├─ library ───── ResourceStore（SQLite / 内存 / LRU）    │
//! │  │     ↑                                                 │
//! │  ├─ media ─────── 上传预处理：加载·探测尺寸·降采样         │
//! │  │                                                       │
//! │  ├─ render ────── 渲染宿主（代号防过期·分页·网格·截图）   │
//! │  ├─ clipboard ─── 展开后写剪贴板（HTML + 纯文本）         │
//! │  ├─ export ────── 展开后落盘                             │
//! │  │                                                       │
//! │  ├─ template ──── 模板与变量插值                         │
//! │  ├─ assist ────── 补全接口（显式凭据）                   │
//! │  ├─ settings ──── settings.json + ApiCredentials         │
//! │  ├─ db ────────── SQLite Schema 与 CRUD                  │
//! │  └─ error ─────── AppError（统一错误类型）                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`db`] | SQLite 连接、Schema 版本迁移、图片资源表与模板 CRUD |
//! | [`library`] | 图片资源模型、`ResourceStore` 抽象及其实现 |
//! | [`expander`] | `{{IMAGE:<id>}}` 编解码、标签合成、并发展开、目标配色重映射 |
//! | [`media`] | 从 URL/Base64/文件加载图片、尺寸探测、上传前降采样 |
//! | [`render`] | 渲染宿主：完整文档构建、打印分页、过期结果丢弃、截图准备 |
//! | [`clipboard`] | 展开后写入系统剪贴板，附纯文本降级 |
//! | [`export`] | 展开后导出为 HTML 文件 |
//! | [`template`] | 模板分类与 `{{var}}` 变量插值 |
//! | [`settings`] | 应用设置文件与补全接口凭据 |
//! | [`assist`] | OpenAI 兼容补全接口客户端 |

pub mod error;
pub mod assist;
pub mod clipboard;
pub mod db;
pub mod expander;
pub mod export;
pub mod library;
pub mod media;
pub mod render;
pub mod settings;
pub mod template;
