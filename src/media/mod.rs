//! # 图片媒体模块（media）
//!
//! ## 设计思路
//!
//! 图片进入资源库之前的全部处理：来源识别 → 加载校验 → 尺寸探测 → 降采样 → Data URI。
//! 截图准备阶段内联远程图片时也复用这里的加载器与 URL 安全策略。
//!
//! - `loader`：URL/Base64/文件加载、URL 安全校验、签名识别
//! - `probe`：有超时的尺寸探测
//! - `pipeline`：解码、像素限制、降采样与重新编码
//! - `upload`：编排上传预处理，产出 `NewImageResource`
//! - `config/error`：配置与错误
//!
//! ```text
//! ImageSource
//!    ↓
//! loader.rs（加载 + 安全/体积/签名校验）
//!    ↓
//! probe.rs（读头部尺寸，阻塞线程 + 超时）
//!    ↓
//! pipeline.rs（超尺寸时降采样）
//!    ↓
//! NewImageResource（data:<mime>;base64,...）
//! ```

use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose};

mod config;
mod error;
mod loader;
mod pipeline;
mod probe;
mod upload;

pub use config::MediaConfig;
pub use error::MediaError;
pub use loader::MediaLoader;
pub use pipeline::{PreparedImage, maybe_downscale};
pub use probe::{probe_dimensions, read_dimensions};
pub use upload::{UploadMeta, prepare_upload};

/// 图片输入来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 网络地址来源。
    Url(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(PathBuf),
}

impl ImageSource {
    /// 按输入文本猜测来源：`http(s)://` 为 URL，`data:` 为 Base64，其余视为文件路径。
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if lower.starts_with("data:") {
            Self::Base64(trimmed.to_string())
        } else {
            Self::FilePath(PathBuf::from(trimmed))
        }
    }
}

/// 加载阶段输出：原始字节、识别出的 MIME 与来源标识。
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

impl LoadedImage {
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
