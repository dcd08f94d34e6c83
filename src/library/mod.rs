//! # 图片资源库模块（library）
//!
//! ## 设计思路
//!
//! 大体积图片只存一份（服务端），文档里用紧凑的占位符引用它。
//! 本模块定义资源数据模型与“资源库”抽象，展开器只依赖抽象：
//!
//! - `store`：`ResourceStore` 异步 trait 与 `StoreError`（区分“单条失败”与“系统性失败”）
//! - `sqlite`：基于 `db` 模块的 SQLite 实现（阻塞操作放到 `spawn_blocking`）
//! - `memory`：进程内实现，便于嵌入与测试
//! - `cache`：LRU 读穿缓存包装器（资源创建后不可变，只需在删除时失效）
//!
//! ## 数据不变量
//!
//! - `id` 由资源库在创建时分配，形如 UUID（仅字母、数字、连字符）。
//! - `payload` 非空，规范化后总带 `data:` 前缀；写入时统一规范化。
//! - 写入时 Data URI 自带的媒体类型与 `mime_type` 必须一致；未声明 `mime_type` 时取 Data URI 的类型。
//! - 资源不支持原地更新：删除后重建。

mod cache;
mod memory;
mod sqlite;
mod store;

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use cache::CachedResourceStore;
pub use memory::MemoryResourceStore;
pub use sqlite::SqliteResourceStore;
pub use store::{ResourceStore, StoreError};

/// 未声明或声明不合法时使用的默认 MIME。
pub const DEFAULT_MIME_TYPE: &str = "image/png";

static MIME_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[a-z0-9][a-z0-9.+-]*/[a-z0-9][a-z0-9.+-]*$").expect("MIME 正则必须可编译")
});

/// 图片分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCategory {
    Logo,
    Banner,
}

impl ImageCategory {
    /// 输出稳定字符串，用于持久化与 CLI 展示。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Banner => "banner",
        }
    }
}

impl FromStr for ImageCategory {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "logo" => Ok(Self::Logo),
            "banner" => Ok(Self::Banner),
            other => Err(StoreError::Invalid(format!(
                "未知图片分类：{}（可选：logo / banner）",
                other
            ))),
        }
    }
}

/// 已持久化的图片资源。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Data URI 形式的图片内容（历史数据可能缺少 `data:` 前缀）。
    pub payload: String,
    pub mime_type: Option<String>,
    pub category: ImageCategory,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Unix 毫秒时间戳。
    pub created_at: i64,
    pub updated_at: i64,
}

impl ImageResource {
    /// 生效的 MIME：缺失或格式不合法时回退为 `image/png`。
    pub fn effective_mime(&self) -> &str {
        effective_mime(self.mime_type.as_deref())
    }

    /// 规范化后的 `src` 值；载荷为空或损坏时返回 `None`。
    pub fn normalized_payload(&self) -> Option<String> {
        normalize_payload(&self.payload, self.mime_type.as_deref())
    }
}

/// 待写入的新资源（不含 id 与时间戳，由资源库分配）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImageResource {
    pub name: String,
    pub description: Option<String>,
    pub payload: String,
    pub mime_type: Option<String>,
    pub category: ImageCategory,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NewImageResource {
    /// 校验并规范化，生成带 id 与时间戳的完整记录。
    pub(crate) fn into_resource(self, id: String, now_ms: i64) -> Result<ImageResource, StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid("图片名称不能为空".to_string()));
        }

        let payload = normalize_payload(&self.payload, self.mime_type.as_deref())
            .ok_or_else(|| StoreError::Invalid("图片内容为空或不是合法的 Base64 / Data URI".to_string()))?;
        let mime_type = reconcile_mime(&payload, self.mime_type.as_deref())?;

        Ok(ImageResource {
            id,
            name: self.name.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            payload,
            mime_type: Some(mime_type),
            category: self.category,
            width: self.width.filter(|w| *w > 0),
            height: self.height.filter(|h| *h > 0),
            created_at: now_ms,
            updated_at: now_ms,
        })
    }
}

/// 生成新的资源 id（UUID v4，满足 `[A-Za-z0-9-]+`）。
pub(crate) fn generate_resource_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 解析生效 MIME。
pub fn effective_mime(mime_type: Option<&str>) -> &str {
    match mime_type.map(str::trim) {
        Some(mime) if MIME_TYPE_RE.is_match(mime) => mime,
        _ => DEFAULT_MIME_TYPE,
    }
}

/// 读取 Data URI 声明的媒体类型（`data:` 与第一个 `;` / `,` 之间）。
fn data_uri_mime(payload: &str) -> Option<&str> {
    let rest = payload.get(5..)?;
    let end = rest.find([';', ','])?;
    Some(rest[..end].trim()).filter(|mime| !mime.is_empty())
}

/// 确定写入记录的 MIME，保证与规范化载荷的前缀一致。
fn reconcile_mime(payload: &str, declared: Option<&str>) -> Result<String, StoreError> {
    let declared = declared.map(str::trim).filter(|mime| MIME_TYPE_RE.is_match(mime));
    let Some(embedded) = data_uri_mime(payload) else {
        return Ok(effective_mime(declared).to_string());
    };
    if !MIME_TYPE_RE.is_match(embedded) {
        return Err(StoreError::Invalid(format!("Data URI 媒体类型不合法：{}", embedded)));
    }
    match declared {
        Some(mime) if !mime.eq_ignore_ascii_case(embedded) => Err(StoreError::Invalid(format!(
            "声明的 MIME（{}）与 Data URI 媒体类型（{}）不一致",
            mime, embedded
        ))),
        _ => Ok(embedded.to_ascii_lowercase()),
    }
}

/// 将载荷规范化为完整 Data URI。
///
/// - 已带 `data:` 前缀：要求包含 `,` 且逗号后非空，原样返回（去首尾空白）。
/// - 纯 Base64：校验字符集后补上 `data:<mime>;base64,` 前缀，内容字节保持不变。
/// - 空载荷或非法字符：返回 `None`，调用方负责降级。
pub fn normalize_payload(payload: &str, mime_type: Option<&str>) -> Option<String> {
    let trimmed = payload.trim();
    if trimmed.is_empty() || trimmed.contains('"') {
        return None;
    }

    if trimmed.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:")) {
        let comma = trimmed.find(',')?;
        if trimmed[comma + 1..].trim().is_empty() {
            return None;
        }
        return Some(trimmed.to_string());
    }

    let is_base64 = trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'-' | b'_') || b.is_ascii_whitespace());
    if !is_base64 {
        return None;
    }

    Some(format!("data:{};base64,{}", effective_mime(mime_type), trimmed))
}
