//! # 资源库抽象
//!
//! 展开器只通过 `ResourceStore` 读取资源；错误分为两类：
//! - **单条失败**（`Corrupt` / `Invalid`）：只影响对应占位符，展开继续
//! - **系统性失败**（`Unavailable` / `Database`）：整次展开放弃，原样返回输入

use async_trait::async_trait;

use super::{ImageCategory, ImageResource, NewImageResource};

/// 资源库错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// 资源库整体不可用（连接失败、锁中毒、工作线程异常）。
    #[error("资源库不可用：{0}")]
    Unavailable(String),

    /// SQL 执行失败。
    #[error("资源库查询失败：{0}")]
    Database(String),

    /// 单条记录损坏（例如分类字段无法识别）。
    #[error("资源记录损坏：{0}")]
    Corrupt(String),

    /// 写入参数不合法。
    #[error("资源参数无效：{0}")]
    Invalid(String),
}

impl StoreError {
    /// 是否属于“系统性失败”，需要放弃整次展开。
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}

/// 图片资源库。
///
/// `fetch_by_id` 返回 `Ok(None)` 表示“未找到”，这是正常的单条结果，不是错误。
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ImageResource>, StoreError>;

    async fn insert(&self, resource: NewImageResource) -> Result<ImageResource, StoreError>;

    /// 删除资源，返回是否确实删除了记录。
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_by_category(&self, category: ImageCategory) -> Result<Vec<ImageResource>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systemic_classification() {
        assert!(StoreError::Unavailable("x".into()).is_systemic());
        assert!(StoreError::Database("x".into()).is_systemic());
        assert!(!StoreError::Corrupt("x".into()).is_systemic());
        assert!(!StoreError::Invalid("x".into()).is_systemic());
    }
}
