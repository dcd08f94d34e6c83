//! 进程内资源库，行为与 SQLite 实现保持一致（列表按创建时间倒序）。

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    ImageCategory, ImageResource, NewImageResource, ResourceStore, StoreError, generate_resource_id,
    now_millis,
};

#[derive(Default)]
pub struct MemoryResourceStore {
    resources: RwLock<HashMap<String, ImageResource>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接放入一条完整记录（保留原 id 与载荷，不做规范化）。
    ///
    /// 用于导入历史数据，也便于构造“缺少前缀”的旧记录。
    pub fn put(&self, resource: ImageResource) -> Result<(), StoreError> {
        let mut resources = self
            .resources
            .write()
            .map_err(|_| StoreError::Unavailable("资源写入锁已中毒".to_string()))?;
        resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ImageResource>, StoreError> {
        let resources = self
            .resources
            .read()
            .map_err(|_| StoreError::Unavailable("资源读取锁已中毒".to_string()))?;
        Ok(resources.get(id).cloned())
    }

    async fn insert(&self, resource: NewImageResource) -> Result<ImageResource, StoreError> {
        let created = resource.into_resource(generate_resource_id(), now_millis())?;
        self.put(created.clone())?;
        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut resources = self
            .resources
            .write()
            .map_err(|_| StoreError::Unavailable("资源写入锁已中毒".to_string()))?;
        Ok(resources.remove(id).is_some())
    }

    async fn list_by_category(&self, category: ImageCategory) -> Result<Vec<ImageResource>, StoreError> {
        let resources = self
            .resources
            .read()
            .map_err(|_| StoreError::Unavailable("资源读取锁已中毒".to_string()))?;

        let mut listed: Vec<ImageResource> = resources
            .values()
            .filter(|r| r.category == category)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(listed)
    }
}
