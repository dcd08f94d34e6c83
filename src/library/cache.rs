//! LRU 读穿缓存。
//!
//! 资源创建后不可变，所以命中缓存永远是正确的；只有删除需要失效。
//! “未找到”不缓存，新上传的资源可以立即被引用。
//!
//! 删除会递增删除纪元。读取在回源前记下纪元，回源结束后纪元已变化就不写入缓存，
//! 与删除并发的读取不会把刚删掉的资源重新放回缓存。

use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;

use super::{ImageCategory, ImageResource, NewImageResource, ResourceStore, StoreError};

const DEFAULT_CACHE_ENTRIES: usize = 64;

struct CacheState {
    entries: LruCache<String, ImageResource>,
    deletions: u64,
}

pub struct CachedResourceStore<S> {
    inner: S,
    cache: Mutex<CacheState>,
}

impl<S: ResourceStore> CachedResourceStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_ENTRIES)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                deletions: 0,
            }),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// 查缓存；未命中时同时返回当前删除纪元。
    fn cached(&self, id: &str) -> Result<ImageResource, Option<u64>> {
        let Ok(mut cache) = self.cache.lock() else {
            return Err(None);
        };
        match cache.entries.get(id) {
            Some(hit) => Ok(hit.clone()),
            None => Err(Some(cache.deletions)),
        }
    }

    fn remember(&self, resource: &ImageResource) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.entries.put(resource.id.clone(), resource.clone());
        }
    }

    /// 仅当读取期间没有发生删除时写入缓存。
    fn remember_since(&self, resource: &ImageResource, epoch: u64) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.deletions == epoch {
                cache.entries.put(resource.id.clone(), resource.clone());
            } else {
                log::debug!("🧹 读取期间发生删除，跳过缓存 - id: {}", resource.id);
            }
        }
    }

    fn forget(&self, id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.deletions = cache.deletions.wrapping_add(1);
            cache.entries.pop(id);
        }
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for CachedResourceStore<S> {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ImageResource>, StoreError> {
        let epoch = match self.cached(id) {
            Ok(hit) => {
                log::debug!("♻️ 命中资源缓存 - id: {}", id);
                return Ok(Some(hit));
            }
            Err(epoch) => epoch,
        };

        let fetched = self.inner.fetch_by_id(id).await?;
        if let (Some(resource), Some(epoch)) = (&fetched, epoch) {
            self.remember_since(resource, epoch);
        }
        Ok(fetched)
    }

    async fn insert(&self, resource: NewImageResource) -> Result<ImageResource, StoreError> {
        let created = self.inner.insert(resource).await?;
        self.remember(&created);
        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete(id).await;
        self.forget(id);
        result
    }

    async fn list_by_category(&self, category: ImageCategory) -> Result<Vec<ImageResource>, StoreError> {
        self.inner.list_by_category(category).await
    }
}
