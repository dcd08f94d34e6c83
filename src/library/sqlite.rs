//! SQLite 资源库。
//!
//! `rusqlite` 是同步 API，所有操作放到 `spawn_blocking`，避免阻塞 async 运行时。
//! 工作线程异常与锁中毒都视为系统性失败。

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    ImageCategory, ImageResource, NewImageResource, ResourceStore, StoreError, generate_resource_id,
    now_millis,
};
use crate::db::{self, DbState, images};
use crate::error::AppError;

#[derive(Clone)]
pub struct SqliteResourceStore {
    state: Arc<DbState>,
}

impl SqliteResourceStore {
    pub fn new(state: Arc<DbState>) -> Self {
        Self { state }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, AppError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || db::with_conn(&state, op))
            .await
            .map_err(|e| StoreError::Unavailable(format!("资源库工作线程异常：{}", e)))?
            .map_err(into_store_error)
    }
}

fn into_store_error(err: AppError) -> StoreError {
    match err {
        AppError::Store(inner) => inner,
        AppError::InvalidInput(msg) => StoreError::Invalid(msg),
        other => StoreError::Database(other.to_string()),
    }
}

#[async_trait]
impl ResourceStore for SqliteResourceStore {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ImageResource>, StoreError> {
        let id = id.to_string();
        let record = self.run(move |conn| images::get_image(conn, &id)).await?;
        record.map(images::ImageRecord::into_resource).transpose()
    }

    async fn insert(&self, resource: NewImageResource) -> Result<ImageResource, StoreError> {
        let created = resource.into_resource(generate_resource_id(), now_millis())?;
        let row = created.clone();
        self.run(move |conn| images::insert_image(conn, &row)).await?;

        log::info!(
            "🖼️ 已保存图片资源 - id: {} 分类: {} 载荷: {}KB",
            created.id,
            created.category.as_str(),
            created.payload.len() / 1024
        );
        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| images::delete_image(conn, &id)).await
    }

    async fn list_by_category(&self, category: ImageCategory) -> Result<Vec<ImageResource>, StoreError> {
        let records = self
            .run(move |conn| images::list_images(conn, category.as_str()))
            .await?;

        let mut listed = Vec::with_capacity(records.len());
        for record in records {
            match record.into_resource() {
                Ok(resource) => listed.push(resource),
                Err(err) => log::warn!("⚠️ 跳过损坏的图片记录：{}", err),
            }
        }
        Ok(listed)
    }
}
