//! 图片资源表子模块
//!
//! ## 职责
//! - `image_resources` 表的插入、按 id 读取、删除、按分类列出
//! - 行数据先读成 `ImageRecord`（分类保持原始字符串），
//!   再由调用方转换为 `ImageResource`，单条损坏不会拖垮整次查询
//!
//! ## 错误语义
//! - SQL 失败统一映射为 `AppError::Database`

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::AppError;
use crate::library::{ImageResource, StoreError};

/// `image_resources` 的原始行。
#[derive(Debug, Clone)]
pub(crate) struct ImageRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) payload: String,
    pub(crate) mime_type: Option<String>,
    pub(crate) category: String,
    pub(crate) width: Option<i64>,
    pub(crate) height: Option<i64>,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl ImageRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            payload: row.get(3)?,
            mime_type: row.get(4)?,
            category: row.get(5)?,
            width: row.get(6)?,
            height: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    /// 转换为领域模型；分类无法识别时报告为单条损坏。
    pub(crate) fn into_resource(self) -> Result<ImageResource, StoreError> {
        let category = self
            .category
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("资源 {} 的分类无法识别：{}", self.id, self.category)))?;

        Ok(ImageResource {
            id: self.id,
            name: self.name,
            description: self.description,
            payload: self.payload,
            mime_type: self.mime_type,
            category,
            width: positive_dimension(self.width),
            height: positive_dimension(self.height),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn positive_dimension(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
}

const SELECT_COLUMNS: &str =
    "id, name, description, payload, mime_type, category, width, height, created_at, updated_at";

pub(crate) fn get_image(conn: &Connection, id: &str) -> Result<Option<ImageRecord>, AppError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM image_resources WHERE id = ?1"),
        params![id],
        ImageRecord::from_row,
    )
    .optional()
    .map_err(|e| AppError::Database(format!("查询图片资源失败: {}", e)))
}

pub(crate) fn insert_image(conn: &Connection, resource: &ImageResource) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO image_resources
            (id, name, description, payload, mime_type, category, width, height, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            resource.id,
            resource.name,
            resource.description,
            resource.payload,
            resource.mime_type,
            resource.category.as_str(),
            resource.width.map(i64::from),
            resource.height.map(i64::from),
            resource.created_at,
            resource.updated_at,
        ],
    ).map_err(|e| AppError::Database(format!("写入图片资源失败: {}", e)))?;
    Ok(())
}

pub(crate) fn delete_image(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let affected = conn
        .execute("DELETE FROM image_resources WHERE id = ?1", params![id])
        .map_err(|e| AppError::Database(format!("删除图片资源失败: {}", e)))?;
    Ok(affected > 0)
}

pub(crate) fn list_images(conn: &Connection, category: &str) -> Result<Vec<ImageRecord>, AppError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM image_resources
             WHERE category = ?1
             ORDER BY created_at DESC, name ASC"
        ))
        .map_err(|e| AppError::Database(format!("准备查询失败: {}", e)))?;

    let records = stmt
        .query_map(params![category], ImageRecord::from_row)
        .map_err(|e| AppError::Database(format!("查询图片列表失败: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取行失败: {}", e)))?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::library::ImageCategory;

    fn sample(id: &str, created_at: i64, category: ImageCategory) -> ImageResource {
        ImageResource {
            id: id.to_string(),
            name: format!("图片 {id}"),
            description: None,
            payload: "data:image/png;base64,AAAA".to_string(),
            mime_type: Some("image/png".to_string()),
            category,
            width: Some(32),
            height: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn insert_get_delete() {
        let conn = open_in_memory().expect("open db");
        let resource = sample("logo-1", 10, ImageCategory::Logo);

        insert_image(&conn, &resource).expect("insert");
        let fetched = get_image(&conn, "logo-1")
            .expect("query")
            .expect("record exists")
            .into_resource()
            .expect("valid record");
        assert_eq!(fetched, resource);

        assert!(delete_image(&conn, "logo-1").expect("delete"));
        assert!(get_image(&conn, "logo-1").expect("query").is_none());
    }

    #[test]
    fn list_orders_newest_first_within_category() {
        let conn = open_in_memory().expect("open db");
        insert_image(&conn, &sample("a", 1, ImageCategory::Banner)).expect("insert");
        insert_image(&conn, &sample("b", 3, ImageCategory::Banner)).expect("insert");
        insert_image(&conn, &sample("c", 2, ImageCategory::Logo)).expect("insert");

        let ids: Vec<String> = list_images(&conn, "banner")
            .expect("list")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn unknown_category_is_reported_as_corrupt() {
        let conn = open_in_memory().expect("open db");
        conn.execute(
            "INSERT INTO image_resources (id, name, payload, category, created_at, updated_at)
             VALUES ('odd', 'x', 'AAAA', 'hero', 0, 0)",
            [],
        )
        .expect("insert legacy row");

        let record = get_image(&conn, "odd").expect("query").expect("exists");
        assert!(matches!(record.into_resource(), Err(StoreError::Corrupt(_))));
    }
}
