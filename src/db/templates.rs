//! 模板表子模块
//!
//! ## 职责
//! - 模板的增删改查
//! - 正文原样保存（包括图片占位符），展开只发生在读取之后
//!
//! ## 错误语义
//! - SQL 失败统一映射为 `AppError::Database`
//! - 分类字段无法识别映射为 `AppError::Database`（表上有 CHECK，理论上不会出现）

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::AppError;
use crate::library::now_millis;
use crate::template::{NewTemplate, Template, TemplateCategory};

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<(Template, String)> {
    let category: String = row.get(2)?;
    Ok((
        Template {
            id: row.get(0)?,
            name: row.get(1)?,
            category: TemplateCategory::Email,
            html: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        category,
    ))
}

fn resolve_category((mut template, category): (Template, String)) -> Result<Template, AppError> {
    template.category = category
        .parse()
        .map_err(|_| AppError::Database(format!("模板 {} 的分类无法识别：{}", template.id, category)))?;
    Ok(template)
}

pub fn create_template(conn: &Connection, new: NewTemplate) -> Result<Template, AppError> {
    if new.name.trim().is_empty() {
        return Err(AppError::InvalidInput("模板名称不能为空".to_string()));
    }

    let now = now_millis();
    conn.execute(
        "INSERT INTO templates (name, category, html, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![new.name.trim(), new.category.as_str(), new.html, now],
    ).map_err(|e| AppError::Database(format!("创建模板失败: {}", e)))?;

    Ok(Template {
        id: conn.last_insert_rowid(),
        name: new.name.trim().to_string(),
        category: new.category,
        html: new.html,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_template(conn: &Connection, id: i64) -> Result<Option<Template>, AppError> {
    conn.query_row(
        "SELECT id, name, category, html, created_at, updated_at FROM templates WHERE id = ?1",
        params![id],
        template_from_row,
    )
    .optional()
    .map_err(|e| AppError::Database(format!("查询模板失败: {}", e)))?
    .map(resolve_category)
    .transpose()
}

pub fn list_templates(conn: &Connection, category: Option<TemplateCategory>) -> Result<Vec<Template>, AppError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, category, html, created_at, updated_at FROM templates
             WHERE (?1 IS NULL OR category = ?1)
             ORDER BY updated_at DESC, id DESC",
        )
        .map_err(|e| AppError::Database(format!("准备查询失败: {}", e)))?;

    let rows = stmt
        .query_map(params![category.map(TemplateCategory::as_str)], template_from_row)
        .map_err(|e| AppError::Database(format!("查询模板列表失败: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(format!("读取行失败: {}", e)))?;

    rows.into_iter().map(resolve_category).collect()
}

/// 更新模板，返回是否命中记录。
pub fn update_template(conn: &Connection, id: i64, update: NewTemplate) -> Result<bool, AppError> {
    let affected = conn
        .execute(
            "UPDATE templates SET name = ?1, category = ?2, html = ?3, updated_at = ?4 WHERE id = ?5",
            params![update.name.trim(), update.category.as_str(), update.html, now_millis(), id],
        )
        .map_err(|e| AppError::Database(format!("更新模板失败: {}", e)))?;
    Ok(affected > 0)
}

pub fn delete_template(conn: &Connection, id: i64) -> Result<bool, AppError> {
    let affected = conn
        .execute("DELETE FROM templates WHERE id = ?1", params![id])
        .map_err(|e| AppError::Database(format!("删除模板失败: {}", e)))?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn signature(name: &str) -> NewTemplate {
        NewTemplate {
            name: name.to_string(),
            category: TemplateCategory::Signature,
            html: "<p>{{IMAGE:logo-1}} {{name}}</p>".to_string(),
        }
    }

    #[test]
    fn create_get_update_delete() {
        let conn = open_in_memory().expect("open db");
        let created = create_template(&conn, signature("默认签名")).expect("create");

        let fetched = get_template(&conn, created.id).expect("get").expect("exists");
        assert_eq!(fetched, created);

        let mut changed = signature("新签名");
        changed.html = "<p>updated</p>".to_string();
        assert!(update_template(&conn, created.id, changed).expect("update"));

        let fetched = get_template(&conn, created.id).expect("get").expect("exists");
        assert_eq!(fetched.name, "新签名");
        assert_eq!(fetched.html, "<p>updated</p>");

        assert!(delete_template(&conn, created.id).expect("delete"));
        assert!(get_template(&conn, created.id).expect("get").is_none());
    }

    #[test]
    fn list_filters_by_category() {
        let conn = open_in_memory().expect("open db");
        create_template(&conn, signature("签名")).expect("create");
        create_template(
            &conn,
            NewTemplate {
                name: "春季传单".to_string(),
                category: TemplateCategory::Flyer,
                html: String::new(),
            },
        )
        .expect("create");

        assert_eq!(list_templates(&conn, None).expect("list").len(), 2);
        let flyers = list_templates(&conn, Some(TemplateCategory::Flyer)).expect("list");
        assert_eq!(flyers.len(), 1);
        assert_eq!(flyers[0].name, "春季传单");
    }

    #[test]
    fn rejects_blank_name() {
        let conn = open_in_memory().expect("open db");
        assert!(matches!(
            create_template(&conn, signature("  ")),
            Err(AppError::InvalidInput(_))
        ));
    }
}
