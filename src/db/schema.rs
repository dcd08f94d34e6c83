//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建/迁移数据库表结构与索引
//! - 设置 SQLite 运行参数（WAL、外键）
//!
//! ## 版本
//! - v1：`image_resources` 图片资源表
//! - v2：`templates` 模板表
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_VERSION: i64 = 2;

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_image_resources_table(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS image_resources (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            payload TEXT NOT NULL CHECK (length(payload) > 0),
            mime_type TEXT,
            category TEXT NOT NULL,
            width INTEGER CHECK (width IS NULL OR width > 0),
            height INTEGER CHECK (height IS NULL OR height > 0),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_image_resources_category_created
            ON image_resources(category, created_at DESC);"
    ).map_err(|e| AppError::Database(format!("创建图片资源表失败: {}", e)))
}

fn create_templates_table(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT NOT NULL CHECK (category IN ('email', 'flyer', 'signature')),
            html TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_templates_category_updated
            ON templates(category, updated_at DESC);"
    ).map_err(|e| AppError::Database(format!("创建模板表失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .ok();

    let mut version = get_user_version(conn)?;
    if version < 1 {
        create_image_resources_table(conn)?;
        set_user_version(conn, 1)?;
        version = 1;
    }

    if version < 2 {
        create_templates_table(conn)?;
        set_user_version(conn, 2)?;
        version = 2;
    }

    if version != SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本不匹配: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use super::initialize_schema;

    fn names(conn: &Connection, sql: &str) -> HashSet<String> {
        let mut stmt = conn.prepare(sql).expect("prepare");
        stmt.query_map([], |row| row.get::<_, String>(0))
            .expect("query")
            .collect::<Result<HashSet<_>, _>>()
            .expect("collect")
    }

    #[test]
    fn initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("create memory db");

        initialize_schema(&conn).expect("first init should succeed");
        initialize_schema(&conn).expect("second init should succeed");

        let tables = names(&conn, "SELECT name FROM sqlite_master WHERE type='table'");
        assert!(tables.contains("image_resources"));
        assert!(tables.contains("templates"));
    }

    #[test]
    fn initialize_schema_creates_expected_indexes_and_version() {
        let conn = Connection::open_in_memory().expect("create memory db");
        initialize_schema(&conn).expect("init should succeed");

        let indexes = names(
            &conn,
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'",
        );
        for required in [
            "idx_image_resources_category_created",
            "idx_templates_category_updated",
        ] {
            assert!(indexes.contains(required), "missing required index: {required}");
        }

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("query user_version");
        assert_eq!(version, super::SCHEMA_VERSION);
    }

    #[test]
    fn initialize_schema_upgrades_v1_database() {
        let conn = Connection::open_in_memory().expect("create memory db");
        conn.execute_batch(
            "CREATE TABLE image_resources (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                payload TEXT NOT NULL,
                mime_type TEXT,
                category TEXT NOT NULL,
                width INTEGER,
                height INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            PRAGMA user_version = 1;"
        )
        .expect("prepare legacy v1 schema");

        initialize_schema(&conn).expect("migrate from v1 to v2");

        let tables = names(&conn, "SELECT name FROM sqlite_master WHERE type='table'");
        assert!(tables.contains("templates"));
    }

    #[test]
    fn image_payload_must_not_be_empty() {
        let conn = Connection::open_in_memory().expect("create memory db");
        initialize_schema(&conn).expect("init should succeed");

        let result = conn.execute(
            "INSERT INTO image_resources (id, name, payload, category, created_at, updated_at)
             VALUES ('a', 'b', '', 'logo', 0, 0)",
            [],
        );
        assert!(result.is_err(), "CHECK 约束应拒绝空载荷");
    }

    #[test]
    fn template_category_is_constrained() {
        let conn = Connection::open_in_memory().expect("create memory db");
        initialize_schema(&conn).expect("init should succeed");

        let result = conn.execute(
            "INSERT INTO templates (name, category, html, created_at, updated_at)
             VALUES ('x', 'poster', '', 0, 0)",
            [],
        );
        assert!(result.is_err(), "CHECK 约束应拒绝未知模板分类");
    }
}
