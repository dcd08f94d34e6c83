//! 数据库模块
//!
//! # 设计思路
//!
//! 图片资源与模板都存放在本地 SQLite 中，使用 `rusqlite` 直接操作。
//! 连接封装为 `DbState(Mutex<Connection>)`，由上层（资源库、CLI）共享。
//!
//! - `config`：数据库文件位置（可通过数据目录下 `config.json` 改到其他目录）
//! - `schema`：建表与版本迁移（`PRAGMA user_version`）
//! - `images`：图片资源表读写，供 `library::SqliteResourceStore` 使用
//! - `templates`：模板增删改查

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::AppError;

mod config;
pub(crate) mod images;
mod schema;
mod templates;

pub use templates::*;

/// 数据库连接封装
pub struct DbState(pub Mutex<Connection>);

impl DbState {
    pub fn new(conn: Connection) -> Self {
        Self(Mutex::new(conn))
    }
}

pub fn with_conn<T>(state: &DbState, op: impl FnOnce(&Connection) -> Result<T, AppError>) -> Result<T, AppError> {
    let conn = state.0.lock().map_err(|e| {
        AppError::Database(format!("获取数据库锁失败: {}", e))
    })?;
    op(&conn)
}

/// 初始化数据库连接与 Schema
///
/// 数据库文件位置由 `data_dir` 及其 `config.json` 决定，目录不存在时自动创建。
pub fn init_db(data_dir: &Path) -> Result<Connection, AppError> {
    let db_path = config::resolve_db_path(data_dir)?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Database(format!("创建数据库目录失败: {}", e))
        })?;
    }
    log::info!("数据库路径: {}", db_path.display());

    let conn = Connection::open(&db_path).map_err(|e| {
        AppError::Database(format!("打开数据库失败: {}", e))
    })?;

    schema::initialize_schema(&conn)?;

    Ok(conn)
}

/// 打开已初始化 Schema 的内存数据库（嵌入与测试使用）。
pub fn open_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory().map_err(|e| {
        AppError::Database(format!("打开内存数据库失败: {}", e))
    })?;
    schema::initialize_schema(&conn)?;
    Ok(conn)
}

/// 把数据库迁到新目录：写入 `config.json`，下次 `init_db` 生效。
pub fn set_db_dir(data_dir: &Path, db_dir: Option<String>) -> Result<(), AppError> {
    fs::create_dir_all(data_dir)?;
    config::save_db_config_to_path(&data_dir.join("config.json"), db_dir)
}
