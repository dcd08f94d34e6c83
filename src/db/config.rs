//! 数据库路径配置
//!
//! 数据目录下的 `config.json` 可以把数据库放到其他目录（例如同步盘）；
//! 配置缺失或损坏时回退到数据目录本身。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DB_FILE_NAME: &str = "artifacts.db";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct DbConfig {
    #[serde(default)]
    pub(crate) db_dir: Option<String>,
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

pub(crate) fn load_db_config_from_path(config_path: &Path) -> DbConfig {
    if config_path.exists() {
        if let Ok(content) = fs::read_to_string(config_path) {
            if let Ok(config) = serde_json::from_str(&content) {
                return config;
            }
        }
    }
    DbConfig::default()
}

pub(crate) fn save_db_config_to_path(config_path: &Path, db_dir: Option<String>) -> Result<(), AppError> {
    let config = DbConfig { db_dir };
    let content = serde_json::to_string_pretty(&config).map_err(|e| {
        AppError::Database(format!("序列化配置失败: {}", e))
    })?;
    fs::write(config_path, content).map_err(|e| {
        AppError::Database(format!("写入配置文件失败: {}", e))
    })?;
    Ok(())
}

pub(crate) fn resolve_db_path_from_config(data_dir: &Path, config: &DbConfig) -> Result<PathBuf, AppError> {
    if let Some(ref dir) = config.db_dir {
        if !dir.is_empty() {
            let dir_path = PathBuf::from(dir);
            fs::create_dir_all(&dir_path).map_err(|e| {
                AppError::Database(format!("创建数据库目录失败: {}", e))
            })?;
            return Ok(dir_path.join(DB_FILE_NAME));
        }
    }
    Ok(data_dir.join(DB_FILE_NAME))
}

/// 根据数据目录解析数据库文件路径。
pub(crate) fn resolve_db_path(data_dir: &Path) -> Result<PathBuf, AppError> {
    let config = load_db_config_from_path(&config_path(data_dir));
    resolve_db_path_from_config(data_dir, &config)
}
