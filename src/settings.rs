//! # 应用设置与凭据
//!
//! - `AppSettings`：数据目录下的 `settings.json`，文件缺失或损坏时回退默认值，
//!   各子系统的配置结构（展开、媒体、截图）由它派生
//! - `ApiCredentials`：补全接口密钥，启动时创建并显式传给 `CompletionClient`，
//!   不存放在任何全局状态里

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::expander::ExpanderConfig;
use crate::media::MediaConfig;
use crate::render::{CaptureConfig, RenderOptions};

const SETTINGS_FILE_NAME: &str = "settings.json";

/// 读取密钥的环境变量。
pub const API_KEY_ENV: &str = "ARTIFACT_STUDIO_API_KEY";

/// 持久化的应用设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    /// 预览、导出的默认渲染选项。
    pub render: RenderOptions,
    /// 一次展开的资源查询总超时（毫秒）。
    pub lookup_timeout_ms: u64,
    /// 截图前单张远程图片的等待上限（毫秒）。
    pub capture_image_wait_ms: u64,
    /// 上传图片单边最大像素。
    pub max_upload_dimension: u32,
    /// 是否允许从内网地址加载图片。
    pub allow_private_network: bool,
    /// 补全接口地址（OpenAI 兼容）。
    pub completion_base_url: String,
    pub completion_model: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            lookup_timeout_ms: 15_000,
            capture_image_wait_ms: 2_000,
            max_upload_dimension: 1600,
            allow_private_network: false,
            completion_base_url: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
        }
    }
}

fn settings_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE_NAME)
}

impl AppSettings {
    /// 读取设置；文件不存在或无法解析时返回默认值。
    pub fn load(data_dir: &Path) -> Self {
        let path = settings_file_path(data_dir);
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("⚠️ 设置文件解析失败，使用默认值: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("⚠️ 读取设置文件失败，使用默认值: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| AppError::Storage(format!("创建应用数据目录失败: {}", e)))?;

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;

        fs::write(settings_file_path(data_dir), content)?;
        Ok(())
    }

    pub fn expander_config(&self) -> ExpanderConfig {
        ExpanderConfig {
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms.max(1)),
        }
    }

    pub fn media_config(&self) -> MediaConfig {
        MediaConfig {
            max_upload_dimension: self.max_upload_dimension.max(1),
            allow_private_network: self.allow_private_network,
            ..MediaConfig::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            image_wait: Duration::from_millis(self.capture_image_wait_ms),
            ..CaptureConfig::default()
        }
    }
}

/// 补全接口凭据。
///
/// 克隆后共享同一份密钥，`set`/`clear` 对所有持有者立即可见。
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    api_key: Arc<RwLock<Option<String>>>,
}

impl ApiCredentials {
    pub fn new(api_key: Option<String>) -> Self {
        let credentials = Self::default();
        if let Some(key) = api_key {
            credentials.set(key);
        }
        credentials
    }

    /// 从 `ARTIFACT_STUDIO_API_KEY` 读取初始密钥。
    pub fn from_env() -> Self {
        Self::new(std::env::var(API_KEY_ENV).ok())
    }

    pub fn get(&self) -> Option<String> {
        self.api_key.read().ok().and_then(|key| key.clone())
    }

    /// 设置密钥；去掉首尾空白后为空视为清除。
    pub fn set(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        let trimmed = api_key.trim();
        if let Ok(mut slot) = self.api_key.write() {
            *slot = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.api_key.write() {
            *slot = None;
        }
    }

    pub fn is_configured(&self) -> bool {
        self.get().is_some()
    }
}
