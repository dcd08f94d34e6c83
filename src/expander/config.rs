//! # 展开配置
//!
//! `Default` 提供生产可用的取值，测试可按需缩短超时。

use std::time::Duration;

/// 占位符展开配置。
#[derive(Debug, Clone)]
pub struct ExpanderConfig {
    /// 一次展开中全部资源查询（整体扇出）允许的最长等待时间。
    ///
    /// 超时按系统性失败处理：放弃本次展开，原样返回输入。
    pub lookup_timeout: Duration,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(15),
        }
    }
}
