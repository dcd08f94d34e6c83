//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 注意：引用展开（`expander`）对外**从不**返回错误，
//! 它的失败全部降级为“尽力输出”；`AppError` 只出现在
//! 存储、上传、剪贴板、导出、设置等外围链路。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `StoreError` / `MediaError` / `ClipboardError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，供 CLI 的 `--json` 输出使用。

use serde::Serialize;

use crate::clipboard::ClipboardError;
use crate::library::StoreError;
use crate::media::MediaError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 资源库（图片）读写失败
    #[error("{0}")]
    Store(#[from] StoreError),

    /// 图片加载 / 解码 / 缩放失败
    #[error("{0}")]
    Media(#[from] MediaError),

    /// 剪贴板写入失败
    #[error("{0}")]
    Clipboard(#[from] ClipboardError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据目录或配置文件不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 数据库操作失败
    #[error("数据库错误: {0}")]
    Database(String),

    /// 渲染宿主绘制失败
    #[error("渲染失败: {0}")]
    Render(String),

    /// 外部补全接口调用失败
    #[error("补全接口错误: {0}")]
    Completion(String),

    /// 输入参数无效
    #[error("参数无效: {0}")]
    InvalidInput(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::InvalidInput("未知纸张：b5".to_string());
        let json = serde_json::to_string(&err).expect("serialize error");

        assert_eq!(json, "\"参数无效: 未知纸张：b5\"");
    }

    #[test]
    fn store_error_converts_transparently() {
        let err: AppError = StoreError::Unavailable("连接已关闭".to_string()).into();

        assert!(matches!(err, AppError::Store(_)));
        assert!(err.to_string().contains("连接已关闭"));
    }
}
