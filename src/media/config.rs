//! # 配置模块
//!
//! ## 设计思路
//!
//! 将上传与远程图片加载的“可调策略”集中到 `MediaConfig`，
//! `Default` 提供生产可用的平衡配置，测试按需放宽（例如允许回环地址）。

use std::time::Duration;

use image::imageops::FilterType;

/// 图片加载与上传预处理配置。
///
/// 字段覆盖了下载、尺寸探测与降采样三个阶段。
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// 下载/读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 网络下载超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载首包超时时间（毫秒）。
    pub stream_first_byte_timeout_ms: u64,
    /// 下载分块读取超时时间（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数，避免无限跳转或恶意链路。
    pub max_redirects: usize,
    /// 是否允许访问内网或本地地址（默认关闭，防 SSRF）。
    pub allow_private_network: bool,
    /// 是否对域名执行 DNS 解析后再做内网 IP 拦截。
    ///
    /// 开启后可防止“公网域名 -> 内网IP”绕过策略。
    pub resolve_dns_for_url_safety: bool,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 上传图片宽/高单边最大值，超出时降采样后再入库。
    pub max_upload_dimension: u32,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
    /// 尺寸探测的等待上限。
    pub probe_timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            stream_first_byte_timeout_ms: 10_000,
            stream_chunk_timeout_ms: 15_000,
            max_redirects: 5,
            allow_private_network: false,
            resolve_dns_for_url_safety: true,
            max_decoded_pixels: 40_000_000,
            max_upload_dimension: 1600,
            resize_filter: FilterType::Triangle,
            probe_timeout: Duration::from_secs(2),
        }
    }
}
