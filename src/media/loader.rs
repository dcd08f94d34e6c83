//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / Base64 / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。上传与截图前的远程图片内联共用这一套加载逻辑。
//!
//! ## 实现思路
//!
//! - URL：协议 + 主机安全 + 内容类型 + 体积校验 + 流式下载（首包/分块超时）。
//! - Base64：格式解析 + 解码前体积估算。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 类型识别：位图走 `infer` 文件签名，SVG 走文本嗅探。
//! - 网络错误统一映射到 `MediaError`，便于上层处理。

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose};
use tokio::net::lookup_host;

use super::{ImageSource, LoadedImage, MediaConfig, MediaError};

const STREAM_SIGNATURE_PROBE_BYTES: usize = 4096;
const NETWORK_RETRY_MAX_ATTEMPTS: u8 = 3;
const NETWORK_RETRY_BASE_DELAY_MS: u64 = 180;
const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;
const SVG_MIME_TYPE: &str = "image/svg+xml";

/// 图片加载器。
#[derive(Debug, Clone, Default)]
pub struct MediaLoader {
    config: MediaConfig,
}

impl MediaLoader {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// 按来源加载图片字节并识别 MIME。
    pub async fn load(&self, source: &ImageSource) -> Result<LoadedImage, MediaError> {
        match source {
            ImageSource::Url(url) => self.load_from_url(url).await,
            ImageSource::Base64(data) => self.load_from_base64(data),
            ImageSource::FilePath(path) => self.load_from_file(path),
        }
    }

    /// 从 URL 加载图片原始字节。
    pub async fn load_from_url(&self, url: &str) -> Result<LoadedImage, MediaError> {
        log::info!("🌐 开始下载图片 - URL: {}", redact_url_for_log(url));

        validate_url_safety(url, &self.config).await?;
        let bytes = self.download_with_validation(url).await?;
        let mime_type = detect_image_mime(&bytes)?;

        Ok(LoadedImage {
            bytes,
            mime_type,
            source_hint: "url",
        })
    }

    /// 从 Base64 字符串加载图片原始字节（支持 Data URL 与纯 Base64）。
    pub fn load_from_base64(&self, data: &str) -> Result<LoadedImage, MediaError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = parse_base64_with_limit(data, self.config.max_file_size)?;
        if bytes.len() as u64 > self.config.max_file_size {
            return Err(MediaError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        let mime_type = detect_image_mime(&bytes)?;

        Ok(LoadedImage {
            bytes,
            mime_type,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载图片原始字节。
    pub fn load_from_file(&self, path: &Path) -> Result<LoadedImage, MediaError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(MediaError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| MediaError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > self.config.max_file_size {
            return Err(MediaError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| MediaError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        let mime_type = detect_image_mime(&bytes)?;

        Ok(LoadedImage {
            bytes,
            mime_type,
            source_hint: "file",
        })
    }

    /// 执行带校验的网络下载（手动跟随重定向，每一跳都重新做安全校验）。
    ///
    /// 使用流式读取，避免一次性读入导致内存峰值过高。
    pub(crate) async fn download_with_validation(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let config = &self.config;
        let mut current_url = reqwest::Url::parse(url)
            .map_err(|e| MediaError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        for redirect_count in 0..=config.max_redirects {
            let clients = build_request_clients_for_url(&current_url, config).await?;
            let response = send_with_retry(&clients, &current_url, config).await?;

            if response.status().is_redirection() {
                if redirect_count >= config.max_redirects {
                    return Err(MediaError::Network(format!(
                        "重定向次数超过限制（{}）",
                        config.max_redirects
                    )));
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .ok_or_else(|| MediaError::Network("重定向响应缺少 Location 头".to_string()))?
                    .to_str()
                    .map_err(|e| MediaError::InvalidFormat(format!("重定向地址无效：{}", e)))?;

                let next_url = current_url
                    .join(location)
                    .map_err(|e| MediaError::InvalidFormat(format!("重定向 URL 解析失败：{}", e)))?;

                validate_url_safety(next_url.as_str(), config).await?;

                log::debug!("↪️ 跳转到: {}", redact_url_for_log(next_url.as_str()));
                current_url = next_url;
                continue;
            }

            if !response.status().is_success() {
                return Err(MediaError::Network(format!(
                    "HTTP {}: {}",
                    response.status().as_u16(),
                    status_message(response.status().as_u16())
                )));
            }

            if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
                if let Ok(ct_str) = ct.to_str() {
                    if !is_image_content_type(ct_str) {
                        return Err(MediaError::InvalidFormat(format!("不是图片类型：{}", ct_str)));
                    }
                }
            }

            return read_body_with_limits(response, config).await;
        }

        Err(MediaError::Network("下载流程异常结束".to_string()))
    }
}

async fn send_with_retry(
    clients: &[reqwest::Client],
    url: &reqwest::Url,
    config: &MediaConfig,
) -> Result<reqwest::Response, MediaError> {
    let mut attempt: u8 = 1;
    loop {
        let client = &clients[(attempt.saturating_sub(1) as usize) % clients.len()];
        let send_result = client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8",
            )
            .send()
            .await;

        match send_result {
            Ok(resp) => {
                if attempt < NETWORK_RETRY_MAX_ATTEMPTS && is_retryable_http_status(resp.status()) {
                    let delay_ms = compute_retry_delay_with_jitter(attempt, retry_after_hint_ms(resp.headers()));
                    log::warn!(
                        "⚠️ HTTP {}（第 {}/{} 次，可重试）；{}ms 后重试",
                        resp.status().as_u16(),
                        attempt,
                        NETWORK_RETRY_MAX_ATTEMPTS,
                        delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt = attempt.saturating_add(1);
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt >= NETWORK_RETRY_MAX_ATTEMPTS || !(err.is_timeout() || err.is_connect()) {
                    return Err(map_reqwest_error(err, url.as_str(), config));
                }

                let delay_ms = compute_retry_delay_with_jitter(attempt, None);
                log::warn!(
                    "⚠️ 网络请求失败（第 {}/{} 次，可重试）；{}ms 后重试",
                    attempt,
                    NETWORK_RETRY_MAX_ATTEMPTS,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

async fn read_body_with_limits(
    mut response: reqwest::Response,
    config: &MediaConfig,
) -> Result<Vec<u8>, MediaError> {
    let total_len = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|cl| cl.to_str().ok())
        .and_then(|cl| cl.parse::<u64>().ok());

    if let Some(size) = total_len {
        if size > config.max_file_size {
            return Err(MediaError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                size as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
    }

    let initial_capacity = total_len
        .map(|len| len.min(config.max_file_size) as usize)
        .filter(|len| *len > 0)
        .unwrap_or(BUFFER_INITIAL_CAPACITY);
    let mut buffer = Vec::with_capacity(initial_capacity);
    let mut signature_validated = false;
    let mut received_first_chunk = false;

    loop {
        let read_timeout = if received_first_chunk {
            Duration::from_millis(config.stream_chunk_timeout_ms)
        } else {
            Duration::from_millis(config.stream_first_byte_timeout_ms)
        };

        let next_chunk = tokio::time::timeout(read_timeout, response.chunk())
            .await
            .map_err(|_| {
                if received_first_chunk {
                    MediaError::Timeout("下载数据流读取超时".to_string())
                } else {
                    MediaError::Timeout("下载首包超时".to_string())
                }
            })?
            .map_err(|e| MediaError::Network(format!("下载失败：{}", e)))?;

        let Some(chunk) = next_chunk else {
            break;
        };
        received_first_chunk = true;

        if (buffer.len() + chunk.len()) as u64 > config.max_file_size {
            return Err(MediaError::ResourceLimit("下载后文件超过大小限制".to_string()));
        }
        buffer.extend_from_slice(&chunk);

        if !signature_validated {
            signature_validated = validate_stream_signature_probe(&buffer, STREAM_SIGNATURE_PROBE_BYTES)?;
        }
    }

    log::debug!("✅ 下载完成 - {} bytes", buffer.len());
    Ok(buffer)
}

async fn build_request_clients_for_url(
    url: &reqwest::Url,
    config: &MediaConfig,
) -> Result<Vec<reqwest::Client>, MediaError> {
    if config.allow_private_network || !config.resolve_dns_for_url_safety {
        return Ok(vec![build_base_http_client(config)?]);
    }

    let Some(host) = url.host_str() else {
        return Ok(vec![build_base_http_client(config)?]);
    };

    if host.parse::<IpAddr>().is_ok() {
        return Ok(vec![build_base_http_client(config)?]);
    }

    let port = url
        .port_or_known_default()
        .ok_or_else(|| MediaError::InvalidFormat("URL 缺少端口信息".to_string()))?;

    let pinned = resolve_public_socket_addrs(host, port).await?;
    if pinned.is_empty() {
        return Err(MediaError::InvalidFormat("URL 未解析到有效公网地址".to_string()));
    }

    pinned
        .into_iter()
        .map(|addr| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(config.download_timeout))
                .connect_timeout(Duration::from_secs(config.connect_timeout))
                .redirect(reqwest::redirect::Policy::none())
                .resolve(host, addr)
                .build()
                .map_err(|e| MediaError::Network(format!("无法创建 DNS 绑定客户端：{}", e)))
        })
        .collect()
}

fn build_base_http_client(config: &MediaConfig) -> Result<reqwest::Client, MediaError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.download_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| MediaError::Network(format!("无法创建 HTTP 客户端：{}", e)))
}

async fn resolve_public_socket_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, MediaError> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| MediaError::InvalidFormat(format!("URL 主机解析失败：{}", e)))?;

    let mut result = Vec::new();
    for addr in addrs {
        if is_private_or_local_ip(addr.ip()) {
            return Err(MediaError::InvalidFormat(format!(
                "URL 解析结果命中内网地址：{}",
                addr.ip()
            )));
        }
        result.push(addr);
    }

    Ok(result)
}

/// 校验 URL 安全性。
///
/// 默认阻止本地/内网目标，防止 SSRF 风险。
pub(crate) async fn validate_url_safety(url: &str, config: &MediaConfig) -> Result<(), MediaError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| MediaError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(MediaError::InvalidFormat("仅支持 HTTP/HTTPS".to_string()));
    }

    if config.allow_private_network {
        return Ok(());
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| MediaError::InvalidFormat("URL 缺少主机地址".to_string()))?;

    if is_local_hostname(host) {
        return Err(MediaError::InvalidFormat(format!("禁止访问本地网络地址：{}", host)));
    }

    // IPv6 主机在 URL 中带方括号
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare_host.parse::<IpAddr>() {
        if is_private_or_local_ip(ip) {
            return Err(MediaError::InvalidFormat(format!("禁止访问内网 IP：{}", ip)));
        }
        return Ok(());
    }

    if config.resolve_dns_for_url_safety {
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| MediaError::InvalidFormat("URL 缺少端口信息".to_string()))?;

        if resolve_public_socket_addrs(host, port).await?.is_empty() {
            return Err(MediaError::InvalidFormat("URL 未解析到有效地址".to_string()));
        }
    }

    Ok(())
}

fn is_local_hostname(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || host.eq_ignore_ascii_case("localhost.") || host.ends_with(".local")
}

/// 判断 IP 是否属于本地/内网/链路本地等受限范围。
fn is_private_or_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
            {
                return true;
            }

            let octets = v4.octets();
            octets[0] == 0 || (octets[0] == 100 && (octets[1] & 0b1100_0000) == 0b0100_0000)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                || v6.is_multicast()
        }
    }
}

fn retry_after_hint_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?;
    let secs = value.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(secs.saturating_mul(1000).min(5_000))
}

fn compute_retry_delay_with_jitter(attempt: u8, server_hint_ms: Option<u64>) -> u64 {
    let exp = NETWORK_RETRY_BASE_DELAY_MS.saturating_mul(1_u64 << (attempt.saturating_sub(1) as u32));
    let base = server_hint_ms.unwrap_or(exp);
    let jitter_bound = (base / 2).max(1);
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    base.saturating_add(seed % (jitter_bound + 1))
}

fn is_retryable_http_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// 日志中去掉查询串与片段，避免泄露签名参数。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

fn map_reqwest_error(e: reqwest::Error, url: &str, config: &MediaConfig) -> MediaError {
    let err_msg = e.to_string().replace(url, &redact_url_for_log(url));

    if e.is_timeout() {
        MediaError::Timeout(format!("下载超时（{}秒）", config.download_timeout))
    } else if e.is_connect() {
        MediaError::Network(format!("无法连接：{}", err_msg))
    } else {
        MediaError::Network(format!("请求失败：{}", err_msg))
    }
}

fn status_message(code: u16) -> &'static str {
    match code {
        404 => "未找到",
        403 => "访问被拒绝",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, MediaError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| MediaError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| MediaError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, MediaError> {
    let normalized = data.trim();

    let base64_data = if normalized.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
        let marker = normalized
            .find(";base64,")
            .ok_or_else(|| MediaError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[marker + ";base64,".len()..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(base64_data)?;
    if estimated_len > max_file_size {
        return Err(MediaError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let compact: String = base64_data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| MediaError::Decode(format!("Base64 解码失败：{}", e)))
}

/// SVG 是文本格式，没有文件签名，按开头内容嗅探。
pub(crate) fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();

    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg"))
}

/// 通过文件签名（magic bytes）识别图片 MIME，非图片内容直接拒绝。
pub(crate) fn detect_image_mime(bytes: &[u8]) -> Result<String, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::InvalidFormat("图片内容为空".to_string()));
    }

    // `<?xml` 开头的 SVG 会被签名识别为 text/xml，先按文本嗅探
    if looks_like_svg(bytes) {
        return Ok(SVG_MIME_TYPE.to_string());
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(MediaError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
        return Ok(kind.mime_type().to_string());
    }

    Err(MediaError::InvalidFormat("无法识别图片类型".to_string()))
}

/// 流式下载阶段的签名探测：尽早识别并拒绝非图片内容。
///
/// 返回值：
/// - `Ok(true)`：已识别为图片
/// - `Ok(false)`：当前字节不足以判断（或可能是 SVG 文本），继续下载
/// - `Err(...)`：已识别为非图片，或达到探测上限仍无法识别
fn validate_stream_signature_probe(bytes: &[u8], probe_limit: usize) -> Result<bool, MediaError> {
    if bytes.is_empty() {
        return Ok(false);
    }

    if looks_like_svg(bytes) {
        return Ok(true);
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(MediaError::InvalidFormat(format!(
                "下载内容不是图片类型：{}",
                kind.mime_type()
            )));
        }
        return Ok(true);
    }

    if bytes.len() >= probe_limit {
        return Err(MediaError::InvalidFormat(format!(
            "下载前 {} 字节内无法识别图片类型",
            probe_limit
        )));
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
        0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8, 0xCF, 0xC0, 0xF0,
        0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
        0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn serve_once(content_type: &'static str, body: &'static [u8]) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let port = listener.local_addr().expect("read local addr failed").port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            let headers = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            // 客户端可能读完响应头就断开，写入失败不影响断言
            let _ = stream.write_all(headers.as_bytes());
            let _ = stream.write_all(body);
            let _ = stream.flush();
        });

        (port, server)
    }

    fn loopback_loader() -> MediaLoader {
        MediaLoader::new(MediaConfig {
            allow_private_network: true,
            ..MediaConfig::default()
        })
    }

    #[tokio::test]
    async fn url_safety_blocks_private_targets_by_default() {
        let config = MediaConfig::default();

        for url in [
            "http://127.0.0.1/image.png",
            "https://localhost/image.png",
            "http://10.0.0.8/a.png",
            "http://[::1]/a.png",
            "ftp://example.com/a.png",
        ] {
            assert!(
                matches!(validate_url_safety(url, &config).await, Err(MediaError::InvalidFormat(_))),
                "{url} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn url_safety_allows_private_targets_when_enabled() {
        let config = MediaConfig {
            allow_private_network: true,
            ..MediaConfig::default()
        };

        assert!(validate_url_safety("http://127.0.0.1/image.png", &config).await.is_ok());
    }

    #[test]
    fn base64_rejects_non_image_payload() {
        let result = MediaLoader::default().load_from_base64("SGVsbG8=");
        assert!(matches!(result, Err(MediaError::InvalidFormat(_))));
    }

    #[test]
    fn base64_accepts_data_url_and_detects_mime() {
        let data_url = format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(PNG_1X1));
        let loaded = MediaLoader::default().load_from_base64(&data_url).expect("load png");

        assert_eq!(loaded.mime_type, "image/png");
        assert_eq!(loaded.bytes, PNG_1X1);
    }

    #[test]
    fn base64_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        assert!(matches!(parse_base64_with_limit(&huge, 32), Err(MediaError::ResourceLimit(_))));
    }

    #[test]
    fn file_loader_reports_missing_file() {
        let result = MediaLoader::default().load_from_file(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(MediaError::FileSystem(_))));
    }

    #[test]
    fn file_loader_reads_svg() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("logo.svg");
        std::fs::write(&path, r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#)
            .expect("write svg");

        let loaded = MediaLoader::default().load_from_file(&path).expect("load svg");
        assert_eq!(loaded.mime_type, SVG_MIME_TYPE);
    }

    #[test]
    fn content_type_parser_accepts_image_with_params() {
        assert!(is_image_content_type("image/png; charset=utf-8"));
        assert!(is_image_content_type("IMAGE/JPEG"));
        assert!(!is_image_content_type("text/html; charset=utf-8"));
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        assert_eq!(
            redact_url_for_log("https://example.com:8443/path/img.png?token=abc123#hash"),
            "https://example.com:8443/path/img.png"
        );
    }

    #[test]
    fn stream_signature_probe_rejects_non_image_payload() {
        let payload = b"%PDF-1.7 not an image";
        assert!(matches!(
            validate_stream_signature_probe(payload, 64),
            Err(MediaError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn url_download_returns_bytes_and_mime() {
        let (port, server) = serve_once("image/png", PNG_1X1);
        let url = format!("http://127.0.0.1:{}/logo.png", port);

        let loaded = loopback_loader().load_from_url(&url).await.expect("download png");
        server.join().expect("server thread failed");

        assert_eq!(loaded.mime_type, "image/png");
        assert_eq!(loaded.bytes, PNG_1X1);
        assert_eq!(loaded.source_hint, "url");
    }

    #[tokio::test]
    async fn url_download_rejects_non_image_body_even_when_content_type_is_image() {
        let (port, server) = serve_once("image/png", b"hello world");
        let url = format!("http://127.0.0.1:{}/fake.png", port);

        let result = loopback_loader().load_from_url(&url).await;
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(MediaError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn url_download_rejects_html_content_type() {
        let (port, server) = serve_once("text/html", b"<html></html>");
        let url = format!("http://127.0.0.1:{}/page", port);

        let result = loopback_loader().load_from_url(&url).await;
        server.join().expect("server thread failed");

        assert!(matches!(result, Err(MediaError::InvalidFormat(_))));
    }
}
