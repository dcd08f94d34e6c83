//! # 内容生成助手
//!
//! ## 设计思路
//!
//! 调用 OpenAI 兼容的 `chat/completions` 接口，根据描述生成 HTML 片段。
//! 密钥来自显式传入的 `ApiCredentials`；未配置时在发出任何网络请求之前返回错误。
//!
//! ## 实现思路
//!
//! - 系统提示要求只返回 HTML 片段，并原样保留 `{{IMAGE:<id>}}` 占位符
//! - 模型常把结果包在 Markdown 代码块里，返回前剥掉外层围栏

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::settings::{AppSettings, ApiCredentials};

const SYSTEM_PROMPT: &str = "You write HTML fragments for emails and printable documents. \
Reply with the HTML fragment only, using inline styles. \
Keep every {{IMAGE:<id>}} placeholder exactly as written.";

/// 补全接口配置。
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// 接口根地址，例如 `https://api.openai.com/v1`。
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let settings = AppSettings::default();
        Self {
            base_url: settings.completion_base_url,
            model: settings.completion_model,
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&AppSettings> for CompletionConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            base_url: settings.completion_base_url.clone(),
            model: settings.completion_model.clone(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// 补全接口客户端。
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Completion(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// 根据描述生成 HTML 片段。
    pub async fn complete(&self, credentials: &ApiCredentials, prompt: &str) -> Result<String, AppError> {
        let api_key = credentials
            .get()
            .ok_or_else(|| AppError::Completion("未配置 API 密钥".to_string()))?;

        if prompt.trim().is_empty() {
            return Err(AppError::InvalidInput("描述不能为空".to_string()));
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let endpoint = self.endpoint();
        log::info!("🌐 请求补全接口 - model: {}", self.config.model);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Completion(format!("请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(AppError::Completion(format!("HTTP {}: {}", status.as_u16(), snippet)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Completion(format!("响应解析失败: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Completion("响应中没有内容".to_string()))?;

        Ok(strip_code_fence(&content).to_string())
    }
}

/// 去掉包裹整段内容的 Markdown 代码块围栏。
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn client_for(port: u16) -> CompletionClient {
        CompletionClient::new(CompletionConfig {
            base_url: format!("http://127.0.0.1:{}/v1/", port),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_network() {
        let client = client_for(9);
        let err = client
            .complete(&ApiCredentials::new(None), "a banner")
            .await
            .expect_err("no key");
        assert!(matches!(err, AppError::Completion(msg) if msg.contains("API 密钥")));
    }

    #[tokio::test]
    async fn posts_chat_request_and_unwraps_fence() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let port = listener.local_addr().expect("read local addr failed").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let request = read_request(&mut stream);
            let body = r#"{"choices":[{"message":{"role":"assistant","content":"```html\n<p>{{IMAGE:logo1}}</p>\n```"}}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            request
        });

        let html = client_for(port)
            .complete(&ApiCredentials::new(Some("sk-test".to_string())), "logo paragraph")
            .await
            .expect("complete");
        let request = server.join().expect("server thread failed");

        assert_eq!(html, "<p>{{IMAGE:logo1}}</p>");
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"model\":\"test-model\""));
        assert!(request.contains("logo paragraph"));
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let port = listener.local_addr().expect("read local addr failed").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");
            let _ = read_request(&mut stream);
            let body = r#"{"error":"bad key"}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });

        let err = client_for(port)
            .complete(&ApiCredentials::new(Some("sk-bad".to_string())), "x")
            .await
            .expect_err("unauthorized");
        server.join().expect("server thread failed");

        assert!(matches!(err, AppError::Completion(msg) if msg.starts_with("HTTP 401")));
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("<p>a</p>"), "<p>a</p>");
        assert_eq!(strip_code_fence("```html\n<p>a</p>\n```"), "<p>a</p>");
        assert_eq!(strip_code_fence("```\n<p>a</p>```"), "<p>a</p>");
        assert_eq!(strip_code_fence("```<p>a</p>"), "```<p>a</p>");
    }
}
