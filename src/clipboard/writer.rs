//! # 系统剪贴板写入
//!
//! ## 设计思路
//!
//! 与操作系统剪贴板交互的逻辑独立出来，隔离平台不稳定因素。
//! 写入在阻塞线程中执行，不阻塞 async 运行时。
//!
//! ## 实现思路
//!
//! - 通过 `arboard::Clipboard::set_html` 一次性写入 HTML 与纯文本两种格式
//! - 其他应用也在监控剪贴板时，打开剪贴板可能短暂失败：
//!   有限重试，指数退避 + 抖动，并受总预算约束
//! - 打开失败视为 `Busy`，写入失败视为 `Transient`，二者均可重试

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{ClipboardError, ClipboardPayload, ClipboardSink};

/// 剪贴板写入重试配置。
#[derive(Debug, Clone)]
pub struct ClipboardConfig {
    /// 最大尝试次数（至少 1 次）。
    pub retries: u32,
    /// 首次重试的基础等待（毫秒）。
    pub retry_delay_ms: u64,
    /// 所有重试的总时间预算（毫秒）。
    pub retry_max_total_ms: u64,
    /// 单次等待的上限（毫秒，不含抖动）。
    pub retry_max_delay_ms: u64,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 100,
            retry_max_total_ms: 1800,
            retry_max_delay_ms: 900,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipboardFailureKind {
    Busy,
    Transient,
}

#[derive(Debug, Clone)]
struct ClipboardWriteFailure {
    kind: ClipboardFailureKind,
    message: String,
}

impl ClipboardWriteFailure {
    fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Busy,
            message: message.into(),
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Transient,
            message: message.into(),
        }
    }
}

static JITTER_STATE: AtomicU64 = AtomicU64::new(0);

fn seed_jitter_state() -> u64 {
    let time_seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut state = time_seed ^ ((std::process::id() as u64) << 32) ^ 0x9E37_79B9_7F4A_7C15;
    if state == 0 {
        state = 0xA5A5_5A5A_0123_4567;
    }
    state
}

fn next_jitter_u64() -> u64 {
    let mut current = JITTER_STATE.load(Ordering::Relaxed);

    loop {
        let seeded = if current == 0 { seed_jitter_state() } else { current };

        let mut next = seeded;
        next ^= next << 13;
        next ^= next >> 7;
        next ^= next << 17;

        match JITTER_STATE.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}

pub(crate) fn compute_backoff_delay_with_jitter(base_delay_ms: u64, attempt: u32, max_delay_ms: u64) -> u64 {
    let exp = base_delay_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(8));
    let capped = exp.min(max_delay_ms.max(base_delay_ms));
    let jitter_bound = (capped / 3).max(1);
    let jitter = next_jitter_u64() % (jitter_bound + 1);
    capped.saturating_add(jitter)
}

pub(crate) fn would_exceed_retry_budget(elapsed_ms: u64, wait_ms: u64, budget_ms: u64) -> bool {
    elapsed_ms.saturating_add(wait_ms) > budget_ms
}

/// 带重试地执行一次写入。`write` 在每次尝试时被调用。
fn run_with_retry<F>(config: &ClipboardConfig, mut write: F) -> Result<u32, ClipboardError>
where
    F: FnMut() -> Result<(), ClipboardWriteFailure>,
{
    let retry_count = config.retries.max(1);
    let started = Instant::now();
    let mut last_error = None;
    let mut last_kind = ClipboardFailureKind::Transient;

    for attempt in 1..=retry_count {
        if attempt > 1 {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if elapsed_ms >= config.retry_max_total_ms {
                log::warn!(
                    "⏱️ 剪贴板写入重试预算耗尽（{}ms >= {}ms）",
                    elapsed_ms,
                    config.retry_max_total_ms
                );
                break;
            }

            let wait_ms = compute_backoff_delay_with_jitter(
                config.retry_delay_ms.max(1),
                attempt - 1,
                config.retry_max_delay_ms,
            );

            if would_exceed_retry_budget(elapsed_ms, wait_ms, config.retry_max_total_ms) {
                log::warn!(
                    "⏱️ 跳过第 {} 次重试：等待 {}ms 会超过预算 {}ms",
                    attempt,
                    wait_ms,
                    config.retry_max_total_ms
                );
                break;
            }

            log::debug!("🔄 重试 {}/{}，等待 {}ms（指数退避+抖动）", attempt, retry_count, wait_ms);
            std::thread::sleep(Duration::from_millis(wait_ms));
        }

        match write() {
            Ok(()) => {
                log::info!("✅ 复制成功 (尝试 {})", attempt);
                return Ok(attempt);
            }
            Err(failure) => {
                log::warn!("❌ 尝试 {} 失败: {}（kind={:?}）", attempt, failure.message, failure.kind);
                last_error = Some(failure.message);
                last_kind = failure.kind;
            }
        }
    }

    let final_message = last_error.unwrap_or_else(|| "未知错误".to_string());
    if last_kind == ClipboardFailureKind::Busy {
        Err(ClipboardError::Busy(final_message))
    } else {
        Err(ClipboardError::Write(final_message))
    }
}

fn write_html_once(payload: &ClipboardPayload) -> Result<(), ClipboardWriteFailure> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| ClipboardWriteFailure::busy(format!("无法访问剪贴板：{}", e)))?;

    clipboard
        .set_html(payload.html.as_str(), Some(payload.plain_text.as_str()))
        .map_err(|e| ClipboardWriteFailure::transient(format!("复制失败：{}", e)))
}

/// 写入系统剪贴板的 `ClipboardSink`。
#[derive(Debug, Clone, Default)]
pub struct ArboardSink {
    config: ClipboardConfig,
}

impl ArboardSink {
    pub fn new(config: ClipboardConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClipboardSink for ArboardSink {
    async fn write(&self, payload: &ClipboardPayload) -> Result<(), ClipboardError> {
        log::debug!(
            "📋 准备复制到剪贴板 - html: {}KB, 纯文本: {} 字符",
            payload.html.len() / 1024,
            payload.plain_text.chars().count()
        );

        let config = self.config.clone();
        let payload = payload.clone();

        tokio::task::spawn_blocking(move || run_with_retry(&config, || write_html_once(&payload)))
            .await
            .map_err(|e| ClipboardError::Thread(e.to_string()))?
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> ClipboardConfig {
        ClipboardConfig {
            retries: 3,
            retry_delay_ms: 1,
            retry_max_total_ms: 500,
            retry_max_delay_ms: 5,
        }
    }

    #[test]
    fn backoff_delay_stays_within_expected_bounds() {
        let delay = compute_backoff_delay_with_jitter(100, 4, 900);

        assert!(delay >= 800, "delay should be at least exponential base");
        assert!(delay <= 1200, "delay should include bounded jitter only");
    }

    #[test]
    fn backoff_delay_respects_max_cap() {
        let delay = compute_backoff_delay_with_jitter(300, 8, 500);

        assert!(delay >= 500, "delay should be capped at max_delay floor");
        assert!(delay <= 666, "delay should not exceed capped value + jitter");
    }

    #[test]
    fn retry_budget_checker_works() {
        assert!(would_exceed_retry_budget(1700, 120, 1800));
        assert!(!would_exceed_retry_budget(1600, 120, 1800));
        assert!(!would_exceed_retry_budget(0, 0, 1800));
    }

    #[test]
    fn retries_until_write_succeeds() {
        let mut calls = 0;
        let attempts = run_with_retry(&fast_config(), || {
            calls += 1;
            if calls < 3 {
                Err(ClipboardWriteFailure::busy("占用中"))
            } else {
                Ok(())
            }
        })
        .expect("third attempt should succeed");

        assert_eq!(attempts, 3);
    }

    #[test]
    fn busy_failure_surfaces_as_busy() {
        let err = run_with_retry(&fast_config(), || Err(ClipboardWriteFailure::busy("占用中")))
            .expect_err("all attempts fail");
        assert!(matches!(err, ClipboardError::Busy(msg) if msg == "占用中"));
    }

    #[test]
    fn transient_failure_surfaces_as_write_error() {
        let err = run_with_retry(&fast_config(), || Err(ClipboardWriteFailure::transient("写入失败")))
            .expect_err("all attempts fail");
        assert!(matches!(err, ClipboardError::Write(_)));
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        let mut calls = 0;
        let config = ClipboardConfig {
            retries: 0,
            ..fast_config()
        };
        let _ = run_with_retry(&config, || {
            calls += 1;
            Err(ClipboardWriteFailure::transient("x"))
        });
        assert_eq!(calls, 1);
    }
}
