//! # 展开编排
//!
//! ## 设计思路
//!
//! `ReferenceExpander` 只负责流程编排，不关心资源存放在哪里。处理链路固定为：
//! 1. 快速路径：没有 `{{IMAGE:` 前缀直接返回原文，不发起任何查询
//! 2. 扫描占位符，按首次出现顺序去重；一个合法引用都没有时同样原样返回
//! 3. 所有不同 id 的查询同时发出，等待全部落定（单个失败不影响其它查询）
//! 4. 命中的资源合成 `<img>` 标签，未命中的占位符原样保留
//! 5. 单趟替换全部出现位置，然后做颜色重映射
//!
//! ## 失败语义
//!
//! - 单个资源不存在或记录损坏：记日志，占位符原样保留，其余照常替换
//! - 系统性失败（资源库不可用、整体扇出超时）：记日志，原样返回输入，
//!   绝不返回替换了一半的文档，也不向调用方抛错
//!
//! 替换只在占位符语法内查表，占位符文本从不作为模式解释。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use regex::Captures;
use serde::Serialize;

use super::codec::{REFERENCE_RE, contains_reference_prefix, find_references};
use super::{ExpanderConfig, remap_colors, synthesize_tag};
use crate::library::ResourceStore;

/// 一次展开的结果：输出文档与处理结论。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub html: String,
    pub outcome: ExpansionOutcome,
}

/// 展开结论，供调用方决定是否提示用户。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpansionOutcome {
    /// 文档中没有占位符，原样返回。
    Unchanged,
    /// 已展开。`unresolved` 为未能解析、原样保留的资源 id（按首次出现顺序）。
    Expanded {
        resolved: usize,
        unresolved: Vec<String>,
    },
    /// 系统性失败，原样返回输入。
    Aborted { reason: String },
}

impl Expansion {
    fn unchanged(html: &str) -> Self {
        Self {
            html: html.to_string(),
            outcome: ExpansionOutcome::Unchanged,
        }
    }

    fn aborted(html: &str, reason: String) -> Self {
        Self {
            html: html.to_string(),
            outcome: ExpansionOutcome::Aborted { reason },
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, ExpansionOutcome::Aborted { .. })
    }
}

/// 图片占位符展开器。
#[derive(Clone)]
pub struct ReferenceExpander {
    store: Arc<dyn ResourceStore>,
    config: ExpanderConfig,
}

impl ReferenceExpander {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_config(store, ExpanderConfig::default())
    }

    pub fn with_config(store: Arc<dyn ResourceStore>, config: ExpanderConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// 展开文档中的全部图片占位符。永不失败。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use artifact_studio::expander::ReferenceExpander;
    /// use artifact_studio::library::MemoryResourceStore;
    ///
    /// # async fn demo() {
    /// let expander = ReferenceExpander::new(Arc::new(MemoryResourceStore::new()));
    /// let html = expander.expand("<p>{{IMAGE:logo1}}</p>").await;
    /// # }
    /// ```
    pub async fn expand(&self, html: &str) -> String {
        self.expand_with_report(html).await.html
    }

    /// 与 [`expand`](Self::expand) 相同，但同时返回处理结论。
    pub async fn expand_with_report(&self, html: &str) -> Expansion {
        if !contains_reference_prefix(html) {
            return Expansion::unchanged(html);
        }

        let total_start = Instant::now();
        let ids = distinct_ids(html);
        if ids.is_empty() {
            log::debug!("🔍 含占位符前缀但没有合法引用，跳过展开");
            return Expansion::unchanged(html);
        }

        let lookup_start = Instant::now();
        let lookups = ids.iter().map(|id| self.store.fetch_by_id(id));
        let settled = match tokio::time::timeout(self.config.lookup_timeout, join_all(lookups)).await {
            Ok(settled) => settled,
            Err(_) => {
                let reason = format!(
                    "资源查询超时（{}ms，{} 个引用）",
                    self.config.lookup_timeout.as_millis(),
                    ids.len()
                );
                log::error!("❌ 图片占位符展开已放弃：{}", reason);
                return Expansion::aborted(html, reason);
            }
        };
        let lookup_elapsed = lookup_start.elapsed();

        let mut tags: HashMap<&str, String> = HashMap::with_capacity(ids.len());
        let mut unresolved = Vec::new();
        for (id, result) in ids.iter().zip(settled) {
            match result {
                Ok(Some(resource)) => {
                    tags.insert(id.as_str(), synthesize_tag(&resource));
                }
                Ok(None) => {
                    log::warn!("⚠️ 图片资源不存在，占位符原样保留 - id: {}", id);
                    unresolved.push(id.clone());
                }
                Err(err) if err.is_systemic() => {
                    log::error!("❌ 图片占位符展开已放弃：{}", err);
                    return Expansion::aborted(html, err.to_string());
                }
                Err(err) => {
                    log::warn!("⚠️ 图片资源无法使用，占位符原样保留 - id: {} 原因: {}", id, err);
                    unresolved.push(id.clone());
                }
            }
        }

        let substituted = substitute(html, &tags);
        let expanded = remap_colors(&substituted);

        log::info!(
            "✅ 图片占位符展开完成 - resolved={} unresolved={} lookup={}ms total={}ms",
            tags.len(),
            unresolved.len(),
            lookup_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Expansion {
            html: expanded,
            outcome: ExpansionOutcome::Expanded {
                resolved: tags.len(),
                unresolved,
            },
        }
    }
}

/// 按首次出现顺序去重后的资源 id。
fn distinct_ids(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    find_references(html)
        .into_iter()
        .filter(|reference| seen.insert(reference.resource_id.clone()))
        .map(|reference| reference.resource_id)
        .collect()
}

/// 单趟替换：每个匹配到的占位符查表，命中换成标签，否则原样写回。
fn substitute(html: &str, tags: &HashMap<&str, String>) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    REFERENCE_RE
        .replace_all(html, |caps: &Captures<'_>| match tags.get(&caps[1]) {
            Some(tag) => tag.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_keep_first_occurrence_order() {
        assert_eq!(
            distinct_ids("{{IMAGE:b}}{{IMAGE:a}}{{IMAGE:b}}{{IMAGE:c}}{{IMAGE:a}}"),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn substitute_replaces_every_occurrence_and_keeps_unknown_tokens() {
        let tags = HashMap::from([("x", "<img>".to_string())]);
        assert_eq!(
            substitute("A{{IMAGE:x}}B{{IMAGE:y}}C{{IMAGE:x}}", &tags),
            "A<img>B{{IMAGE:y}}C<img>"
        );
    }

    #[test]
    fn substitute_does_not_rescan_inserted_text() {
        let tags = HashMap::from([("x", "{{IMAGE:y}}".to_string()), ("y", "<img>".to_string())]);
        assert_eq!(substitute("{{IMAGE:x}}", &tags), "{{IMAGE:y}}");
    }
}
