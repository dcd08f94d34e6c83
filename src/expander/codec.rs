//! # 占位符编解码
//!
//! 占位符的唯一“协议”：`{{IMAGE:<id>}}`，`<id>` 匹配 `[A-Za-z0-9-]+`。
//! 这里只做纯文本扫描，不访问网络，调用方可以据此廉价地走快速路径。

use once_cell::sync::Lazy;
use regex::Regex;

/// 占位符前缀，快速路径只检查它是否出现。
pub const REFERENCE_PREFIX: &str = "{{IMAGE:";

/// 预编译的占位符正则。
pub(crate) static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{IMAGE:([A-Za-z0-9-]+)\}\}").expect("占位符正则必须可编译")
});

/// 文档中的一处图片引用。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// 完整占位符文本，例如 `{{IMAGE:logo-1}}`。
    pub token: String,
    pub resource_id: String,
}

/// 生成占位符。不校验 id，id 由资源库生成并保证合法。
pub fn make_reference(resource_id: &str) -> String {
    format!("{REFERENCE_PREFIX}{resource_id}}}}}")
}

/// 是否出现占位符前缀（不保证是完整合法的占位符）。
pub fn contains_reference_prefix(html: &str) -> bool {
    html.contains(REFERENCE_PREFIX)
}

/// 按出现顺序列出全部占位符（不重叠，保留重复项）。
pub fn find_references(html: &str) -> Vec<ImageReference> {
    REFERENCE_RE
        .captures_iter(html)
        .map(|caps| ImageReference {
            token: caps[0].to_string(),
            resource_id: caps[1].to_string(),
        })
        .collect()
}
