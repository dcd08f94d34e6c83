//! # 模板模块
//!
//! ## 设计思路
//!
//! 模板是“带名称与分类的 HTML 正文”，正文里保留图片占位符，
//! 只在预览 / 复制 / 导出时交给展开器处理。
//!
//! 变量插值只识别 `{{小写标识符}}`（如 `{{first_name}}`），
//! 与图片占位符 `{{IMAGE:<id>}}` 的语法不相交；变量值里的花括号会被转义成实体，
//! 值里写的占位符文本不会变成真正的图片引用，所以两者可以按任意顺序执行。
//! 未提供的变量保持原样，方便作者发现遗漏。

use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([a-z_][a-z0-9_]*)\s*\}\}").expect("模板变量正则必须可编译")
});

/// 模板分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Email,
    Flyer,
    Signature,
}

impl TemplateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Flyer => "flyer",
            Self::Signature => "signature",
        }
    }
}

impl FromStr for TemplateCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "flyer" => Ok(Self::Flyer),
            "signature" => Ok(Self::Signature),
            other => Err(AppError::InvalidInput(format!(
                "未知模板分类：{}（可选：email / flyer / signature）",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub category: TemplateCategory,
    /// 规范正文，保留 `{{IMAGE:<id>}}` 占位符。
    pub html: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub category: TemplateCategory,
    pub html: String,
}

/// 用变量表替换正文中的 `{{name}}`，值做 HTML 转义。
pub fn interpolate(html: &str, vars: &HashMap<String, String>) -> String {
    VARIABLE_RE
        .replace_all(html, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => escape_html(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// 列出正文中出现的变量名（去重，按首次出现顺序）。
pub fn template_variables(html: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in VARIABLE_RE.captures_iter(html) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
