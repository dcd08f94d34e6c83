//! # 纯文本降级
//!
//! 剪贴板同时写入 HTML 与纯文本：不支持富文本的粘贴目标拿到的是这里生成的文本。
//!
//! ## 实现思路
//!
//! 先用 `scraper`（html5ever）把正文解析成 DOM 树，再深度优先遍历：
//! - 只输出文本节点；块级元素前后换行，`<br>` 换行，`<li>` 前加 `- `
//! - `<style>` / `<script>` / `<head>` 子树整体跳过，注释节点天然不输出
//! - `<img>` 输出其 `alt` 文本
//! - 源码中的连续空白按 HTML 规则折叠为一个空格
//!
//! 属性值里的 `>`、未闭合标签、实体解码都由解析器处理。

use scraper::{ElementRef, Html, Node};

const BLOCK_TAGS: &[&str] = &[
    "div", "section", "article", "header", "footer", "ul", "ol", "tr", "pre", "center", "hr",
];
const PARAGRAPH_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "table", "blockquote"];
const SKIPPED_TAGS: &[&str] = &["style", "script", "head", "title", "noscript", "template"];

/// 将 HTML 转为适合纯文本粘贴的文本。
pub fn html_to_plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    walk(document.root_element(), &mut out);
    finish(&out)
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    open_element(element, out);
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, out);
                }
            }
            _ => {}
        }
    }
    close_element(name, out);
}

fn open_element(element: ElementRef<'_>, out: &mut String) {
    match element.value().name() {
        "br" => {
            trim_trailing_spaces(out);
            out.push('\n');
        }
        "li" => {
            ensure_line_break(out);
            out.push_str("- ");
        }
        "img" => {
            if let Some(alt) = element.value().attr("alt").map(str::trim) {
                if !alt.is_empty() {
                    push_space(out);
                    out.push_str(alt);
                }
            }
        }
        n if PARAGRAPH_TAGS.contains(&n) || BLOCK_TAGS.contains(&n) => ensure_line_break(out),
        _ => {}
    }
}

fn close_element(name: &str, out: &mut String) {
    match name {
        "li" => ensure_line_break(out),
        "td" | "th" => push_space(out),
        n if PARAGRAPH_TAGS.contains(&n) => {
            ensure_line_break(out);
            out.push('\n');
        }
        n if BLOCK_TAGS.contains(&n) => ensure_line_break(out),
        _ => {}
    }
}

fn push_text(out: &mut String, raw: &str) {
    for c in raw.chars() {
        if c == '\u{a0}' {
            out.push(' ');
        } else if c.is_whitespace() {
            push_space(out);
        } else {
            out.push(c);
        }
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
        out.push(' ');
    }
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

fn ensure_line_break(out: &mut String) {
    trim_trailing_spaces(out);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn finish(out: &str) -> String {
    let mut result = String::with_capacity(out.len());
    let mut blank_run = 0;

    for line in out.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            result.push('\n');
        } else {
            blank_run = 0;
            result.push_str(line);
            result.push('\n');
        }
    }

    result.trim().to_string()
}
