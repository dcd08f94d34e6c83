//! # 渲染文档构建
//!
//! 渲染宿主接收的是完整的 HTML 文档，而不是正文片段：
//! - 邮件模式：单列流式正文，宽度与常见邮件客户端一致
//! - 打印模式：正文按字面量分页标记 `<!-- pagebreak -->` 切成固定尺寸的页面盒子，
//!   配合 `@page` 规则保证打印分页与屏幕预览一致
//! - 对齐网格：纯 CSS 背景层，`@media print` 下隐藏，不会出现在打印结果中
//!
//! 这里只做字符串拼接，不解析正文结构。

use super::paper::{PageBox, RenderMode, RenderOptions, page_box};

/// 打印模式的分页标记。
pub const PAGE_BREAK_MARKER: &str = "<!-- pagebreak -->";

/// 邮件模式正文宽度（像素）。
pub const EMAIL_BODY_WIDTH_PX: u32 = 600;

const GRID_STEP_PX: u32 = 24;
const PAGE_PADDING_PX: u32 = 48;

const BASE_CSS: &str = "\
html,body{margin:0;padding:0;}\
body{background:#f1f3f4;font-family:Arial,Helvetica,sans-serif;color:#202124;}\
img{max-width:100%;height:auto;}";

/// 按分页标记切分正文。全空白的页面被丢弃，但至少保留一页。
pub fn split_pages(body: &str) -> Vec<&str> {
    let pages: Vec<&str> = body
        .split(PAGE_BREAK_MARKER)
        .filter(|chunk| !chunk.trim().is_empty())
        .collect();

    if pages.is_empty() { vec![""] } else { pages }
}

fn grid_css(selector: &str) -> String {
    format!(
        ".show-grid {selector}{{background-image:\
linear-gradient(to right,rgba(26,115,232,.12) 1px,transparent 1px),\
linear-gradient(to bottom,rgba(26,115,232,.12) 1px,transparent 1px);\
background-size:{GRID_STEP_PX}px {GRID_STEP_PX}px;}}\
@media print{{.show-grid {selector}{{background-image:none !important;}}}}"
    )
}

fn print_css(page: PageBox) -> String {
    format!(
        "@page{{size:{w}px {h}px;margin:0;}}\
.page{{box-sizing:border-box;width:{w}px;height:{h}px;padding:{PAGE_PADDING_PX}px;margin:24px auto;\
overflow:hidden;position:relative;background:#ffffff;box-shadow:0 1px 3px rgba(60,64,67,.3);\
break-after:page;page-break-after:always;}}\
.page:last-child{{break-after:auto;page-break-after:auto;}}\
@media print{{body{{background:#ffffff;}}.page{{margin:0;box-shadow:none;}}}}",
        w = page.width_px,
        h = page.height_px
    )
}

fn email_css() -> String {
    format!(
        ".email-body{{box-sizing:border-box;width:{EMAIL_BODY_WIDTH_PX}px;max-width:100%;margin:24px auto;\
padding:24px;background:#ffffff;}}"
    )
}

/// 构建完整的渲染文档。
pub fn build_document(body: &str, options: &RenderOptions) -> String {
    let body_class = if options.show_grid { " class=\"show-grid\"" } else { "" };

    let (css, content) = match options.mode {
        RenderMode::Email => {
            let css = format!("{}{}", email_css(), grid_css(".email-body"));
            (css, format!("<div class=\"email-body\">{}</div>", body))
        }
        RenderMode::Print { paper, orientation } => {
            let css = format!("{}{}", print_css(page_box(paper, orientation)), grid_css(".page"));
            let pages: String = split_pages(body)
                .into_iter()
                .map(|page| format!("<section class=\"page\">{}</section>", page))
                .collect();
            (css, pages)
        }
    };

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
<style>{BASE_CSS}{css}</style></head><body{body_class}>{content}</body></html>"
    )
}
