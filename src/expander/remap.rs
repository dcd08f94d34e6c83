//! # 目标宿主颜色重映射
//!
//! 作者在深色主题下编辑，粘贴到 Gmail 撰写区后背景变回白色，深色背景/浅色文字
//! 会变得难以辨认。这里用一张固定的字面量白名单修正常见的几组颜色，
//! 不做通用的配色反转，表外颜色原样保留。
//!
//! ## 实现思路
//!
//! 用一个正则一次扫描全部 `*color: #hex` 声明，属性名整体捕获，
//! 只有 `color` 与 `background-color` 两个属性会查表（`border-color` 等原样保留）。
//! 全部规则在同一趟替换中生效，规则之间互不影响，也不存在顺序问题；
//! 表中任何输出值都不是同一属性的输入键，因此重复执行结果不变。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static COLOR_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\w-]*color)(\s*:\s*)(#[0-9a-f]{3,8})\b").expect("颜色声明正则必须可编译")
});

static BACKGROUND_RULES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("#000", "#ffffff"),
        ("#000000", "#ffffff"),
        ("#121212", "#ffffff"),
        ("#1a1a1a", "#ffffff"),
        ("#1e1e1e", "#ffffff"),
        ("#202124", "#ffffff"),
        ("#242424", "#ffffff"),
        ("#2a2a2a", "#ffffff"),
        ("#2d2d2d", "#f8f9fa"),
        ("#333333", "#f8f9fa"),
    ])
});

static FOREGROUND_RULES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("#fff", "#202124"),
        ("#ffffff", "#202124"),
        ("#fafafa", "#202124"),
        ("#f5f5f5", "#202124"),
        ("#e0e0e0", "#3c4043"),
        ("#e8eaed", "#3c4043"),
        ("#cccccc", "#5f6368"),
    ])
});

fn lookup(property: &str, hex: &str) -> Option<&'static str> {
    let table = match property.to_ascii_lowercase().as_str() {
        "background-color" => &*BACKGROUND_RULES,
        "color" => &*FOREGROUND_RULES,
        _ => return None,
    };
    table.get(hex.to_ascii_lowercase().as_str()).copied()
}

/// 对整段 HTML 应用颜色白名单。纯函数，结果确定。
pub fn remap_colors(html: &str) -> String {
    COLOR_DECL_RE
        .replace_all(html, |caps: &Captures<'_>| match lookup(&caps[1], &caps[3]) {
            Some(mapped) => format!("{}{}{}", &caps[1], &caps[2], mapped),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_dark_background_to_white() {
        assert_eq!(
            remap_colors(r#"<div style="background-color: #121212">"#),
            r#"<div style="background-color: #ffffff">"#
        );
    }

    #[test]
    fn leaves_unlisted_colors_untouched() {
        let html = r#"<p style="color: #123456; background-color:#abcdef">x</p>"#;
        assert_eq!(remap_colors(html), html);
    }

    #[test]
    fn maps_light_text_and_keeps_spacing() {
        assert_eq!(
            remap_colors("color:#FFFFFF;COLOR :  #e0e0e0"),
            "color:#202124;COLOR :  #3c4043"
        );
    }

    #[test]
    fn other_color_properties_pass_through() {
        let html = "border-color: #121212; outline-color: #ffffff; text-decoration-color: #fff";
        assert_eq!(remap_colors(html), html);
    }

    #[test]
    fn longer_hex_is_not_truncated() {
        let html = "background-color: #1212121";
        assert_eq!(remap_colors(html), html);
    }

    #[test]
    fn is_idempotent() {
        let html = "background-color: #1e1e1e; color: #f5f5f5; color: #202124; background-color: #202124";
        let once = remap_colors(html);
        assert_eq!(remap_colors(&once), once);
        assert_eq!(
            once,
            "background-color: #ffffff; color: #202124; color: #202124; background-color: #ffffff"
        );
    }
}
