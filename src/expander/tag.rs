//! # 图片标签合成
//!
//! 由资源记录生成自包含的 `<img>` 标签：
//! - 载荷为空或损坏：输出内联“图片损坏”SVG，保证文档结构完整
//! - 载荷缺少 `data:` 前缀：按 MIME（缺省 `image/png`）补齐
//! - `alt` 取资源名称并转义，不能借引号跳出属性
//! - `onerror` 一次性切换到同一张内联 SVG，不依赖任何外部脚本；
//!   严格清洗 HTML 的宿主会直接去掉该属性，退化为普通的图片损坏图标
//!
//! 本模块的函数从不失败，也从不返回空字符串。

use base64::{Engine as _, engine::general_purpose};
use once_cell::sync::Lazy;

use crate::library::ImageResource;
use crate::template::escape_html;

const BROKEN_IMAGE_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="80" viewBox="0 0 120 80">"##,
    r##"<rect x="0.5" y="0.5" width="119" height="79" fill="#f1f3f4" stroke="#dadce0"/>"##,
    r##"<path d="M38 58l15-19 10 12 8-9 13 16z" fill="#bdc1c6"/>"##,
    r##"<circle cx="77" cy="30" r="6" fill="#bdc1c6"/>"##,
    r##"</svg>"##,
);

const BROKEN_IMAGE_WIDTH: u32 = 120;
const BROKEN_IMAGE_HEIGHT: u32 = 80;

/// 邮件客户端友好的内联样式。
const IMG_STYLE: &str = "border:0;outline:none;text-decoration:none;max-width:100%;height:auto;";

/// “图片损坏”占位图的 Data URI（Base64 编码，不含任何引号）。
pub static BROKEN_IMAGE_DATA_URI: Lazy<String> = Lazy::new(|| {
    format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(BROKEN_IMAGE_SVG)
    )
});

fn onerror_attribute() -> String {
    format!("this.onerror=null;this.src='{}';", BROKEN_IMAGE_DATA_URI.as_str())
}

fn dimension_attributes(width: Option<u32>, height: Option<u32>) -> String {
    let mut attrs = String::new();
    if let Some(w) = width.filter(|w| *w > 0) {
        attrs.push_str(&format!(" width=\"{w}\""));
    }
    if let Some(h) = height.filter(|h| *h > 0) {
        attrs.push_str(&format!(" height=\"{h}\""));
    }
    attrs
}

fn alt_text(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "Image unavailable".to_string()
    } else {
        // 花括号也被转义，名称里的占位符文本不会在下一次展开时被再次替换
        escape_html(trimmed)
    }
}

/// 生成“图片损坏”占位标签。
pub fn broken_image_tag(alt: &str) -> String {
    format!(
        r#"<img src="{}" alt="{}" width="{}" height="{}" style="{}">"#,
        BROKEN_IMAGE_DATA_URI.as_str(),
        alt_text(alt),
        BROKEN_IMAGE_WIDTH,
        BROKEN_IMAGE_HEIGHT,
        IMG_STYLE
    )
}

/// 由资源记录合成 `<img>` 标签。
pub fn synthesize_tag(resource: &ImageResource) -> String {
    let Some(src) = resource.normalized_payload() else {
        log::warn!("🧩 资源载荷为空或损坏，使用占位图 - id: {}", resource.id);
        return broken_image_tag(&resource.name);
    };

    format!(
        r#"<img src="{}" alt="{}"{} style="{}" onerror="{}">"#,
        src,
        alt_text(&resource.name),
        dimension_attributes(resource.width, resource.height),
        IMG_STYLE,
        onerror_attribute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ImageCategory;

    fn resource(payload: &str) -> ImageResource {
        ImageResource {
            id: "logo1".to_string(),
            name: "Acme Logo".to_string(),
            description: None,
            payload: payload.to_string(),
            mime_type: Some("image/png".to_string()),
            category: ImageCategory::Logo,
            width: Some(200),
            height: Some(80),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn prefixes_bare_payload() {
        let tag = synthesize_tag(&resource("iVBORw0KGgo="));

        assert!(tag.starts_with(r#"<img src="data:image/png;base64,iVBORw0KGgo=""#));
        assert!(tag.contains(r#"alt="Acme Logo""#));
        assert!(tag.contains(r#" width="200" height="80""#));
    }

    #[test]
    fn escapes_quotes_in_alt() {
        let mut r = resource("AAAA");
        r.name = r#"Say "cheese" & <smile>"#.to_string();
        let tag = synthesize_tag(&r);

        assert!(tag.contains(r#"alt="Say &quot;cheese&quot; &amp; &lt;smile&gt;""#));
    }

    #[test]
    fn omits_missing_or_zero_dimensions() {
        let mut r = resource("AAAA");
        r.width = None;
        r.height = Some(0);
        let tag = synthesize_tag(&r);

        assert!(!tag.contains(" width="));
        assert!(!tag.contains(" height="));
    }

    #[test]
    fn empty_payload_yields_broken_placeholder() {
        let tag = synthesize_tag(&resource(""));

        assert!(tag.starts_with(r#"<img src="data:image/svg+xml;base64,"#));
        assert!(tag.contains(r#"alt="Acme Logo""#));
        assert!(!tag.contains("onerror"));
    }

    #[test]
    fn malformed_payload_yields_broken_placeholder() {
        let tag = synthesize_tag(&resource("not base64 <at all>"));
        assert!(tag.contains(BROKEN_IMAGE_DATA_URI.as_str()));
    }

    #[test]
    fn onerror_falls_back_to_inline_svg() {
        let tag = synthesize_tag(&resource("AAAA"));
        let expected = format!(r#"onerror="this.onerror=null;this.src='{}';""#, BROKEN_IMAGE_DATA_URI.as_str());

        assert!(tag.contains(&expected));
        assert!(!tag.contains("<script"));
    }

    #[test]
    fn broken_image_data_uri_has_no_quotes() {
        assert!(!BROKEN_IMAGE_DATA_URI.contains('"'));
        assert!(!BROKEN_IMAGE_DATA_URI.contains('\''));
    }

    #[test]
    fn alt_cannot_smuggle_a_reference() {
        let mut r = resource("AAAA");
        r.name = "{{IMAGE:other}}".to_string();
        let tag = synthesize_tag(&r);

        assert!(!tag.contains("{{IMAGE:"));
        assert!(tag.contains(r#"alt="&#123;&#123;IMAGE:other&#125;&#125;""#));
    }

    #[test]
    fn blank_name_still_gets_alt_text() {
        let tag = broken_image_tag("  ");
        assert!(tag.contains(r#"alt="Image unavailable""#));
    }
}
