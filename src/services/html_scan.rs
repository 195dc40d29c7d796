//! 基于正则的轻量 HTML 扫描
//!
//! 只覆盖门户页面用到的几种操作：查找元素、读取属性、
//! 按 id 取文本、取整页可见文本。不处理同名元素嵌套。

use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("Invalid tag regex")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("Invalid attribute regex")
});

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")
        .expect("Invalid script regex")
});

// 内容不按标记解析的元素
static RAW_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<textarea\b.*?</textarea\s*>")
        .expect("Invalid raw text regex")
});

static ANY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("Invalid tag regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);")
        .expect("Invalid entity regex")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// 门户页面上会出现的命名实体（西语重音、空格等）
static NAMED_ENTITIES: phf::Map<&'static str, char> = phf_map! {
    "amp" => '&',
    "lt" => '<',
    "gt" => '>',
    "quot" => '"',
    "apos" => '\'',
    "nbsp" => '\u{a0}',
    "aacute" => 'á',
    "eacute" => 'é',
    "iacute" => 'í',
    "oacute" => 'ó',
    "uacute" => 'ú',
    "Aacute" => 'Á',
    "Eacute" => 'É',
    "Iacute" => 'Í',
    "Oacute" => 'Ó',
    "Uacute" => 'Ú',
    "ntilde" => 'ñ',
    "Ntilde" => 'Ñ',
    "uuml" => 'ü',
    "Uuml" => 'Ü',
    "iexcl" => '¡',
    "iquest" => '¿',
    "ordf" => 'ª',
    "ordm" => 'º',
    "deg" => '°',
    "copy" => '©',
};

/// 一个开始标签
#[derive(Debug, Clone)]
pub struct Tag {
    /// 小写标签名
    pub name: String,
    /// 小写属性名 → 已解码的属性值
    pub attrs: Vec<(String, String)>,
    /// 标签在文档中的字节区间
    pub start: usize,
    pub end: usize,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// class 属性包含全部给定类名
    pub fn has_classes(&self, classes: &str) -> bool {
        let own: Vec<&str> = self.attr("class").unwrap_or("").split_whitespace().collect();
        classes.split_whitespace().all(|c| own.contains(&c))
    }
}

/// 去掉 HTML 注释，避免注释里的标签被误识别
pub fn strip_comments(html: &str) -> String {
    COMMENT_RE.replace_all(html, "").into_owned()
}

/// 删除 `<script>`、`<style>`、`<textarea>` 整个元素，其中的标签只是文本
pub fn strip_raw_text(html: &str) -> String {
    RAW_TEXT_RE.replace_all(html, "").into_owned()
}

/// 按文档顺序列出所有开始标签
pub fn tags(html: &str) -> impl Iterator<Item = Tag> + '_ {
    TAG_RE.captures_iter(html).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?.as_str().to_lowercase();
        let raw_attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        Some(Tag {
            name,
            attrs: parse_attributes(raw_attrs),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// 解析标签属性；无值属性记为空字符串，重复属性以第一次出现为准
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for caps in ATTR_RE.captures_iter(raw) {
        let Some(name) = caps.get(1) else { continue };
        let name = name.as_str().to_lowercase();
        if attrs.iter().any(|(k, _)| *k == name) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default();
        attrs.push((name, value));
    }
    attrs
}

/// 从 `from` 开始查找 `</name>`，返回其字节区间
fn find_closing(html: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let re = Regex::new(&format!(r"(?i)</\s*{}\s*>", regex::escape(name))).ok()?;
    re.find_at(html, from).map(|m| (m.start(), m.end()))
}

/// 元素的内部 HTML；缺少结束标签时取到文档末尾
pub fn inner_html<'a>(html: &'a str, tag: &Tag) -> &'a str {
    match find_closing(html, &tag.name, tag.end) {
        Some((close_start, _)) => &html[tag.end..close_start],
        None => &html[tag.end..],
    }
}

/// 文档中第一个指定名称的元素及其内部 HTML
pub fn first_element<'a>(html: &'a str, name: &str) -> Option<(Tag, &'a str)> {
    let tag = tags(html).find(|t| t.name == name)?;
    let inner = inner_html(html, &tag);
    Some((tag, inner))
}

/// 所有指定名称的元素
pub fn elements<'a>(html: &'a str, name: &str) -> Vec<(Tag, &'a str)> {
    tags(html)
        .filter(|t| t.name == name)
        .map(|t| {
            let inner = inner_html(html, &t);
            (t, inner)
        })
        .collect()
}

/// 按 id 查找元素并返回其文本（未去除首尾空白）
pub fn element_text_by_id(html: &str, id: &str) -> Option<String> {
    let html = strip_comments(html);
    let tag = tags(&html).find(|t| t.attr("id") == Some(id))?;
    Some(text_content(inner_html(&html, &tag)))
}

/// 去掉标签后的文本，实体已解码
pub fn text_content(fragment: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(fragment, "");
    let without_tags = ANY_TAG_RE.replace_all(&without_scripts, "");
    decode_entities(&without_tags)
}

/// 整页可见文本：去掉注释、脚本、样式和标签，空白折叠为单个空格
pub fn visible_text(html: &str) -> String {
    let html = strip_comments(html);
    let without_scripts = SCRIPT_STYLE_RE.replace_all(&html, " ");
    let without_tags = ANY_TAG_RE.replace_all(&without_scripts, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// 解码 HTML 实体，未知实体原样保留
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                NAMED_ENTITIES.get(body).copied()
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
