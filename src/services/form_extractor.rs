//! 表单提取 - 业务能力层
//!
//! 只负责"从 HTML 中读出表单"，不关心流程

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::form::{FormFields, FormSnapshot, HttpMethod};
use crate::services::html_scan;

/// 提取文档中第一个 `<form>` 的字段、action 与 method
///
/// - 只收集有 `name` 的 `<input>`，缺少 `value` 时记为空字符串
/// - 脚本、样式和 textarea 里出现的 `<input>` 不算字段
/// - method 统一大写，缺省为 GET
/// - 没有 `<form>` 时返回 `FormParsing` 错误
pub fn extract(html: &str) -> AppResult<FormSnapshot> {
    let html = html_scan::strip_raw_text(&html_scan::strip_comments(html));

    let (form, inner) = html_scan::first_element(&html, "form")
        .ok_or_else(|| AppError::FormParsing("页面中没有找到表单".into()))?;

    let mut fields = FormFields::new();
    for input in html_scan::tags(inner).filter(|t| t.name == "input") {
        let Some(name) = input.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        fields.insert(name, input.attr("value").unwrap_or(""));
    }

    let action = form.attr("action").unwrap_or("").to_string();
    let method = HttpMethod::parse(form.attr("method").unwrap_or("GET"))?;

    debug!(
        "表单解析完成: {} 个字段, action={:?}, method={}",
        fields.len(),
        action,
        method
    );

    Ok(FormSnapshot {
        fields,
        action,
        method,
    })
}
