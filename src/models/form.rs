//! 表单快照与 HTTP 原始响应

use std::fmt;
use url::Url;

use crate::error::{AppError, AppResult};

/// 按插入顺序保存的表单字段
///
/// 覆盖已存在的字段时保留原位置，新字段追加到末尾，
/// 与浏览器提交时的字段顺序一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 编码为 application/x-www-form-urlencoded
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// 表单提交方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    /// 大小写不敏感，空值视为 GET
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_uppercase().as_str() {
            "" | "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(AppError::FormParsing(format!("不支持的表单方法: {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从一次 HTML 响应中提取的表单状态
///
/// 每一步都基于上一份快照复制出新快照再提交，不在原对象上修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub fields: FormFields,
    /// 原始 action 属性（可能是相对地址）
    pub action: String,
    pub method: HttpMethod,
}

impl FormSnapshot {
    /// 复制当前字段并覆盖/追加指定字段
    pub fn with_fields<I, K, V>(&self, overrides: I) -> FormSnapshot
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = self.fields.clone();
        for (k, v) in overrides {
            fields.insert(k, v);
        }
        FormSnapshot {
            fields,
            action: self.action.clone(),
            method: self.method,
        }
    }

    /// 以页面地址为基准解析 action，空 action 表示提交回当前页
    pub fn action_url(&self, page_url: &Url) -> AppResult<Url> {
        let action = self.action.trim();
        if action.is_empty() {
            return Ok(page_url.clone());
        }
        Ok(page_url.join(action)?)
    }
}

/// 传输层返回的原始响应
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// 跟随重定向后的最终地址
    pub url: String,
    pub body: String,
}
