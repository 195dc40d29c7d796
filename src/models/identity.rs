use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// 调用方角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Service,
}

impl Role {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "service" => Ok(Role::Service),
            other => Err(AppError::Validation(format!("未知角色: {}", other))),
        }
    }
}

/// 已认证的调用方身份
///
/// 只在认证边界构造一次，之后以只读引用向下传递。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    id: String,
    email: String,
    role: Role,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> AppResult<Self> {
        let id = id.into();
        let email = email.into();
        if id.trim().is_empty() {
            return Err(AppError::Validation("用户 ID 不能为空".into()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation(format!("邮箱格式不正确: {}", email)));
        }
        Ok(Self { id, email, role })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl fmt::Display for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.id, self.email)
    }
}
