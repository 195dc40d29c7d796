use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// 门户登录凭据
///
/// 每次流程执行都从凭据存储重新获取，流程结束即丢弃。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub external_user_id: u64,
    pub password: String,
    pub company_id: u64,
}

impl Credentials {
    pub fn new(
        external_user_id: u64,
        password: impl Into<String>,
        company_id: u64,
    ) -> AppResult<Self> {
        let credentials = Self {
            external_user_id,
            password: password.into(),
            company_id,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.external_user_id == 0 {
            return Err(AppError::Validation("用户编号必须大于 0".into()));
        }
        if self.company_id == 0 {
            return Err(AppError::Validation("公司编号必须大于 0".into()));
        }
        if self.password.trim().is_empty() {
            return Err(AppError::Validation("密码不能为空".into()));
        }
        Ok(())
    }
}

// 不输出密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("external_user_id", &self.external_user_id)
            .field("password", &"***")
            .field("company_id", &self.company_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rules() {
        assert!(Credentials::new(77668171, "secret", 7040).is_ok());
        assert!(Credentials::new(0, "secret", 7040).is_err());
        assert!(Credentials::new(1, "  ", 7040).is_err());
        assert!(Credentials::new(1, "secret", 0).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new(1, "hunter2", 2).unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
    }
}
