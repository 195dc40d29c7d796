use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::attendance::AttendanceAction;
use crate::models::credentials::Credentials;
use crate::models::identity::{CurrentUser, Role};
use crate::models::location::GeoLocation;
use crate::models::schedule::Schedule;

/// 一个待执行的考勤任务（TOML 文件）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceJob {
    pub user_id: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub action: AttendanceAction,
    pub credentials: Credentials,
    pub location: GeoLocation,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

fn default_role() -> Role {
    Role::User
}

fn default_timezone() -> String {
    "America/Lima".to_string()
}

fn default_active() -> bool {
    true
}

impl AttendanceJob {
    /// 校验并构造调用方身份
    pub fn current_user(&self) -> AppResult<CurrentUser> {
        CurrentUser::new(&self.user_id, &self.email, self.role)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.credentials.validate()?;
        self.location.validate()?;
        self.current_user()?;
        Ok(())
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            location: self.location.clone(),
            active: self.active,
            timezone: self.timezone.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}
