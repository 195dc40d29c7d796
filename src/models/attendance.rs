//! 考勤动作与流程结果

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};
use crate::models::location::GeoLocation;

/// 考勤动作，对应门户固定的回发目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceAction {
    /// 上班打卡
    Entry,
    /// 下班打卡
    Exit,
}

impl AttendanceAction {
    /// `__EVENTTARGET` 的取值
    pub fn event_target(self) -> &'static str {
        match self {
            AttendanceAction::Entry => "lnk_entrada",
            AttendanceAction::Exit => "lnk_salida",
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "entry" => Ok(AttendanceAction::Entry),
            "exit" => Ok(AttendanceAction::Exit),
            other => Err(AppError::Validation(format!("不支持的考勤动作: {}", other))),
        }
    }
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceAction::Entry => write!(f, "entry"),
            AttendanceAction::Exit => write!(f, "exit"),
        }
    }
}

/// 登录后页面上显示的身份信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub full_name: String,
    /// 门户看到的客户端 IP
    pub ip: String,
}

/// 门户页面上显示的日期 (`DD-MM-YYYY`) 与时间 (`HH:MM:SS`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalClock {
    pub date: String,
    pub time: String,
}

impl PortalClock {
    /// 解析为本地无时区时间，任一部分无法解析时返回 None
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%d-%m-%Y").ok()?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S").ok()?;
        Some(date.and_time(time))
    }
}

/// 打卡成功后门户展示的凭条
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceReceipt {
    pub company: String,
    pub company_tax_id: String,
    pub address: String,
    pub employee_name: String,
    pub employee_tax_id: String,
    pub date: String,
    pub time: String,
    pub option: String,
    pub latitude: String,
    pub longitude: String,
    pub hash_code: String,
}

/// 一次流程执行的最终结果，核心层不做持久化
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    pub success: bool,
    pub message: String,
    pub final_html: String,
    pub timestamp: DateTime<Local>,
    pub action: AttendanceAction,
    /// 实际提交的（抖动后的）坐标
    pub submitted_location: GeoLocation,
    pub user_info: Option<UserInfo>,
    /// 本地时间减门户时间（秒）
    pub clock_skew_seconds: Option<i64>,
    pub receipt: Option<AttendanceReceipt>,
}
