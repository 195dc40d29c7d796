//! 响应校验 - 业务能力层
//!
//! 对每一步返回的 HTML 做纯函数检查。提取函数找不到元素时返回 None，
//! 只有错误信息提取是登录失败的唯一依据。

use chrono::NaiveDateTime;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::attendance::{PortalClock, UserInfo};
use crate::services::html_scan::element_text_by_id;

pub const FULL_NAME_ID: &str = "lbl_host";
pub const OBSERVED_IP_ID: &str = "lbl_latlontrab";
pub const DATE_ID: &str = "lblDateToday";
pub const TIME_ID: &str = "lblTime";
pub const ERROR_MESSAGE_ID: &str = "lbl_mensaje";

/// 表示"没有错误"的占位文本（比较前已转小写）
const ERROR_PLACEHOLDERS: [&str; 4] = ["", "\u{a0}", "&nbsp;", "label"];

/// 登录后页面上的姓名与 IP
pub fn extract_user_info(html: &str) -> Option<UserInfo> {
    let full_name = element_text_by_id(html, FULL_NAME_ID)?;
    let ip = element_text_by_id(html, OBSERVED_IP_ID)?;
    Some(UserInfo {
        full_name: full_name.trim().to_string(),
        ip: ip.trim().to_string(),
    })
}

/// 门户显示的日期与时间
pub fn extract_portal_clock(html: &str) -> Option<PortalClock> {
    let date = element_text_by_id(html, DATE_ID)?;
    let time = element_text_by_id(html, TIME_ID)?;
    Some(PortalClock {
        date: date.trim().to_string(),
        time: time.trim().to_string(),
    })
}

/// 错误信息：去空白、转小写，占位文本视为没有错误
pub fn extract_error_message(html: &str) -> Option<String> {
    let raw = element_text_by_id(html, ERROR_MESSAGE_ID)?;
    let message = raw.trim().to_lowercase();
    if ERROR_PLACEHOLDERS.contains(&message.as_str()) {
        return None;
    }
    Some(message)
}

/// 登录结果检查：错误元素有内容即认证失败
pub fn check_login(html: &str) -> AppResult<()> {
    match extract_error_message(html) {
        Some(message) => Err(AppError::Authentication(message)),
        None => Ok(()),
    }
}

/// 本机公网 IP 与门户看到的 IP 比对
///
/// 依赖运行环境：经过 NAT 或代理时两者可能不同，可通过配置关闭。
pub fn check_ip(public_ip: &str, user_info: Option<&UserInfo>) -> AppResult<()> {
    let info = user_info
        .ok_or_else(|| AppError::Authentication("无法获取用户信息".into()))?;
    if public_ip.trim() != info.ip.trim() {
        warn!(
            "IP 不一致: 本机 {} / 门户 {}",
            public_ip.trim(),
            info.ip.trim()
        );
        return Err(AppError::Authentication("IP 地址不一致".into()));
    }
    Ok(())
}

/// 本地时间减门户时间（秒），门户时间无法解析时返回 None
pub fn clock_skew_seconds(clock: &PortalClock, local_now: NaiveDateTime) -> Option<i64> {
    let server = clock.to_datetime()?;
    Some((local_now - server).num_seconds())
}

/// 时间偏差检查
///
/// 门户时间缺失或无法解析视为认证失败；`max_skew` 为 None 时只计算不拦截。
pub fn check_clock_skew(
    clock: Option<&PortalClock>,
    local_now: NaiveDateTime,
    max_skew: Option<Duration>,
) -> AppResult<i64> {
    let skew = clock
        .and_then(|c| clock_skew_seconds(c, local_now))
        .ok_or_else(|| AppError::Authentication("无法解析门户时间".into()))?;

    debug!("门户时间偏差: {} 秒", skew);

    if let Some(max) = max_skew {
        if skew.unsigned_abs() > max.as_secs() {
            return Err(AppError::Authentication(format!(
                "门户时间偏差过大: {} 秒 (允许 {} 秒)",
                skew,
                max.as_secs()
            )));
        }
    }
    Ok(skew)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn page_with_message(text: &str) -> String {
        format!(r#"<form><span id="lbl_mensaje">{}</span></form>"#, text)
    }

    #[test]
    fn test_error_message_placeholders() {
        assert_eq!(extract_error_message(&page_with_message("")), None);
        assert_eq!(extract_error_message(&page_with_message("&nbsp;")), None);
        assert_eq!(extract_error_message(&page_with_message("\u{a0}")), None);
        assert_eq!(extract_error_message(&page_with_message("Label")), None);
        assert_eq!(extract_error_message(&page_with_message("  LABEL ")), None);
        assert_eq!(extract_error_message("<p>no element</p>"), None);
    }

    #[test]
    fn test_error_message_is_trimmed_and_lowercased() {
        assert_eq!(
            extract_error_message(&page_with_message("  Contraseña Incorrecta ")).as_deref(),
            Some("contraseña incorrecta")
        );
    }

    #[test]
    fn test_check_login() {
        let result = check_login(&page_with_message("Usuario bloqueado"));
        assert!(matches!(result, Err(AppError::Authentication(m)) if m == "usuario bloqueado"));
        assert!(check_login(&page_with_message("label")).is_ok());
    }

    #[test]
    fn test_user_info_soft_failure() {
        let html = concat!(
            r#"<span id="lbl_host"> ANA PEREZ </span>"#,
            r#"<span id="lbl_latlontrab">1.2.3.4</span>"#
        );
        let info = extract_user_info(html).unwrap();
        assert_eq!(info.full_name, "ANA PEREZ");
        assert_eq!(info.ip, "1.2.3.4");
        assert!(extract_user_info(r#"<span id="lbl_host">x</span>"#).is_none());
    }

    #[test]
    fn test_check_ip() {
        let info = UserInfo {
            full_name: "x".into(),
            ip: "1.2.3.4".into(),
        };
        assert!(check_ip("1.2.3.4\n", Some(&info)).is_ok());
        assert!(check_ip("5.6.7.8", Some(&info)).is_err());
        assert!(check_ip("1.2.3.4", None).is_err());
    }

    #[test]
    fn test_clock_skew() {
        let clock = PortalClock {
            date: "05-03-2025".into(),
            time: "08:00:00".into(),
        };
        let now = NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(8, 2, 30)
            .unwrap();

        assert_eq!(clock_skew_seconds(&clock, now), Some(150));
        assert_eq!(check_clock_skew(Some(&clock), now, None).unwrap(), 150);
        assert_eq!(
            check_clock_skew(Some(&clock), now, Some(Duration::from_secs(300))).unwrap(),
            150
        );
        assert!(check_clock_skew(Some(&clock), now, Some(Duration::from_secs(60))).is_err());
        assert!(check_clock_skew(None, now, None).is_err());
    }

    #[test]
    fn test_extract_portal_clock() {
        let html = concat!(
            r#"<span id="lblDateToday">05-03-2025</span> "#,
            r#"<span id="lblTime"> 08:00:00</span>"#
        );
        let clock = extract_portal_clock(html).unwrap();
        assert_eq!(clock.time, "08:00:00");
    }
}
