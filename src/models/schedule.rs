use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::models::location::GeoLocation;

/// 用户的考勤排班配置（来自排班存储）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub location: GeoLocation,
    pub active: bool,
    /// 地区名（`America/Lima`）或固定偏移（`UTC-05:00`、`(GMT-05:00) America/Lima`）
    pub timezone: String,
    /// 通知接收人，为空时不发送通知
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Schedule {
    /// 时区字段中写明的固定偏移
    ///
    /// 只有地区名时返回 None，由调用方决定回退到哪个时区。
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.timezone
            .split_whitespace()
            .map(|part| part.trim_matches(|c| c == '(' || c == ')'))
            .find_map(parse_offset)
    }
}

/// 识别 `UTC`、`GMT`、`Z`、`UTC-5`、`GMT+05:30`、`-0500` 这类写法
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let upper = raw.to_ascii_uppercase();
    let rest = match upper.strip_prefix("UTC").or_else(|| upper.strip_prefix("GMT")) {
        Some("") => return FixedOffset::east_opt(0),
        Some(rest) => rest,
        None if upper == "Z" => return FixedOffset::east_opt(0),
        None => upper.as_str(),
    };

    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };

    let number = |s: &str| {
        (!s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_digit()))
            .then(|| s.parse::<i32>().ok())
            .flatten()
    };
    let (hours, minutes) = (number(hours)?, number(minutes)?);
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(timezone: &str) -> Schedule {
        Schedule {
            location: GeoLocation::new(-6.7711, -79.8431, 10.0).unwrap(),
            active: true,
            timezone: timezone.into(),
            phone_number: None,
        }
    }

    fn offset_secs(timezone: &str) -> Option<i32> {
        schedule(timezone).utc_offset().map(|o| o.local_minus_utc())
    }

    #[test]
    fn test_fixed_offsets() {
        assert_eq!(offset_secs("UTC-05:00"), Some(-5 * 3600));
        assert_eq!(offset_secs("(GMT-05:00) America/Lima"), Some(-5 * 3600));
        assert_eq!(offset_secs("utc+5"), Some(5 * 3600));
        assert_eq!(offset_secs("+0530"), Some(5 * 3600 + 30 * 60));
        assert_eq!(offset_secs("UTC"), Some(0));
    }

    #[test]
    fn test_region_names_have_no_offset() {
        assert_eq!(offset_secs("America/Lima"), None);
        assert_eq!(offset_secs(""), None);
        assert_eq!(offset_secs("UTC+25"), None);
        assert_eq!(offset_secs("GMT-05:75"), None);
    }
}
