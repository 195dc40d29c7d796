use chrono::FixedOffset;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 考勤门户地址
    pub base_url: String,
    /// 查询本机公网 IP 的地址
    pub ip_echo_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 重试配置 ---
    pub max_retries: u32,
    pub retry_floor_secs: u64,
    pub retry_ceiling_secs: u64,
    // --- 校验配置 ---
    /// 是否比对本机公网 IP 与门户看到的 IP（NAT/代理环境下需要关闭）
    pub verify_public_ip: bool,
    /// 允许的门户时间偏差（秒），0 表示只计算不拦截
    pub max_clock_skew_secs: u64,
    /// 门户所在时区相对 UTC 的分钟偏移，未设置时使用本机时区
    pub portal_utc_offset_minutes: Option<i32>,
    /// 坐标抖动随机种子，未设置时使用系统熵
    pub jitter_seed: Option<u64>,
    // --- 批量任务 ---
    /// 任务 TOML 文件目录
    pub jobs_folder: String,
    /// 同时执行的流程数量
    pub max_concurrent_flows: usize,
    // --- 通知服务 ---
    /// 模板消息地址，为空时不发送通知
    pub notify_template_url: String,
    pub notify_template_name: String,
    pub notify_language_code: String,
    pub notify_login_url: String,
    pub notify_refresh_url: String,
    pub notify_username: String,
    pub notify_password: String,
    // --- 结果判定关键词（逗号分隔，空表示使用内置列表） ---
    pub success_keywords: Vec<String>,
    pub failure_keywords: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://movil.asisscad.cl".to_string(),
            ip_echo_url: "https://api.ipify.org".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_floor_secs: 4,
            retry_ceiling_secs: 10,
            verify_public_ip: true,
            max_clock_skew_secs: 900,
            portal_utc_offset_minutes: None,
            jitter_seed: None,
            jobs_folder: "jobs".to_string(),
            max_concurrent_flows: 4,
            notify_template_url: String::new(),
            notify_template_name: "ticket_order".to_string(),
            notify_language_code: "en".to_string(),
            notify_login_url: String::new(),
            notify_refresh_url: String::new(),
            notify_username: String::new(),
            notify_password: String::new(),
            success_keywords: Vec::new(),
            failure_keywords: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            base_url: std::env::var("APP_BASE_URL").unwrap_or(default.base_url),
            ip_echo_url: std::env::var("APP_IP_ECHO_URL").unwrap_or(default.ip_echo_url),
            request_timeout_secs: std::env::var("APP_REQUEST_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_retries: std::env::var("APP_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            retry_floor_secs: std::env::var("APP_RETRY_FLOOR_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_floor_secs),
            retry_ceiling_secs: std::env::var("APP_RETRY_CEILING_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_ceiling_secs),
            verify_public_ip: std::env::var("APP_VERIFY_PUBLIC_IP").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verify_public_ip),
            max_clock_skew_secs: std::env::var("APP_MAX_CLOCK_SKEW_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_clock_skew_secs),
            portal_utc_offset_minutes: std::env::var("APP_PORTAL_UTC_OFFSET_MINUTES").ok().and_then(|v| v.parse().ok()).or(default.portal_utc_offset_minutes),
            jitter_seed: std::env::var("APP_JITTER_SEED").ok().and_then(|v| v.parse().ok()).or(default.jitter_seed),
            jobs_folder: std::env::var("APP_JOBS_FOLDER").unwrap_or(default.jobs_folder),
            max_concurrent_flows: std::env::var("APP_MAX_CONCURRENT_FLOWS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_flows),
            notify_template_url: std::env::var("APP_NOTIFY_TEMPLATE_URL").unwrap_or(default.notify_template_url),
            notify_template_name: std::env::var("APP_NOTIFY_TEMPLATE_NAME").unwrap_or(default.notify_template_name),
            notify_language_code: std::env::var("APP_NOTIFY_LANGUAGE_CODE").unwrap_or(default.notify_language_code),
            notify_login_url: std::env::var("APP_NOTIFY_LOGIN_URL").unwrap_or(default.notify_login_url),
            notify_refresh_url: std::env::var("APP_NOTIFY_REFRESH_URL").unwrap_or(default.notify_refresh_url),
            notify_username: std::env::var("APP_NOTIFY_USERNAME").unwrap_or(default.notify_username),
            notify_password: std::env::var("APP_NOTIFY_PASSWORD").unwrap_or(default.notify_password),
            success_keywords: std::env::var("APP_SUCCESS_KEYWORDS").ok().map(|v| split_keywords(&v)).unwrap_or(default.success_keywords),
            failure_keywords: std::env::var("APP_FAILURE_KEYWORDS").ok().map(|v| split_keywords(&v)).unwrap_or(default.failure_keywords),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 0 表示不拦截
    pub fn max_clock_skew(&self) -> Option<Duration> {
        (self.max_clock_skew_secs > 0).then(|| Duration::from_secs(self.max_clock_skew_secs))
    }

    /// 门户时区偏移，超出范围时为 None
    pub fn portal_offset(&self) -> Option<FixedOffset> {
        self.portal_utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.saturating_mul(60)))
    }

    pub fn notifications_enabled(&self) -> bool {
        !self.notify_template_url.is_empty()
    }
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keywords() {
        assert_eq!(
            split_keywords(" Marcado, ok ,,REGISTRADO "),
            vec!["marcado", "ok", "registrado"]
        );
        assert!(split_keywords("").is_empty());
    }

    #[test]
    fn test_zero_skew_disables_enforcement() {
        let config = Config {
            max_clock_skew_secs: 0,
            ..Config::default()
        };
        assert!(config.max_clock_skew().is_none());
        assert_eq!(
            Config::default().max_clock_skew(),
            Some(Duration::from_secs(900))
        );
    }
}
