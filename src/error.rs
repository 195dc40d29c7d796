use thiserror::Error;

/// 应用程序错误类型
///
/// 核心流程只会产生三类失败：表单解析、网络、认证。
/// 其余变体属于外围协作方（配置、通知、存储、文件）。
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面中没有找到表单（致命，不重试）
    #[error("表单解析失败: {0}")]
    FormParsing(String),

    /// 网络或 HTTP 状态错误
    #[error("网络错误 ({endpoint}): {message}")]
    Network {
        endpoint: String,
        message: String,
        status: Option<u16>,
        retryable: bool,
    },

    /// 凭据错误、IP 不一致、门户时间无法解析或偏差过大（致命，不重试）
    #[error("认证失败: {0}")]
    Authentication(String),

    /// 输入数据校验失败
    #[error("参数校验失败: {0}")]
    Validation(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 通知发送失败
    #[error("通知发送失败: {0}")]
    Notification(String),

    /// 外部存储读写失败
    #[error("存储错误: {0}")]
    Persistence(String),

    /// 文件读写或解析失败
    #[error("文件错误 ({path}): {message}")]
    File { path: String, message: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 连接失败 / 超时，可重试
    pub fn network_retryable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Network {
            endpoint: endpoint.into(),
            message: message.into(),
            status: None,
            retryable: true,
        }
    }

    /// HTTP 状态码 >= 400，不重试
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        AppError::Network {
            endpoint: endpoint.into(),
            message: format!("HTTP 状态码 {}", status),
            status: Some(status),
            retryable: false,
        }
    }

    pub fn file(path: impl Into<String>, source: impl std::fmt::Display) -> Self {
        AppError::File {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// 是否允许重试策略再次尝试
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network { retryable: true, .. })
    }

    /// 外层 API 可使用的 HTTP 状态类别
    pub fn status_class(&self) -> u16 {
        match self {
            AppError::Authentication(_) => 401,
            AppError::Network { .. } => 503,
            AppError::Validation(_) | AppError::FormParsing(_) => 400,
            AppError::Config(_)
            | AppError::Notification(_)
            | AppError::Persistence(_)
            | AppError::File { .. } => 500,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();
        match err.status() {
            Some(status) => AppError::http_status(endpoint, status.as_u16()),
            None => AppError::network_retryable(endpoint, err.to_string()),
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::FormParsing(format!("无效的 URL: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
