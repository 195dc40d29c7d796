//! 会话传输 - 基础设施层
//!
//! 持有唯一的带 Cookie 的 HTTP 会话，只暴露"发一次请求"的能力

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN};
use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::form::{FormFields, HttpMethod, RawResponse};

/// 门户的回发校验会拒绝不像浏览器的请求
pub const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_ES: &str = "es-419,es;q=0.9";

/// 单次请求能力
///
/// 流程层只依赖这个 trait，测试时可以替换为脚本化的实现。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发送一次请求。GET 时字段作为查询参数，POST 时作为表单体。
    ///
    /// 连接失败/超时返回可重试的 `Network` 错误；
    /// 跟随重定向后状态码 >= 400 返回不可重试的 `Network` 错误。
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        fields: &FormFields,
    ) -> AppResult<RawResponse>;
}

/// 会话传输
///
/// 职责：
/// - 持有一个流程执行期间的 Cookie
/// - 统一 User-Agent / Origin 请求头与超时
/// - 把失败归类为统一的网络错误
///
/// 每次流程执行新建一个实例，流程结束（无论成功失败）随 drop 释放，
/// 不能在不同流程之间复用：门户把会话 Cookie 绑定到一次登录。
pub struct SessionTransport {
    client: Client,
}

impl SessionTransport {
    pub fn new(config: &Config) -> AppResult<Self> {
        let origin = origin_of(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&origin)
                .map_err(|e| AppError::Config(format!("无效的 Origin {}: {}", origin, e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_ES));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        debug!("新会话已创建 (Origin: {})", origin);

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for SessionTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        fields: &FormFields,
    ) -> AppResult<RawResponse> {
        debug!("{} {} ({} 个字段)", method, url, fields.len());

        let builder = match method {
            HttpMethod::Get if fields.is_empty() => self.client.get(url),
            HttpMethod::Get => self.client.get(url).query(fields.as_pairs()),
            HttpMethod::Post => self.client.post(url).form(fields.as_pairs()),
        };

        let response = builder.send().await.map_err(|e| {
            warn!("请求 {} 失败: {}", url, e);
            AppError::network_retryable(url, e.to_string())
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if status >= 400 {
            error!("HTTP 错误 {}: {}", status, final_url);
            return Err(AppError::http_status(final_url, status));
        }

        let body = response.text().await.map_err(|e| {
            warn!("读取响应 {} 失败: {}", final_url, e);
            AppError::network_retryable(&final_url, format!("读取响应失败: {}", e))
        })?;

        debug!("响应 {} ({} 字节)", status, body.len());

        Ok(RawResponse {
            status,
            url: final_url,
            body,
        })
    }
}

impl Drop for SessionTransport {
    fn drop(&mut self) {
        debug!("会话已释放");
    }
}

/// `scheme://host[:port]`，作为 Origin 请求头
fn origin_of(base_url: &str) -> AppResult<String> {
    let url = Url::parse(base_url)
        .map_err(|e| AppError::Config(format!("无效的门户地址 {}: {}", base_url, e)))?;
    Ok(url.origin().ascii_serialization())
}
