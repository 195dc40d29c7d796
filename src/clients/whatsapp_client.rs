//! 模板消息通知客户端
//!
//! 封装通知服务的令牌握手：
//! 登录（Basic 认证）拿到 access + refresh 令牌；
//! 发送遇到 401 时先刷新一次，仍然 401 或刷新失败则重新登录再发一次。

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 打卡通知模板中的字段
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFields {
    pub employee_name: String,
    pub checkin_date: String,
    pub checkin_time: String,
    pub location_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 通知发送方
///
/// 可能较慢、可能失败，调用方不在这一层重试。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, recipient_id: &str, fields: &TemplateFields) -> AppResult<()>;
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// WhatsApp 模板消息客户端
///
/// 由调用方显式创建并持有，令牌只保存在实例内部。
pub struct WhatsAppClient {
    http: Client,
    template_url: String,
    template_name: String,
    language_code: String,
    login_url: String,
    refresh_url: String,
    username: String,
    password: String,
    tokens: Mutex<Tokens>,
}

impl WhatsAppClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("无法创建通知客户端: {}", e)))?;

        Ok(Self {
            http,
            template_url: config.notify_template_url.clone(),
            template_name: config.notify_template_name.clone(),
            language_code: config.notify_language_code.clone(),
            login_url: config.notify_login_url.clone(),
            refresh_url: config.notify_refresh_url.clone(),
            username: config.notify_username.clone(),
            password: config.notify_password.clone(),
            tokens: Mutex::new(Tokens::default()),
        })
    }

    /// 构造模板消息请求体
    ///
    /// 接收人号码去掉开头的 `+`，服务端只接受纯数字的 waId。
    pub fn build_payload(&self, recipient_id: &str, fields: &TemplateFields) -> Value {
        let wa_id = recipient_id.trim().trim_start_matches('+');
        json!({
            "templateName": self.template_name,
            "languageCode": self.language_code,
            "body": {
                "map": {
                    "employee_name": { "type": "text", "text": fields.employee_name },
                    "checkin_date": { "type": "text", "text": fields.checkin_date },
                    "checkin_time": { "type": "text", "text": fields.checkin_time },
                    "checkin_location": { "type": "text", "text": fields.location_address },
                }
            },
            "header": {
                "type": "location",
                "location": {
                    "latitude": fields.latitude,
                    "longitude": fields.longitude,
                    "name": fields.location_address,
                    "address": fields.location_address,
                }
            },
            "waId": wa_id,
        })
    }

    async fn post_template(&self, payload: &Value, access: Option<&str>) -> AppResult<Response> {
        let mut request = self.http.post(&self.template_url).json(payload);
        if let Some(token) = access {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("模板消息请求失败: {}", e)))
    }

    async fn login(&self, tokens: &mut Tokens) -> AppResult<()> {
        debug!("通知服务登录: {}", self.login_url);
        let response = self
            .http
            .post(&self.login_url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("通知服务登录失败: {}", e)))?;

        if response.status().as_u16() >= 400 {
            return Err(AppError::Notification(format!(
                "通知服务认证失败: HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("无法解析登录响应: {}", e)))?;

        match (body.access_token, body.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                tokens.access = Some(access);
                tokens.refresh = Some(refresh);
                Ok(())
            }
            _ => Err(AppError::Notification("登录响应缺少令牌".into())),
        }
    }

    /// 刷新成功返回 true；没有 refresh 令牌或被拒绝时返回 false
    async fn refresh(&self, tokens: &mut Tokens) -> AppResult<bool> {
        let Some(refresh_token) = tokens.refresh.clone() else {
            return Ok(false);
        };

        let response = self
            .http
            .post(&self.refresh_url)
            .bearer_auth(&refresh_token)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("刷新令牌失败: {}", e)))?;

        if response.status().as_u16() >= 400 {
            warn!("刷新令牌被拒绝: HTTP {}", response.status().as_u16());
            *tokens = Tokens::default();
            return Ok(false);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("无法解析刷新响应: {}", e)))?;

        let Some(access) = body.access_token.filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        tokens.access = Some(access);
        if let Some(refresh) = body.refresh_token.filter(|t| !t.is_empty()) {
            tokens.refresh = Some(refresh);
        }
        Ok(true)
    }
}

#[async_trait]
impl NotificationSender for WhatsAppClient {
    async fn send(&self, recipient_id: &str, fields: &TemplateFields) -> AppResult<()> {
        let payload = self.build_payload(recipient_id, fields);

        // 整个握手期间持有锁，避免并发发送时重复登录
        let mut tokens = self.tokens.lock().await;
        if tokens.access.is_none() {
            self.login(&mut tokens).await?;
        }

        let mut response = self.post_template(&payload, tokens.access.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("模板消息返回 401，尝试刷新令牌");
            let refreshed = self.refresh(&mut tokens).await?;
            if refreshed {
                response = self.post_template(&payload, tokens.access.as_deref()).await?;
            }
            if response.status() == StatusCode::UNAUTHORIZED {
                debug!("刷新无效，重新登录");
                self.login(&mut tokens).await?;
                response = self.post_template(&payload, tokens.access.as_deref()).await?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Notification(format!(
                "模板消息发送失败: HTTP {}",
                status.as_u16()
            )));
        }

        info!("📨 通知已发送: {}", recipient_id);
        Ok(())
    }
}
