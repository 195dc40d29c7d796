//! 考勤回放流程 - 流程层
//!
//! 核心职责：定义"一次打卡"的完整回放流程
//!
//! 流程顺序（严格串行，每一步依赖上一步的页面）：
//! 1. 查询本机公网 IP（独立旁路请求）
//! 2. 打开门户首页 → 填写账号 → 提交登录 → 检查错误信息 → 比对 IP
//! 3. 填写抖动后的坐标 → 提交 → 检查门户时间偏差
//! 4. 回发 Entry/Exit → 判定结果 → 解析凭条
//!
//! 任何一步失败都会中止整个流程，流程内部不做整步重试，
//! 重试只发生在单次传输调用外层的 RetryPolicy 中。

use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::Transport;
use crate::models::attendance::{AttendanceAction, FlowResult};
use crate::models::credentials::Credentials;
use crate::models::form::{FormFields, FormSnapshot, HttpMethod, RawResponse};
use crate::models::location::GeoLocation;
use crate::services::form_extractor;
use crate::services::geo_jitter::jittered_point;
use crate::services::receipt::extract_receipt;
use crate::services::validators;
use crate::services::{OutcomeClassifier, RetryPolicy};
use crate::workflow::flow_ctx::FlowCtx;

// 门户固定的字段名
pub const FIELD_COMPANY_ID: &str = "txt_id_empresa";
pub const FIELD_USER_ID: &str = "txt_id_usuario";
pub const FIELD_PASSWORD: &str = "txt_pass";
pub const FIELD_LATITUDE: &str = "txt_lat";
pub const FIELD_LONGITUDE: &str = "txt_lon";
pub const FIELD_HIDDEN_LATITUDE: &str = "hf_lat";
pub const FIELD_HIDDEN_LONGITUDE: &str = "hf_lon";
pub const FIELD_EVENT_TARGET: &str = "__EVENTTARGET";

// 回发目标
pub const TARGET_LOGIN: &str = "lnk_ingreso";
pub const TARGET_PROCEED: &str = "lnk_proceso";

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    LoggedIn,
    GeoSubmitted,
    /// 终态：成功回发了打卡动作（结果可能仍被判定为失败）
    Marked,
    /// 终态：任意一步出错
    Failed,
}

/// 考勤回放流程
///
/// - 只描述一次流程执行的步骤顺序
/// - 不持有会话资源，传输层由调用方为每次执行单独创建
/// - 不保存跨执行的可变状态，可以在多个并发执行间共享
pub struct AttendanceFlow {
    base_url: String,
    ip_echo_url: String,
    verify_public_ip: bool,
    max_clock_skew: Option<Duration>,
    portal_offset: Option<FixedOffset>,
    jitter_seed: Option<u64>,
    retry: RetryPolicy,
    classifier: OutcomeClassifier,
}

impl AttendanceFlow {
    pub fn new(config: &Config) -> Self {
        let portal_offset = config.portal_offset();
        if let (Some(minutes), None) = (config.portal_utc_offset_minutes, portal_offset) {
            warn!("⚠️ 无效的门户时区偏移 {} 分钟，改用本机时区", minutes);
        }

        Self {
            base_url: config.base_url.clone(),
            ip_echo_url: config.ip_echo_url.clone(),
            verify_public_ip: config.verify_public_ip,
            max_clock_skew: config.max_clock_skew(),
            portal_offset,
            jitter_seed: config.jitter_seed,
            retry: RetryPolicy::from_config(config),
            classifier: OutcomeClassifier::from_config(config),
        }
    }

    /// 替换结果分类策略
    pub fn with_classifier(mut self, classifier: OutcomeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// 执行一次完整流程
    ///
    /// 失败时返回带类型的错误（解析/网络/认证），不返回部分结果。
    pub async fn run<T: Transport + ?Sized>(
        &self,
        transport: &T,
        credentials: &Credentials,
        location: &GeoLocation,
        action: AttendanceAction,
        ctx: &FlowCtx,
    ) -> AppResult<FlowResult> {
        let mut state = FlowState::Start;
        info!("{} 🚀 开始考勤流程", ctx);

        let outcome = self
            .run_steps(transport, credentials, location, action, ctx, &mut state)
            .await;

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("{} ❌ 流程在 {:?} 阶段失败: {}", ctx, state, e);
                state = FlowState::Failed;
                debug!("{} 流程状态: {:?}", ctx, state);
                Err(e)
            }
        }
    }

    async fn run_steps<T: Transport + ?Sized>(
        &self,
        transport: &T,
        credentials: &Credentials,
        location: &GeoLocation,
        action: AttendanceAction,
        ctx: &FlowCtx,
        state: &mut FlowState,
    ) -> AppResult<FlowResult> {
        // ========== 旁路: 本机公网 IP ==========
        let public_ip = if self.verify_public_ip {
            Some(self.fetch_public_ip(transport).await?)
        } else {
            None
        };

        // ========== 步骤 1: 登录 ==========
        let login_page = self
            .send(transport, "打开登录页", HttpMethod::Get, &self.base_url, &FormFields::new())
            .await?;
        let login_form = form_extractor::extract(&login_page.body)?.with_fields([
            (FIELD_COMPANY_ID, credentials.company_id.to_string()),
            (FIELD_USER_ID, credentials.external_user_id.to_string()),
            (FIELD_PASSWORD, credentials.password.clone()),
            (FIELD_EVENT_TARGET, TARGET_LOGIN.to_string()),
        ]);

        let logged_in = self
            .submit(transport, "提交登录", &login_form, &login_page.url)
            .await?;
        validators::check_login(&logged_in.body)?;

        let user_info = validators::extract_user_info(&logged_in.body);
        if let Some(public_ip) = &public_ip {
            validators::check_ip(public_ip, user_info.as_ref())?;
        }
        *state = FlowState::LoggedIn;
        info!(
            "{} ✓ 登录成功 ({})",
            ctx,
            user_info
                .as_ref()
                .map(|u| u.full_name.as_str())
                .unwrap_or("未知用户")
        );

        // ========== 步骤 2: 提交坐标 ==========
        let (latitude, longitude) = {
            let mut rng = match self.jitter_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            jittered_point(
                location.latitude,
                location.longitude,
                location.radius_meters,
                &mut rng,
            )
        };
        debug!("{} 抖动后坐标: ({}, {})", ctx, latitude, longitude);

        let geo_form = form_extractor::extract(&logged_in.body)?.with_fields([
            (FIELD_LATITUDE, latitude.to_string()),
            (FIELD_LONGITUDE, longitude.to_string()),
            (FIELD_HIDDEN_LATITUDE, latitude.to_string()),
            (FIELD_HIDDEN_LONGITUDE, longitude.to_string()),
            (FIELD_EVENT_TARGET, TARGET_PROCEED.to_string()),
        ]);

        let geo_page = self
            .submit(transport, "提交坐标", &geo_form, &logged_in.url)
            .await?;
        let clock = validators::extract_portal_clock(&geo_page.body);
        let skew =
            validators::check_clock_skew(clock.as_ref(), self.local_now(), self.max_clock_skew)?;
        *state = FlowState::GeoSubmitted;
        info!("{} ✓ 坐标已提交 (门户时间偏差 {} 秒)", ctx, skew);

        // ========== 步骤 3: 打卡 ==========
        let mark_form = form_extractor::extract(&geo_page.body)?
            .with_fields([(FIELD_EVENT_TARGET, action.event_target())]);

        let final_page = self
            .submit(transport, "提交打卡", &mark_form, &geo_page.url)
            .await?;
        *state = FlowState::Marked;

        let (success, message) = self.classifier.classify(&final_page.body);
        let receipt = extract_receipt(&final_page.body);
        if success {
            info!("{} ✅ {}", ctx, message);
        } else {
            warn!("{} ⚠️ {}", ctx, message);
        }

        Ok(FlowResult {
            success,
            message,
            final_html: final_page.body,
            timestamp: Local::now(),
            action,
            submitted_location: GeoLocation {
                latitude,
                longitude,
                ..location.clone()
            },
            user_info,
            clock_skew_seconds: Some(skew),
            receipt,
        })
    }

    async fn fetch_public_ip<T: Transport + ?Sized>(&self, transport: &T) -> AppResult<String> {
        let response = self
            .send(transport, "查询公网 IP", HttpMethod::Get, &self.ip_echo_url, &FormFields::new())
            .await?;
        let ip = response.body.trim().to_string();
        if ip.is_empty() {
            return Err(AppError::Network {
                endpoint: self.ip_echo_url.clone(),
                message: "公网 IP 响应为空".into(),
                status: Some(response.status),
                retryable: false,
            });
        }
        debug!("本机公网 IP: {}", ip);
        Ok(ip)
    }

    /// 按表单声明的 action/method 提交
    async fn submit<T: Transport + ?Sized>(
        &self,
        transport: &T,
        step: &str,
        form: &FormSnapshot,
        page_url: &str,
    ) -> AppResult<RawResponse> {
        let page_url = Url::parse(page_url)?;
        let target = form.action_url(&page_url)?;
        debug!("{}: {} {} ({} 个字段)", step, form.method, target, form.fields.len());
        self.send(transport, step, form.method, target.as_str(), &form.fields)
            .await
    }

    /// 单次传输调用，外层包重试
    async fn send<T: Transport + ?Sized>(
        &self,
        transport: &T,
        step: &str,
        method: HttpMethod,
        url: &str,
        fields: &FormFields,
    ) -> AppResult<RawResponse> {
        self.retry
            .run(step, || transport.request(method, url, fields))
            .await
    }

    /// 与门户时间比较用的本地时间
    fn local_now(&self) -> NaiveDateTime {
        match self.portal_offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}
