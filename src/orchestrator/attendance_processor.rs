//! 单用户考勤处理器 - 编排层
//!
//! 为一个已认证的调用方执行一次打卡：
//! 取凭据 → 取排班 → 新建会话 → 运行流程 → 释放会话 → 发送通知

use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{NotificationSender, TemplateFields};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::SessionTransport;
use crate::models::attendance::{AttendanceAction, FlowResult};
use crate::models::credentials::Credentials;
use crate::models::identity::CurrentUser;
use crate::models::schedule::Schedule;
use crate::stores::{CredentialStore, ScheduleStore};
use crate::workflow::{AttendanceFlow, FlowCtx};

pub struct AttendanceProcessor {
    config: Config,
    flow: AttendanceFlow,
    credentials: Arc<dyn CredentialStore>,
    schedules: Arc<dyn ScheduleStore>,
    notifier: Option<Arc<dyn NotificationSender>>,
}

impl AttendanceProcessor {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        schedules: Arc<dyn ScheduleStore>,
        notifier: Option<Arc<dyn NotificationSender>>,
    ) -> Self {
        Self {
            flow: AttendanceFlow::new(&config),
            config,
            credentials,
            schedules,
            notifier,
        }
    }

    pub async fn process(
        &self,
        user: &CurrentUser,
        action: AttendanceAction,
    ) -> AppResult<FlowResult> {
        self.process_with_ctx(user, action, FlowCtx::new(user.id(), action))
            .await
    }

    pub(crate) async fn process_with_ctx(
        &self,
        user: &CurrentUser,
        action: AttendanceAction,
        ctx: FlowCtx,
    ) -> AppResult<FlowResult> {
        // 每次执行都重新获取，不缓存凭据
        let credentials = self
            .credentials
            .get(user.id())
            .await?
            .ok_or_else(|| AppError::Validation(format!("用户 {} 没有登记凭据", user.id())))?;

        let schedule = self
            .schedules
            .get(user.id())
            .await?
            .ok_or_else(|| AppError::Validation(format!("用户 {} 没有排班配置", user.id())))?;

        self.execute(user, action, &credentials, &schedule, ctx).await
    }

    /// 用调用方给出的凭据与排班执行一次，批量任务各自携带自己的数据
    pub(crate) async fn execute(
        &self,
        user: &CurrentUser,
        action: AttendanceAction,
        credentials: &Credentials,
        schedule: &Schedule,
        ctx: FlowCtx,
    ) -> AppResult<FlowResult> {
        if !schedule.active {
            return Err(AppError::Validation(format!("用户 {} 的排班未启用", user.id())));
        }

        let offset = self.notify_offset(schedule);
        info!(
            "{} 调用方: {} ({}, 偏移 {})",
            ctx,
            user.email(),
            schedule.timezone,
            offset.map_or_else(|| "本机时区".to_string(), |o| o.to_string())
        );

        let result = {
            // 会话只属于这一次执行，离开作用域即释放
            let transport = SessionTransport::new(&self.config)?;
            self.flow
                .run(&transport, credentials, &schedule.location, action, &ctx)
                .await?
        };

        if result.success {
            self.notify(&ctx, schedule, offset, &result).await;
        }

        Ok(result)
    }

    /// 排班写明的偏移优先，其次是门户偏移，都没有时用本机时区
    fn notify_offset(&self, schedule: &Schedule) -> Option<FixedOffset> {
        schedule.utc_offset().or_else(|| self.config.portal_offset())
    }

    /// 通知失败只记录日志，不影响打卡结果
    async fn notify(
        &self,
        ctx: &FlowCtx,
        schedule: &Schedule,
        offset: Option<FixedOffset>,
        result: &FlowResult,
    ) {
        let (Some(notifier), Some(phone)) = (&self.notifier, &schedule.phone_number) else {
            return;
        };

        let fields = template_fields(schedule, result, offset);
        if let Err(e) = notifier.send(phone, &fields).await {
            warn!("{} ⚠️ 通知发送失败: {}", ctx, e);
        }
    }
}

/// 优先使用门户凭条上的信息，没有凭条时用流程结果补齐
///
/// 凭条上的日期时间由门户给出，是权威值。回退时把流程时间换算到 `offset`，
/// 为 None 时按本机时区。
fn template_fields(
    schedule: &Schedule,
    result: &FlowResult,
    offset: Option<FixedOffset>,
) -> TemplateFields {
    let receipt = result.receipt.as_ref();
    let marked_at = match offset {
        Some(offset) => result.timestamp.with_timezone(&offset).naive_local(),
        None => result.timestamp.naive_local(),
    };
    let pick = |value: Option<&String>, fallback: String| {
        value.filter(|v| !v.is_empty()).cloned().unwrap_or(fallback)
    };

    TemplateFields {
        employee_name: pick(
            receipt.map(|r| &r.employee_name),
            result
                .user_info
                .as_ref()
                .map(|u| u.full_name.clone())
                .unwrap_or_default(),
        ),
        checkin_date: pick(
            receipt.map(|r| &r.date),
            marked_at.format("%d-%m-%Y").to_string(),
        ),
        checkin_time: pick(
            receipt.map(|r| &r.time),
            marked_at.format("%H:%M:%S").to_string(),
        ),
        location_address: schedule.location.address.clone(),
        latitude: result.submitted_location.latitude,
        longitude: result.submitted_location.longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::{AttendanceReceipt, UserInfo};
    use crate::models::identity::Role;
    use crate::models::location::GeoLocation;
    use crate::stores::{InMemoryCredentialStore, InMemoryScheduleStore};
    use chrono::{Local, TimeZone, Utc};

    fn schedule(active: bool) -> Schedule {
        Schedule {
            location: GeoLocation::new(-6.7711, -79.8431, 10.0)
                .unwrap()
                .with_address("Av. Balta 123"),
            active,
            timezone: "America/Lima".into(),
            phone_number: Some("51999888777".into()),
        }
    }

    fn flow_result(receipt: Option<AttendanceReceipt>) -> FlowResult {
        FlowResult {
            success: true,
            message: "考勤标记成功".into(),
            final_html: String::new(),
            timestamp: Local.with_ymd_and_hms(2025, 3, 5, 8, 0, 12).unwrap(),
            action: AttendanceAction::Entry,
            submitted_location: GeoLocation::new(-6.77111, -79.84312, 10.0).unwrap(),
            user_info: Some(UserInfo {
                full_name: "Ana Perez".into(),
                ip: "1.2.3.4".into(),
            }),
            clock_skew_seconds: Some(3),
            receipt,
        }
    }

    #[test]
    fn test_template_fields_fallback_to_flow_result() {
        let fields = template_fields(&schedule(true), &flow_result(None), None);
        assert_eq!(fields.employee_name, "Ana Perez");
        assert_eq!(fields.checkin_date, "05-03-2025");
        assert_eq!(fields.checkin_time, "08:00:12");
        assert_eq!(fields.location_address, "Av. Balta 123");
        assert_eq!(fields.latitude, -6.77111);
    }

    #[test]
    fn test_template_fields_prefer_receipt() {
        let receipt = AttendanceReceipt {
            employee_name: "ANA PEREZ".into(),
            time: "08:00:15".into(),
            ..AttendanceReceipt::default()
        };
        let fields = template_fields(&schedule(true), &flow_result(Some(receipt)), None);
        assert_eq!(fields.employee_name, "ANA PEREZ");
        assert_eq!(fields.checkin_time, "08:00:15");
        // 凭条日期为空时回退
        assert_eq!(fields.checkin_date, "05-03-2025");
    }

    #[test]
    fn test_template_fields_fallback_uses_offset() {
        let mut result = flow_result(None);
        result.timestamp = Utc
            .with_ymd_and_hms(2025, 3, 5, 13, 0, 12)
            .unwrap()
            .with_timezone(&Local);

        let lima = FixedOffset::west_opt(5 * 3600);
        let fields = template_fields(&schedule(true), &result, lima);
        assert_eq!(fields.checkin_date, "05-03-2025");
        assert_eq!(fields.checkin_time, "08:00:12");

        // 跨日
        let late = FixedOffset::west_opt(14 * 3600);
        let fields = template_fields(&schedule(true), &result, late);
        assert_eq!(fields.checkin_date, "04-03-2025");
        assert_eq!(fields.checkin_time, "23:00:12");
    }

    #[test]
    fn test_schedule_offset_wins_over_portal_offset() {
        let config = Config {
            portal_utc_offset_minutes: Some(60),
            ..Config::default()
        };
        let processor = AttendanceProcessor::new(
            config,
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryScheduleStore::new()),
            None,
        );

        let mut fixed = schedule(true);
        fixed.timezone = "(UTC-05:00) America/Lima".into();
        assert_eq!(
            processor.notify_offset(&fixed),
            FixedOffset::west_opt(5 * 3600)
        );
        // 只有地区名时用门户偏移
        assert_eq!(
            processor.notify_offset(&schedule(true)),
            FixedOffset::east_opt(3600)
        );
    }

    async fn processor_with(schedule: Option<Schedule>) -> AttendanceProcessor {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let schedules = Arc::new(InMemoryScheduleStore::new());
        credentials
            .put("u-1", Credentials::new(77668171, "secret", 7040).unwrap())
            .await
            .unwrap();
        if let Some(schedule) = schedule {
            schedules.put("u-1", schedule).await.unwrap();
        }
        AttendanceProcessor::new(Config::default(), credentials, schedules, None)
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let processor = processor_with(Some(schedule(true))).await;
        let user = CurrentUser::new("u-2", "b@example.com", Role::User).unwrap();
        let result = processor.process(&user, AttendanceAction::Entry).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_inactive_schedule_is_rejected() {
        let processor = processor_with(Some(schedule(false))).await;
        let user = CurrentUser::new("u-1", "a@example.com", Role::User).unwrap();
        let result = processor.process(&user, AttendanceAction::Exit).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_schedule() {
        let processor = processor_with(None).await;
        let user = CurrentUser::new("u-1", "a@example.com", Role::User).unwrap();
        let result = processor.process(&user, AttendanceAction::Entry).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
