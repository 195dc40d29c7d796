//! 批量考勤处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是二进制程序的入口，负责批量任务的加载与并发调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建存储、通知客户端与单用户处理器
//! 2. **批量加载**：扫描任务目录下的 TOML 文件（`Vec<AttendanceJob>`）
//! 3. **写入存储**：把任务中的凭据与排班登记到内存存储（供单用户接口查询）
//! 4. **并发控制**：使用 Semaphore 限制同时执行的流程数量
//! 5. **全局统计**：汇总所有任务的执行结果
//!
//! ## 设计特点
//!
//! - **流程隔离**：每个任务在处理器内部新建自己的会话，互不共享 Cookie
//! - **数据隔离**：每个任务使用自己文件里的凭据与排班，同一用户的多个任务互不覆盖
//! - **向下委托**：单个任务交给 `AttendanceProcessor`

use anyhow::Result;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{NotificationSender, WhatsAppClient};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{load_all_jobs, AttendanceJob};
use crate::orchestrator::attendance_processor::AttendanceProcessor;
use crate::stores::{CredentialStore, InMemoryCredentialStore, InMemoryScheduleStore, ScheduleStore};
use crate::utils::logging;
use crate::workflow::FlowCtx;

/// 应用主结构
pub struct App {
    config: Config,
    credentials: Arc<InMemoryCredentialStore>,
    schedules: Arc<InMemoryScheduleStore>,
    processor: Arc<AttendanceProcessor>,
}

/// 处理统计
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total: usize,
    pub success: usize,
    /// 流程完成但结果被判定为失败
    pub rejected: usize,
    /// 流程出错
    pub failed: usize,
    /// 任务本身无效（如排班未启用），没有发起请求
    pub invalid: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let credentials = Arc::new(InMemoryCredentialStore::new());
        let schedules = Arc::new(InMemoryScheduleStore::new());

        let notifier: Option<Arc<dyn NotificationSender>> = if config.notifications_enabled() {
            Some(Arc::new(WhatsAppClient::new(&config)?))
        } else {
            info!("📭 未配置通知服务，跳过通知");
            None
        };

        let processor = Arc::new(AttendanceProcessor::new(
            config.clone(),
            credentials.clone(),
            schedules.clone(),
            notifier,
        ));

        Ok(Self {
            config,
            credentials,
            schedules,
            processor,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待处理的任务...");
        let jobs = load_all_jobs(&self.config.jobs_folder).await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_jobs_loaded(jobs.len(), self.config.max_concurrent_flows);

        self.register_jobs(&jobs).await?;
        let stats = self.process_all_jobs(jobs).await;

        logging::print_final_stats(&stats);

        Ok(stats)
    }

    /// 把任务中的凭据和排班写入存储
    async fn register_jobs(&self, jobs: &[AttendanceJob]) -> Result<()> {
        let mut seen = HashSet::new();
        for job in jobs {
            if !seen.insert(job.user_id.as_str()) {
                warn!(
                    "⚠️ 用户 {} 有多个任务，存储中保留最后一个 ({})",
                    job.user_id,
                    job.file_path.as_deref().unwrap_or("?")
                );
            }
            self.credentials
                .put(&job.user_id, job.credentials.clone())
                .await?;
            self.schedules.put(&job.user_id, job.schedule()).await?;
        }
        Ok(())
    }

    async fn process_all_jobs(&self, jobs: Vec<AttendanceJob>) -> ProcessingStats {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_flows.max(1)));
        let total = jobs.len();

        let handles = jobs.into_iter().enumerate().map(|(idx, job)| {
            let job_index = idx + 1;
            let semaphore = semaphore.clone();
            let processor = self.processor.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                let user = job.current_user()?;
                let ctx = FlowCtx::new(&job.user_id, job.action).with_job_index(job_index);
                let result = processor
                    .execute(
                        &user,
                        job.action,
                        &job.credentials,
                        &job.schedule(),
                        ctx.clone(),
                    )
                    .await;
                logging::log_flow_result(&ctx, &result);
                Ok::<bool, anyhow::Error>(result?.success)
            });
            async move { (job_index, handle.await) }
        });

        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (job_index, outcome) in join_all(handles).await {
            match outcome {
                Ok(Ok(true)) => stats.success += 1,
                Ok(Ok(false)) => stats.rejected += 1,
                Ok(Err(e)) => match e.downcast_ref::<AppError>() {
                    Some(AppError::Validation(_)) => stats.invalid += 1,
                    _ => stats.failed += 1,
                },
                Err(e) => {
                    error!("[任务 #{}] 任务执行失败: {}", job_index, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}
