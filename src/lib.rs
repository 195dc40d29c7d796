//! # Asistencia Replay
//!
//! 一个用于考勤门户表单回放的 Rust 应用程序：
//! 登录 → 提交坐标 → 打卡（Entry / Exit），全部通过提取并回传隐藏表单字段完成。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（带 Cookie 的会话），只暴露能力
//! - `SessionTransport` - 每次流程执行独占一个，提供 request() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数能力，不持有会话
//! - `form_extractor` - 从 HTML 中提取表单快照
//! - `validators` - 登录错误 / 身份 / 门户时间检查
//! - `OutcomeClassifier` - 关键词判定打卡结果
//! - `RetryPolicy` - 网络错误的有界指数退避
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次打卡"的完整回放流程
//! - `FlowCtx` - 上下文封装（用户 + 动作）
//! - `AttendanceFlow` - 状态机（Start → LoggedIn → GeoSubmitted → Marked）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/attendance_processor` - 单用户处理器，取凭据、建会话、发通知
//! - `orchestrator/batch_processor` - 批量任务处理器，管理并发
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod stores;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{SessionTransport, Transport};
pub use models::{AttendanceAction, Credentials, CurrentUser, FlowResult, GeoLocation};
pub use orchestrator::{App, AttendanceProcessor};
pub use workflow::{AttendanceFlow, FlowCtx};
