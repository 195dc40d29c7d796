//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量任务处理器
//! - 加载任务目录下的 TOML 文件
//! - 把凭据与排班登记到存储
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `attendance_processor` - 单用户处理器
//! - 每次执行重新读取凭据与排班
//! - 为每次执行新建并释放会话
//! - 成功后发送通知（失败只记日志）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<AttendanceJob>)
//!     ↓
//! attendance_processor (处理一个用户的一次打卡)
//!     ↓
//! workflow::AttendanceFlow (登录 → 坐标 → 打卡)
//!     ↓
//! services (能力层：表单提取 / 校验 / 判定 / 重试)
//!     ↓
//! infrastructure (基础设施：SessionTransport)
//! ```

pub mod attendance_processor;
pub mod batch_processor;

pub use attendance_processor::AttendanceProcessor;
pub use batch_processor::{App, ProcessingStats};
