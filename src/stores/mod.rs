//! 外部协作方：凭据存储与排班存储
//!
//! 核心只依赖这里的 trait，真实的数据库/密钥服务由部署方实现。

pub mod credential_store;
pub mod schedule_store;

pub use credential_store::{CredentialStore, InMemoryCredentialStore};
pub use schedule_store::{InMemoryScheduleStore, ScheduleStore};
