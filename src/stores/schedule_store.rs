use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::schedule::Schedule;

/// 排班存储
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, user_key: &str) -> AppResult<Option<Schedule>>;

    async fn put(&self, user_key: &str, schedule: Schedule) -> AppResult<()>;
}

#[derive(Default)]
pub struct InMemoryScheduleStore {
    entries: RwLock<HashMap<String, Schedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get(&self, user_key: &str) -> AppResult<Option<Schedule>> {
        Ok(self.entries.read().await.get(user_key).cloned())
    }

    async fn put(&self, user_key: &str, schedule: Schedule) -> AppResult<()> {
        schedule.location.validate()?;
        self.entries
            .write()
            .await
            .insert(user_key.to_string(), schedule);
        Ok(())
    }
}
