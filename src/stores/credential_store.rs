use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppResult;
use crate::models::credentials::Credentials;

/// 凭据存储
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 不存在时返回 None
    async fn get(&self, user_key: &str) -> AppResult<Option<Credentials>>;

    async fn put(&self, user_key: &str, credentials: Credentials) -> AppResult<()>;
}

/// 进程内凭据存储，用于批量任务与测试
#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user_key: &str) -> AppResult<Option<Credentials>> {
        Ok(self.entries.read().await.get(user_key).cloned())
    }

    async fn put(&self, user_key: &str, credentials: Credentials) -> AppResult<()> {
        credentials.validate()?;
        debug!("保存凭据: {}", user_key);
        self.entries
            .write()
            .await
            .insert(user_key.to_string(), credentials);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryCredentialStore::new();
        assert!(store.get("u-1").await.unwrap().is_none());

        let credentials = Credentials::new(77668171, "secret", 7040).unwrap();
        store.put("u-1", credentials.clone()).await.unwrap();
        assert_eq!(store.get("u-1").await.unwrap(), Some(credentials));
    }

    #[test]
    fn test_missing_key_blocking() {
        let store = InMemoryCredentialStore::new();
        let found = tokio_test::block_on(store.get("nadie"));
        assert!(tokio_test::assert_ok!(found).is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_credentials() {
        let store = InMemoryCredentialStore::new();
        let invalid = Credentials {
            external_user_id: 1,
            password: String::new(),
            company_id: 1,
        };
        assert!(matches!(
            store.put("u-1", invalid).await,
            Err(AppError::Validation(_))
        ));
    }
}
