use anyhow::{Context, Result};
use async_trait::async_trait;
use rocksdb::{DB, Options};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Well-known key under which the single wallet record is persisted.
pub const WALLET_RECORD_KEY: &str = "alphascan-wallet";

/// Client-local durable key-value storage for serialized records.
#[async_trait]
pub trait WalletStorage: Send + Sync {
    async fn load_record(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn save_record(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl<T> WalletStorage for Arc<T>
where
    T: WalletStorage + ?Sized,
{
    async fn load_record(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load_record(key).await
    }

    async fn save_record(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).save_record(key, value).await
    }
}

#[derive(Default)]
pub struct InMemoryWalletStorage {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryWalletStorage {
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl WalletStorage for InMemoryWalletStorage {
    async fn load_record(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let guard = self.records.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn save_record(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut guard = self.records.write().await;
        guard.insert(key.to_owned(), value);
        Ok(())
    }
}

pub struct RocksDbWalletStorage {
    db: Arc<DB>,
}

impl RocksDbWalletStorage {
    pub fn open_default(path: &str) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path).with_context(|| format!("failed to open wallet db at {path}"))?;
        Ok(Self { db: Arc::new(db) })
    }

    fn key_for_record(key: &str) -> String {
        format!("wallet-record:{key}")
    }
}

#[async_trait]
impl WalletStorage for RocksDbWalletStorage {
    async fn load_record(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = Self::key_for_record(key);
        let value = self.db.get(key.as_bytes()).context("wallet db read")?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn save_record(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let key = Self::key_for_record(key);
        self.db.put(key.as_bytes(), value).context("wallet db write")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_overwrites_single_record() -> Result<()> {
        let storage = InMemoryWalletStorage::default();
        assert!(storage.load_record(WALLET_RECORD_KEY).await?.is_none());

        storage.save_record(WALLET_RECORD_KEY, b"first".to_vec()).await?;
        storage.save_record(WALLET_RECORD_KEY, b"second".to_vec()).await?;
        assert_eq!(storage.load_record(WALLET_RECORD_KEY).await?, Some(b"second".to_vec()));

        storage.clear().await;
        assert!(storage.load_record(WALLET_RECORD_KEY).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn rocksdb_record_survives_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("wallet-db");
        let path = path.to_string_lossy().into_owned();

        {
            let storage = RocksDbWalletStorage::open_default(&path)?;
            storage.save_record(WALLET_RECORD_KEY, b"{\"address\":\"0x1\"}".to_vec()).await?;
        }

        let reopened = RocksDbWalletStorage::open_default(&path)?;
        assert_eq!(
            reopened.load_record(WALLET_RECORD_KEY).await?,
            Some(b"{\"address\":\"0x1\"}".to_vec())
        );
        assert!(reopened.load_record("other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn shared_handle_sees_same_records() -> Result<()> {
        let storage = Arc::new(InMemoryWalletStorage::default());
        let handle: Arc<InMemoryWalletStorage> = Arc::clone(&storage);

        handle.save_record(WALLET_RECORD_KEY, vec![1, 2, 3]).await?;
        assert_eq!(storage.load_record(WALLET_RECORD_KEY).await?, Some(vec![1, 2, 3]));
        Ok(())
    }
}
