use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.full_path(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 每次寫入用獨立的暫存檔再 rename，並行寫入不會互相覆蓋
        let tmp_path = full_path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp_path, &full_path).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        assert!(!storage.exists("ledger/state.json").await);
        storage
            .write_file("ledger/state.json", b"{\"ok\":true}")
            .await
            .unwrap();

        assert!(storage.exists("ledger/state.json").await);
        let data = storage.read_file("ledger/state.json").await.unwrap();
        assert_eq!(data, b"{\"ok\":true}");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("ledger"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("state.json")]);
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_complete_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
        let payloads: Vec<Vec<u8>> = (0..16u8)
            .map(|n| serde_json::to_vec(&vec![n; 4096]).unwrap())
            .collect();

        let mut tasks = tokio::task::JoinSet::new();
        for payload in payloads.clone() {
            let storage = storage.clone();
            tasks.spawn(async move { storage.write_file("ledger/state.json", &payload).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let data = storage.read_file("ledger/state.json").await.unwrap();
        assert!(payloads.contains(&data));
        let files = std::fs::read_dir(temp_dir.path().join("ledger")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        let err = storage.read_file("missing.json").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::EngineError::IoError(_)));
    }
}
