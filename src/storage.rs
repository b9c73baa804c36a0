use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

/// Where uploaded photos live. Keys are bare file names.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    /// `Ok(false)` when nothing is stored under `key`.
    async fn delete_object(&self, key: &str) -> anyhow::Result<bool>;
    fn public_url(&self, key: &str) -> String;
    /// Maps a photo URL back to its key, if the URL points into this storage.
    fn key_from_url(&self, url: &str) -> Option<String>;
}

pub(crate) fn is_safe_key(key: &str) -> bool {
    lazy_static! {
        static ref SAFE_KEY: Regex = Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]*$").unwrap();
    }
    SAFE_KEY.is_match(key)
}

/// Photos kept on local disk under `root`, served at `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>, url_prefix: &str) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PhotoStorage for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        anyhow::ensure!(is_safe_key(key), "refusing unsafe photo key `{key}`");
        let path = self.root.join(key);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write photo {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<bool> {
        if !is_safe_key(key) {
            return Ok(false);
        }
        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("delete photo {}", path.display())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.url_prefix)?
            .strip_prefix('/')
            .filter(|key| is_safe_key(key))
            .map(str::to_string)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_keys_have_no_separators_or_leading_dot() {
        assert!(is_safe_key("student_3.jpg"));
        assert!(is_safe_key("temp_ab12.webp"));
        assert!(!is_safe_key("../users.json"));
        assert!(!is_safe_key("a/b.jpg"));
        assert!(!is_safe_key(".hidden"));
        assert!(!is_safe_key(""));
    }

    #[tokio::test]
    async fn local_storage_put_delete_and_urls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path().join("uploads"), "/images/uploads/")
            .await
            .unwrap();

        storage
            .put_object("student_1.jpg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
        assert!(dir.path().join("uploads/student_1.jpg").exists());

        let url = storage.public_url("student_1.jpg");
        assert_eq!(url, "/images/uploads/student_1.jpg");
        assert_eq!(storage.key_from_url(&url).as_deref(), Some("student_1.jpg"));
        assert_eq!(storage.key_from_url("/images/default.jpg"), None);

        assert!(storage.delete_object("student_1.jpg").await.unwrap());
        assert!(!storage.delete_object("student_1.jpg").await.unwrap());
        assert!(!storage.delete_object("../escape").await.unwrap());
    }

    #[tokio::test]
    async fn local_storage_refuses_unsafe_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "/images/uploads").await.unwrap();
        assert!(storage
            .put_object("../evil.jpg", Bytes::from_static(b"x"))
            .await
            .is_err());
    }
}
