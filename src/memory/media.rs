use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::storage::{MediaFile, MediaHost};

/// Media host that keeps uploads in memory and can be told to reject files
pub struct MemoryMediaHost {
    base_url: String,
    objects: RwLock<Vec<(String, MediaFile)>>,
    rejected: RwLock<HashSet<String>>,
}

impl Default for MemoryMediaHost {
    fn default() -> Self {
        Self::new("memory://issue-images")
    }
}

impl MemoryMediaHost {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: RwLock::new(Vec::new()),
            rejected: RwLock::new(HashSet::new()),
        }
    }

    /// Fail every upload of a file called `name`
    pub fn reject(&self, name: &str) {
        self.rejected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MediaHost for MemoryMediaHost {
    async fn upload(&self, _ctx: &RequestContext, file: &MediaFile) -> Result<String> {
        if self
            .rejected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&file.name)
        {
            return Err(Error::upload(format!("{} rejected by media host", file.name)));
        }
        if file.bytes.is_empty() {
            return Err(Error::upload(format!("{} is empty", file.name)));
        }
        let path = format!("{}.{}", Uuid::new_v4(), file.extension());
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.clone(), file.clone()));
        Ok(format!("{}/{}", self.base_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejected_files_fail_others_store() {
        let host = MemoryMediaHost::default();
        host.reject("bad.jpg");
        let files = vec![
            MediaFile::new("one.jpg", vec![1u8]),
            MediaFile::new("bad.jpg", vec![2u8]),
            MediaFile::new("three.png", vec![3u8]),
        ];
        let batch = host.upload_many(&RequestContext::anonymous(), &files).await;
        assert_eq!(batch.uploaded.len(), 2);
        assert!(batch.uploaded[1].starts_with("memory://issue-images/"));
        assert!(batch.uploaded[1].ends_with(".png"));
        assert_eq!(batch.failed[0].name, "bad.jpg");
        assert_eq!(host.len(), 2);
    }

    #[test]
    fn empty_files_are_refused() {
        let host = MemoryMediaHost::new("memory://bucket/");
        tokio_test::block_on(async {
            let ctx = RequestContext::anonymous();
            let err = host
                .upload(&ctx, &MediaFile::new("blank.jpg", Vec::<u8>::new()))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("blank.jpg is empty"));

            let url = host.upload(&ctx, &MediaFile::new("a.jpg", vec![1u8])).await.unwrap();
            assert!(url.starts_with("memory://bucket/"));
            assert!(!url.contains("//bucket//"));
        });
        assert!(!host.is_empty());
    }
}
