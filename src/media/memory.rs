use std::sync::Mutex;

use async_trait::async_trait;

use super::{ImageHost, MediaError, UploadFile};
use crate::db::models::BlogImage;

#[derive(Default)]
struct Recorded {
    uploaded: Vec<String>,
    deleted: Vec<String>,
    fail_uploads_after: Option<usize>,
    fail_deletes: bool,
}

/// Image host double that records every call.
#[derive(Default)]
pub struct MemoryImageHost {
    inner: Mutex<Recorded>,
}

impl MemoryImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` uploads succeed, then fail every later one.
    pub fn fail_uploads_after(&self, n: usize) {
        self.inner.lock().unwrap().fail_uploads_after = Some(n);
    }

    pub fn fail_deletes(&self) {
        self.inner.lock().unwrap().fail_deletes = true;
    }

    /// Public ids of successful uploads, in call order.
    pub fn uploaded(&self) -> Vec<String> {
        self.inner.lock().unwrap().uploaded.clone()
    }

    /// Public ids passed to `delete`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, file: &UploadFile) -> Result<BlogImage, MediaError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .fail_uploads_after
            .is_some_and(|n| inner.uploaded.len() >= n)
        {
            return Err(MediaError::Upstream {
                status: 500,
                body: "upload rejected".to_string(),
            });
        }
        let public_id = format!("blog-images/{}", inner.uploaded.len() + 1);
        inner.uploaded.push(public_id.clone());
        Ok(BlogImage {
            url: format!("https://images.test/{public_id}/{}", file.file_name),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().unwrap();
        inner.deleted.push(public_id.to_string());
        if inner.fail_deletes {
            return Err(MediaError::Upstream {
                status: 500,
                body: "destroy rejected".to_string(),
            });
        }
        Ok(())
    }
}
