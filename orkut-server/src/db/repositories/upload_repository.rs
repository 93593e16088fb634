use anyhow::{Context, Result};

use orkut_types::Upload;

use crate::db::DbPool;

pub struct UploadRepository {
    pool: DbPool,
}

impl UploadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record a stored file. `stored_path` is the on-disk location, `upload.url` the public one.
    pub fn create(&self, upload: &Upload, stored_path: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO uploads (id, user_id, file_name, content_type, size_bytes, stored_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                upload.id.to_string(),
                upload.user_id.to_string(),
                &upload.file_name,
                &upload.content_type,
                upload.size_bytes,
                stored_path,
                upload.created_at.to_rfc3339(),
            ),
        )
        .context("Failed to record upload")?;
        Ok(())
    }
}

/// Public URL for a stored file: `/uploads/<file name>`
pub fn public_url(stored_path: &str) -> String {
    let name = std::path::Path::new(stored_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/uploads/{}", name)
}
