//! 文件上传处理器：multipart 表单中的 `video` 字段。

use axum::extract::{Extension, Multipart};
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::atomic::AtomicFile;
use crate::error::ApiError;
use crate::storage::Storage;

/// `video` 字段缺失时返回的响应体，与前端提示保持一致。
pub const NO_FILE_BODY: &str = "No file uploaded.";

pub const UPLOAD_FIELD: &str = "video";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    message: &'static str,
    file_path: String,
}

/// 接收单个视频文件并落盘，返回生成的访问路径。
pub async fn upload_video(
    Extension(storage): Extension<Arc<Storage>>,
    mut multipart: Multipart,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "skipping unexpected multipart field");
            continue;
        }

        let original_name = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
        let name = storage.generate_name(&original_name)?;
        let target = storage
            .resolve_stored(&name)
            .map_err(|_| ApiError::Internal("generated name did not resolve".into()))?;

        let mut atomic = AtomicFile::new(&target)
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        let mut total_written: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    warn!(name, error = %err, "upload body interrupted");
                    atomic.cleanup().await;
                    return Err(ApiError::BadRequest(err.to_string()));
                }
            };
            if chunk.is_empty() {
                continue;
            }
            total_written += chunk.len() as u64;
            if let Err(err) = atomic.file_mut().write_all(&chunk).await {
                atomic.cleanup().await;
                return Err(ApiError::Internal(err.to_string()));
            }
        }
        atomic
            .finalize()
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;

        info!(name, original = original_name, bytes = total_written, "file stored");
        return Ok(JsonResponse(UploadResponse {
            message: "File uploaded successfully!",
            file_path: format!("/uploads/{name}"),
        }));
    }

    Err(ApiError::BadRequest(NO_FILE_BODY.to_string()))
}
