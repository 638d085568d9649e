//! 文件列表与已上传文件的静态访问处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Path as UrlPath};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::storage::{Storage, StoredFile};

/// 列出上传目录下的全部文件。
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<StoredFile>>, ApiError> {
    let files = storage.list().await.map_err(|err| {
        warn!(error = ?err, "unable to scan upload directory");
        ApiError::ScanDirectory
    })?;
    info!(count = files.len(), "list files");
    Ok(JsonResponse(files))
}

/// 按名称返回已上传文件，支持单段 Range 请求。
pub async fn serve_upload(
    UrlPath(name): UrlPath<String>,
    request_headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let target = storage.resolve_stored(&name)?;
    let metadata = match fs::metadata(&target).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(ApiError::NotFound("not found".into())),
        Err(_) => return Err(ApiError::NotFound("not found".into())),
    };
    let file_size = metadata.len();
    let mime = mime_guess::from_path(&name).first_or_octet_stream();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("无效的 MIME 类型".into()))?,
    );
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(modified) = metadata.modified() {
        let value = fmt_http_date(modified);
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }

    let mut file = File::open(&target)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    if let Some((start, end)) = parse_range(request_headers.get(header::RANGE), file_size)? {
        let length = end - start + 1;
        debug!(name, start, end, length, "serving range");
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        response_headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&format!("bytes {start}-{end}/{file_size}"))
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        let stream = ReaderStream::new(file.take(length));
        return Ok((
            StatusCode::PARTIAL_CONTENT,
            response_headers,
            AxumBody::from_stream(stream),
        )
            .into_response());
    }

    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
    info!(name, size = file_size, "serving stored file");
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// 解析单段 Range 头；`bytes=a-b`、`bytes=a-`、`bytes=-n` 三种形式。
fn parse_range(
    value: Option<&HeaderValue>,
    file_size: u64,
) -> Result<Option<(u64, u64)>, ApiError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let range = value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("bytes="))
        .ok_or_else(|| ApiError::BadRequest("invalid Range header".into()))?;
    if range.contains(',') {
        return Err(ApiError::BadRequest("multiple ranges not supported".into()));
    }
    if file_size == 0 {
        return Err(ApiError::RangeNotSatisfiable(file_size));
    }

    let (start_part, end_part) = range
        .split_once('-')
        .ok_or_else(|| ApiError::BadRequest("invalid Range header".into()))?;

    let parse = |part: &str| {
        part.parse::<u64>()
            .map_err(|_| ApiError::BadRequest("invalid Range header".into()))
    };

    let (start, end) = if start_part.is_empty() {
        // 后缀形式：最后 n 个字节。
        let suffix = parse(end_part)?;
        if suffix == 0 {
            return Ok(None);
        }
        (file_size.saturating_sub(suffix), file_size - 1)
    } else {
        let start = parse(start_part)?;
        let end = if end_part.is_empty() {
            file_size - 1
        } else {
            parse(end_part)?
        };
        (start, end)
    };

    if start > end || start >= file_size {
        return Err(ApiError::RangeNotSatisfiable(file_size));
    }

    Ok(Some((start, end.min(file_size - 1))))
}

#[cfg(test)]
mod tests {
    use super::parse_range;
    use crate::error::ApiError;
    use axum::http::HeaderValue;

    fn range(value: &str, size: u64) -> Result<Option<(u64, u64)>, ApiError> {
        let header = HeaderValue::from_str(value).expect("header value");
        parse_range(Some(&header), size)
    }

    #[test]
    fn no_header_means_full_body() {
        assert!(matches!(parse_range(None, 10), Ok(None)));
    }

    #[test]
    fn bounded_range() {
        assert!(matches!(range("bytes=2-5", 10), Ok(Some((2, 5)))));
    }

    #[test]
    fn open_ended_range_runs_to_eof() {
        assert!(matches!(range("bytes=4-", 10), Ok(Some((4, 9)))));
    }

    #[test]
    fn suffix_range_takes_last_bytes() {
        assert!(matches!(range("bytes=-3", 10), Ok(Some((7, 9)))));
        assert!(matches!(range("bytes=-100", 10), Ok(Some((0, 9)))));
    }

    #[test]
    fn end_clamped_to_file_size() {
        assert!(matches!(range("bytes=8-100", 10), Ok(Some((8, 9)))));
    }

    #[test]
    fn start_past_eof_is_unsatisfiable() {
        assert!(matches!(
            range("bytes=10-12", 10),
            Err(ApiError::RangeNotSatisfiable(10))
        ));
    }

    #[test]
    fn garbage_is_bad_request() {
        assert!(matches!(
            range("bytes=a-b", 10),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(range("items=0-1", 10), Err(ApiError::BadRequest(_))));
    }
}
