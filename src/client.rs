//! 上传服务端的 HTTP 客户端：multipart 上传与文件列表拉取。

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::queue::UploadTransport;
use crate::upload::UPLOAD_FIELD;

/// 服务端登记的文件条目，`/files` 的数组元素。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
}

impl UploadedFile {
    /// 从上传响应的 `filePath` 还原条目；最后一个路径段即存储名。
    pub fn from_file_path(file_path: String) -> Self {
        let name = file_path
            .rsplit('/')
            .next()
            .unwrap_or(file_path.as_str())
            .to_string();
        Self {
            name,
            url: file_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server rejected the upload ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponseBody {
    file_path: String,
}

/// 面向单个服务端实例的客户端；一个进程共享一个。
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// 以流式 multipart 上传单个文件，字段名与服务端约定一致。
    pub async fn upload(&self, path: &Path) -> Result<UploadedFile, TransferError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| UPLOAD_FIELD.to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let file = tokio::fs::File::open(path).await?;

        let part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
            ReaderStream::new(file),
        ))
        .file_name(file_name)
        .mime_str(mime.essence_str())?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::Rejected { status, body });
        }

        let body: UploadResponseBody = response.json().await?;
        Ok(UploadedFile::from_file_path(body.file_path))
    }

    /// 拉取已上传文件列表。
    pub async fn list(&self) -> Result<Vec<UploadedFile>, TransferError> {
        let response = self.http.get(self.endpoint("/files")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::Rejected { status, body });
        }
        Ok(response.json().await?)
    }

    /// 拼出可在浏览器中打开的绝对地址。
    pub fn file_url(&self, file: &UploadedFile) -> String {
        format!("{}{}", self.base_url, file.url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl UploadTransport for ApiClient {
    async fn upload(&self, path: &Path) -> Result<UploadedFile, TransferError> {
        ApiClient::upload(self, path).await
    }
}
