use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method, StatusCode};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;
use crate::core::{
    ProgressCallback, Transfer, TransferError, TransferReceipt, TransferRequest, TransferTarget,
};
use super::client::RemoteClient;
use super::progress_stream::ProgressStream;

/// Streams a local file to the storage service.
///
/// - create: `POST {endpoint}/folders/{container}/files`
/// - new version: `POST {endpoint}/files/{object}/versions`
pub struct HttpTransfer {
    remote: RemoteClient,
}

impl HttpTransfer {
    pub fn new(remote: RemoteClient) -> Self {
        Self { remote }
    }

    pub fn target_url(&self, target: &TransferTarget) -> Result<Url, TransferError> {
        let url = match target {
            TransferTarget::CreateIn(container) => self.remote.url(&["folders", container.as_str(), "files"]),
            TransferTarget::AppendVersion(object) => self.remote.url(&["files", &object.0, "versions"]),
        };

        url.map_err(|err| TransferError::other(err.to_string()))
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> Result<TransferReceipt, TransferError> {
        let url = self.target_url(&request.target)?;

        // 打开文件
        let file = File::open(&request.file.path).await?;
        let stream = ProgressStream::new(ReaderStream::new(file), request.file.size, progress);

        let encoded_name: String = url::form_urlencoded::byte_serialize(request.file.name.as_bytes()).collect();
        let mut builder = self.remote
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, request.file.size)
            .header("X-File-Name", encoded_name)
            .header("X-Upload-Id", request.task_id.to_string());

        // 元数据作为头部
        for (key, value) in &request.metadata {
            builder = builder.header(format!("X-Meta-{}", key), value);
        }

        let response = builder
            .body(Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let TransferTarget::AppendVersion(object) = &request.target {
                return Err(TransferError::NotFound(object.to_string()));
            }
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = if message.is_empty() {
                format!("Upload failed with status {}", status)
            } else {
                message
            };
            return Err(TransferError::rejected(status.as_u16(), message));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }
}
