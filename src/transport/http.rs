use std::future;
use std::io;
use std::pin::pin;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;
use crate::config::ClientConfig;
use crate::core::{Headers, ProgressSink, Result, TransferError, Transport, TransportRequest};
use super::progress_stream::ProgressStream;

/// `reqwest` backed file transport.
///
/// Uploads are sent as `multipart/form-data` with a single `file` part, so
/// the reported total includes the multipart framing. Downloads stream the
/// response body straight to disk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    read_buffer_size: usize,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(Self {
            client: builder.build()?,
            read_buffer_size: config.read_buffer_size.max(1),
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            read_buffer_size: ClientConfig::default().read_buffer_size,
        }
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        map.append(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
    }
    Ok(map)
}

fn check_status(status: StatusCode, action: &str) -> Result<()> {
    if status.is_client_error() || status.is_server_error() {
        return Err(TransferError::server_error(
            status.as_u16(),
            format!("{} failed with status {}", action, status),
        ));
    }
    Ok(())
}

struct Multipart {
    boundary: String,
    preamble: Bytes,
    epilogue: Bytes,
}

impl Multipart {
    fn new(file_name: &str) -> Self {
        let boundary = format!("------------------------{}", Uuid::new_v4().simple());
        let preamble = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary,
            file_name.replace('"', "%22"),
        );
        let epilogue = format!("\r\n--{}--\r\n", boundary);

        Self {
            boundary,
            preamble: Bytes::from(preamble),
            epilogue: Bytes::from(epilogue),
        }
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn overhead(&self) -> u64 {
        (self.preamble.len() + self.epilogue.len()) as u64
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload_file(&self, request: TransportRequest, progress: ProgressSink) -> Result<()> {
        let headers = header_map(&request.headers)?;

        let file = File::open(&request.local_path).await?;
        let file_size = file.metadata().await?.len();

        let file_name = request
            .local_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file");
        let multipart = Multipart::new(file_name);
        let total_bytes = multipart.overhead() + file_size;

        let parts = stream::once(future::ready(Ok::<_, io::Error>(multipart.preamble.clone())))
            .chain(ReaderStream::with_capacity(file, self.read_buffer_size))
            .chain(stream::once(future::ready(Ok(multipart.epilogue.clone()))));

        progress.report(0, total_bytes);
        let body = Body::wrap_stream(ProgressStream::new(parts, progress, Some(total_bytes)));

        debug!(address = %request.address, file_size, total_bytes, "Sending upload");
        let response = self
            .client
            .request(request.method, request.address)
            .headers(headers)
            .header(CONTENT_TYPE, multipart.content_type())
            .header(CONTENT_LENGTH, total_bytes)
            .body(body)
            .send()
            .await?;

        check_status(response.status(), "Upload")
    }

    async fn download_file(&self, request: TransportRequest, progress: ProgressSink) -> Result<()> {
        let headers = header_map(&request.headers)?;

        let response = self
            .client
            .request(request.method, request.address)
            .headers(headers)
            .send()
            .await?;
        check_status(response.status(), "Download")?;

        let total_bytes = response.content_length();
        debug!(?total_bytes, path = %request.local_path.display(), "Receiving download");

        let mut file = File::create(&request.local_path).await?;
        progress.report(0, total_bytes.unwrap_or(0));

        let mut body = pin!(ProgressStream::new(response.bytes_stream(), progress, total_bytes));
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}
