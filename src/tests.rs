#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use crate::{ClientConfig, HttpTransport, TransferClient, TransferError, TransferRequest, TransferResult};

    // Answers a single request with `status` and `body`, returning the raw
    // request bytes it received.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (String, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 8192];

            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                received.extend_from_slice(&buf[..n]);
                if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&received[..header_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);

            while received.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();

            received
        });

        (address, handle)
    }

    fn client<C: Clone + Send + Sync + 'static>() -> TransferClient<C> {
        TransferClient::from_config(ClientConfig::default()).unwrap()
    }

    type Seen = Arc<Mutex<Vec<(u64, u64)>>>;

    fn recording<C: Clone + Send + Sync + 'static>(address: &str) -> (TransferRequest<C>, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let request = TransferRequest::new(address)
            .unwrap()
            .with_progress(move |r: TransferResult<C>| sink.lock().push((r.bytes_completed(), r.total_bytes())));
        (request, seen)
    }

    #[tokio::test]
    async fn test_http_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let payload = vec![7u8; 200 * 1024];
        tokio::fs::write(&path, &payload).await.unwrap();

        let (address, server) = serve_once("200 OK", b"stored").await;
        let (mut request, seen) = recording::<&'static str>(&format!("{}/upload", address));
        request.add_header("X-Token", "abc");

        let result = client().upload_file(request, &path, "upload-ctx").await.unwrap();
        let raw = server.await.unwrap();

        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(result.status_code(), StatusCode::OK);
        assert_eq!(*result.context(), "upload-ctx");
        assert!(result.total_bytes() > payload.len() as u64);
        assert_eq!(result.bytes_completed(), result.total_bytes());

        let seen = seen.lock();
        assert_eq!(seen.first(), Some(&(0, result.total_bytes())));
        assert_eq!(seen.last(), Some(&(result.total_bytes(), result.total_bytes())));
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));

        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("POST /upload HTTP/1.1"));
        assert!(text.to_lowercase().contains("x-token: abc"));
        assert!(text.contains("multipart/form-data; boundary="));
        assert!(text.contains("filename=\"payload.bin\""));
        let body_len = raw.len() - (text.find("\r\n\r\n").unwrap() + 4);
        assert_eq!(body_len as u64, result.total_bytes());
    }

    #[tokio::test]
    async fn test_http_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetched.txt");

        let (address, server) = serve_once("200 OK", b"hello world").await;
        let (request, seen) = recording::<u32>(&format!("{}/files/hello.txt", address));

        let result = client().download_file(request, &path, 42).await.unwrap();
        let raw = server.await.unwrap();

        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(*result.context(), 42);
        assert_eq!(result.total_bytes(), 11);
        assert_eq!(result.bytes_completed(), 11);
        assert_eq!(seen.lock().last(), Some(&(11, 11)));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello world");
        assert!(String::from_utf8_lossy(&raw).starts_with("GET /files/hello.txt HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let (address, server) = serve_once("404 Not Found", b"nope").await;
        let request = TransferRequest::new(&format!("{}/missing", address)).unwrap();

        let result = client().download_file(request, dir.path().join("x"), ()).await.unwrap();
        server.await.unwrap();

        assert_eq!(result.status_code(), StatusCode::NOT_FOUND);
        assert!(matches!(result.error(), Some(TransferError::ServerError { status_code: 404, .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_500() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}/gone", listener.local_addr().unwrap());
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let request = TransferRequest::new(&address).unwrap();
        let client = TransferClient::new(HttpTransport::with_client(reqwest::Client::new()));
        let result = client.download_file(request, dir.path().join("x"), ()).await.unwrap();

        assert_eq!(result.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(result.error(), Some(TransferError::Http(_))));
        assert_eq!(result.total_bytes(), 0);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_a_transfer_error() {
        let dir = tempfile::tempdir().unwrap();
        let request = TransferRequest::new("http://127.0.0.1:9/upload").unwrap();

        let result = client()
            .upload_file(request, dir.path().join("does-not-exist"), ())
            .await
            .unwrap();

        assert_eq!(result.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(result.error(), Some(TransferError::Io(_))));
    }

    #[tokio::test]
    async fn test_illegal_header_fails_at_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = TransferRequest::new("http://127.0.0.1:9/upload").unwrap();
        request.add_header("bad header", "x");

        let result = client()
            .download_file(request, dir.path().join("x"), ())
            .await
            .unwrap();

        assert_eq!(result.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(result.error(), Some(TransferError::InvalidHeaderName(_))));
    }
}
