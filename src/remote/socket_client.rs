use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use hyper::Request;
use hyper_util::rt::TokioIo;
use log::{debug, error};
use serde_json::Value;
use std::path::PathBuf;
use tokio::net::UnixStream;
use tokio::runtime::{Builder, Runtime};

use super::client_trait::ContainerApi;
use super::types::{Method, Response};
use crate::configuration::Config;
use crate::error_handling::types::ContainerError;

/// Version prefix of every API path.
pub const API_VERSION: &str = "1.0";

/// `ContainerApi` implementation speaking HTTP/1.1 over the API unix socket.
///
/// Each request opens its own connection. The client owns a single-threaded
/// runtime and blocks on it, so callers stay synchronous.
pub struct SocketClient {
    socket: PathBuf,
    runtime: Runtime,
}

impl SocketClient {
    pub fn new(config: &Config) -> Result<Self, ContainerError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            socket: config.socket_path.clone(),
            runtime,
        })
    }

    fn uri(path: &str) -> String {
        format!("/{}/{}", API_VERSION, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Bytes, ContainerError> {
        let stream = UnixStream::connect(&self.socket).await.map_err(|e| {
            ContainerError::Transport(format!(
                "failed to connect to {}: {}",
                self.socket.display(),
                e
            ))
        })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ContainerError::Transport(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("API connection closed: {}", e);
            }
        });

        let builder = Request::builder()
            .method(method.as_str())
            .uri(Self::uri(path))
            .header(HOST, "lxd");
        let request = match payload {
            Some(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .header(CONTENT_LENGTH, bytes.len())
                .body(Full::new(Bytes::from(bytes))),
            None => builder.body(Full::new(Bytes::new())),
        }
        .map_err(|e| ContainerError::Transport(format!("failed to build request: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| ContainerError::Transport(format!("failed to send request: {}", e)))?;
        let status = response.status();

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ContainerError::Transport(format!("failed to read response: {}", e)))?
            .to_bytes();
        debug!("{} {} answered {}", method, path, status);
        Ok(body)
    }
}

impl ContainerApi for SocketClient {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ContainerError> {
        let payload = body.map(serde_json::to_vec).transpose()?;

        debug!("{} {}", method, path);
        let raw = self
            .runtime
            .block_on(self.send(method, path, payload))
            .map_err(|e| {
                error!("{} {} failed: {}", method, path, e);
                e
            })?;

        let response: Response = serde_json::from_slice(&raw).map_err(|e| {
            error!("Undecodable answer to {} {}: {}", method, path, e);
            ContainerError::InvalidResponse(e.to_string())
        })?;

        response.into_result(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Reads one HTTP request (head and body) off `stream`.
    fn read_request(stream: &mut impl Read) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&raw);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(raw).unwrap()
    }

    /// Answers one connection per entry of `answers` with the given status and
    /// body, then returns the raw requests it received.
    fn serve(listener: UnixListener, answers: Vec<(u16, &'static str)>) -> JoinHandle<Vec<String>> {
        thread::spawn(move || {
            answers
                .into_iter()
                .map(|(status, body)| {
                    let (mut stream, _) = listener.accept().unwrap();
                    let request = read_request(&mut stream);
                    write!(
                        stream,
                        "HTTP/1.1 {} Answer\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    )
                    .unwrap();
                    request
                })
                .collect()
        })
    }

    fn client_for(dir: &TempDir) -> (SocketClient, PathBuf) {
        let socket = dir.path().join("unix.socket");
        let config = Config {
            socket_path: socket.clone(),
            ..Config::default()
        };
        (SocketClient::new(&config).unwrap(), socket)
    }

    fn with_server(answers: Vec<(u16, &'static str)>) -> (TempDir, SocketClient, JoinHandle<Vec<String>>) {
        let dir = TempDir::new().unwrap();
        let (client, socket) = client_for(&dir);
        let server = serve(UnixListener::bind(socket).unwrap(), answers);
        (dir, client, server)
    }

    #[test]
    fn test_request_line_and_body() {
        let (_dir, client, server) = with_server(vec![(
            202,
            r#"{"type":"async","operation":"/1.0/operations/42"}"#,
        )]);

        let response = client
            .put("containers/one-3", &json!({"devices": {}}))
            .unwrap();
        assert_eq!(response.operation, "/1.0/operations/42");

        let requests = server.join().unwrap();
        let request = &requests[0];
        assert!(request.starts_with("PUT /1.0/containers/one-3 HTTP/1.1\r\n"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with("\r\n\r\n{\"devices\":{}}"));
    }

    #[test]
    fn test_get_sends_no_body() {
        let (_dir, client, server) =
            with_server(vec![(200, r#"{"type":"sync","metadata":["/1.0/containers/one-1"]}"#)]);

        let response = client.get("containers").unwrap();
        assert_eq!(response.metadata, json!(["/1.0/containers/one-1"]));

        let request = &server.join().unwrap()[0];
        assert!(request.starts_with("GET /1.0/containers HTTP/1.1\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_error_envelopes() {
        let (_dir, client, server) = with_server(vec![
            (404, r#"{"type":"error","error":"not found","error_code":404}"#),
            (500, r#"{"type":"error","error":"database is locked","error_code":500}"#),
        ]);

        assert!(client.get("containers/missing").unwrap_err().is_not_found());
        assert_eq!(client.get("containers/broken").unwrap_err().code(), Some(500));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_socket_is_a_transport_error() {
        let dir = TempDir::new().unwrap();
        let (client, _) = client_for(&dir);

        assert!(matches!(
            client.get("containers/one-1"),
            Err(ContainerError::Transport(_))
        ));
    }

    #[test]
    fn test_undecodable_answer() {
        let (_dir, client, server) = with_server(vec![(200, "<html>")]);

        assert!(matches!(
            client.get("containers/garbled"),
            Err(ContainerError::InvalidResponse(_))
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_wait_on_operations() {
        let (_dir, client, server) = with_server(vec![
            (200, r#"{"type":"sync","metadata":{"id":"ok","status":"Success","status_code":200}}"#),
            (
                200,
                r#"{"type":"sync","metadata":{"id":"bad","status":"Failure","status_code":400,"err":"no rootfs"}}"#,
            ),
            (200, r#"{"type":"sync","metadata":{"id":"slow","status":"Running","status_code":103}}"#),
        ]);
        let ten = Some(Duration::from_secs(10));

        client
            .wait(&Response::asynchronous("/1.0/operations/ok"), ten)
            .unwrap();

        let err = client
            .wait(&Response::asynchronous("/1.0/operations/bad"), None)
            .unwrap_err();
        assert_eq!(err.code(), Some(400));
        assert!(err.to_string().contains("no rootfs"));

        assert!(matches!(
            client.wait(&Response::asynchronous("/1.0/operations/slow"), ten),
            Err(ContainerError::Timeout(_))
        ));

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /1.0/operations/ok/wait?timeout=10 HTTP/1.1"));
        assert!(requests[1].starts_with("GET /1.0/operations/bad/wait?timeout=-1 HTTP/1.1"));
    }

    #[test]
    fn test_wait_on_sync_response_is_immediate() {
        let dir = TempDir::new().unwrap();
        let (client, _) = client_for(&dir);

        client.wait(&Response::sync(json!({})), None).unwrap();
    }
}
