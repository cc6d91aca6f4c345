//! Story service client over native HTTP.
use async_trait::async_trait;
use canonfall_game::{Scene, ServiceError, StoryRequest, StoryService, decode_response};
use log::debug;

#[derive(Debug, Clone)]
pub struct HttpStoryService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStoryService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl StoryService for HttpStoryService {
    async fn next_scene(&self, request: &StoryRequest) -> Result<Scene, ServiceError> {
        debug!("POST {} turn request", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        decode_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonfall_game::SessionState;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response and hand back the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}/story"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut received = Vec::new();
        let mut buf = [0_u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if received.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&received).into_owned()
    }

    #[tokio::test]
    async fn posts_request_json_and_decodes_scene() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"speaker":"Archivist","text":"Welcome.","choices":[{"id":"a","tag":"T","label":"L"}]}"#,
        )
        .await;
        let service = HttpStoryService::new(url);
        let scene = service
            .next_scene(&StoryRequest::from(&SessionState::default()))
            .await
            .expect("scene");
        assert_eq!(scene.speaker.as_deref(), Some("Archivist"));
        assert_eq!(scene.choices.len(), 1);

        let raw = server.await.expect("server");
        assert!(raw.starts_with("POST /story"));
        assert!(raw.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(raw.contains(r#""chapter":"PROLOGUE""#));
        assert!(raw.contains(r#""lastChoice":null"#));
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body() {
        let (url, server) = serve_once("502 Bad Gateway", "upstream model timed out").await;
        let service = HttpStoryService::new(url);
        let err = service
            .next_scene(&StoryRequest::from(&SessionState::default()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Status {
                status: 502,
                body: "upstream model timed out".to_string()
            }
        );
        server.await.expect("server");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let service = HttpStoryService::new(format!("http://{addr}/story"));
        let err = service
            .next_scene(&StoryRequest::from(&SessionState::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)));
    }
}
