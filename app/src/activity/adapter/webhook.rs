use std::time::Duration;

use anyhow::Context as _;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;

use super::{DeliveryResponse, NotificationSink};
use crate::activity::NotificationPayload;

/// Posts payloads as JSON to a Home Assistant webhook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: ClientWithMiddleware,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        reqwest::Url::parse(url).with_context(|| format!("Invalid webhook url {}", url))?;
        let client = HttpClientConfig::new(token).with_timeout(timeout).new_tracing_client()?;

        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

impl NotificationSink for WebhookSink {
    #[tracing::instrument(name = "deliver webhook", skip(self), fields(url = %self.url))]
    async fn deliver(&self, payload: &NotificationPayload) -> anyhow::Result<DeliveryResponse> {
        tracing::debug!("Posting {}", serde_json::to_string(payload)?);

        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(DeliveryResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::activity::{Action, EntityId};

    //Answers exactly one request and hands back the raw request body
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/webhook/mic", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            request
        });

        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);

                if body.len() >= content_length {
                    return body.to_string();
                }
            }
        }

        String::new()
    }

    fn payload() -> NotificationPayload {
        let id: EntityId = "input_boolean.mic_active".parse().unwrap();
        NotificationPayload::new(&id, Action::TurnOn)
    }

    #[tokio::test]
    async fn posts_payload_as_json() {
        let (url, server) = serve_once("200 OK", "").await;
        let sink = WebhookSink::new(&url, None, Duration::from_secs(5)).unwrap();

        let response = sink.deliver(&payload()).await.unwrap();
        let request_body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            request_body,
            json!({
                "service": "input_boolean",
                "entity_id": "input_boolean.mic_active",
                "action": "turn_on"
            })
        );
    }

    #[tokio::test]
    async fn returns_error_status_and_body() {
        let (url, server) = serve_once("500 Internal Server Error", "error").await;
        let sink = WebhookSink::new(&url, None, Duration::from_secs(5)).unwrap();

        let response = sink.deliver(&payload()).await.unwrap();
        server.await.unwrap();

        assert_eq!(
            response,
            DeliveryResponse {
                status: 500,
                body: "error".to_string()
            }
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(WebhookSink::new("not a url", None, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/webhook/mic", listener.local_addr().unwrap());
        drop(listener);

        let sink = WebhookSink::new(&url, None, Duration::from_secs(2)).unwrap();

        assert!(sink.deliver(&payload()).await.is_err());
    }
}
