use anyhow::{Context, Result};
use indexmap::IndexMap;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Timing breakdown of one request, in the sense load-testing tools use it:
/// `waiting` is time to first byte, `duration` includes reading the body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timings {
    pub waiting: Duration,
    pub duration: Duration,
}

impl Timings {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// A finished request. Transport failures are represented with status `0`
/// and `error` set rather than as an `Err`.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub timings: Timings,
    pub body: String,
    pub error: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl HttpResponse {
    /// Parsed body, `None` when it is not JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Statuses 200-399 count as expected, everything else as a failed request.
    pub fn is_failed(&self) -> bool {
        !(200..400).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, insecure: bool) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build().context("Failed to create HTTP client")?,
        })
    }

    pub async fn get(&self, url: &str, headers: &IndexMap<String, String>) -> HttpResponse {
        let bytes_sent = estimate_request_size("GET", url, headers);
        let start = Instant::now();

        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                tracing::debug!(url, error = %e, "request failed");
                return HttpResponse {
                    status: 0,
                    timings: Timings {
                        waiting: elapsed,
                        duration: elapsed,
                    },
                    error: Some(e.to_string()),
                    bytes_sent,
                    ..HttpResponse::default()
                };
            }
        };

        let waiting = start.elapsed();
        let status = response.status().as_u16();
        let header_bytes: u64 = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().len() + v.len() + 4) as u64)
            .sum();

        match response.text().await {
            Ok(body) => HttpResponse {
                status,
                timings: Timings {
                    waiting,
                    duration: start.elapsed(),
                },
                bytes_received: header_bytes + body.len() as u64,
                body,
                error: None,
                bytes_sent,
            },
            Err(e) => HttpResponse {
                status,
                timings: Timings {
                    waiting,
                    duration: start.elapsed(),
                },
                error: Some(format!("Failed to read response body: {}", e)),
                bytes_sent,
                bytes_received: header_bytes,
                ..HttpResponse::default()
            },
        }
    }
}

fn estimate_request_size(method: &str, url: &str, headers: &IndexMap<String, String>) -> u64 {
    let request_line = method.len() + url.len() + " HTTP/1.1\r\n".len() + 1;
    let header_bytes: usize = headers.iter().map(|(k, v)| k.len() + v.len() + 4).sum();
    (request_line + header_bytes + 2) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body() {
        let response = HttpResponse {
            status: 200,
            body: r#"[{"id": 1}]"#.to_string(),
            ..HttpResponse::default()
        };
        let json = response.json().unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(1));

        let html = HttpResponse {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
            ..HttpResponse::default()
        };
        assert!(html.json().is_none());
    }

    #[test]
    fn test_failed_status_ranges() {
        let with_status = |status| HttpResponse {
            status,
            ..HttpResponse::default()
        };
        assert!(!with_status(200).is_failed());
        assert!(!with_status(304).is_failed());
        assert!(with_status(404).is_failed());
        assert!(with_status(500).is_failed());
        assert!(with_status(0).is_failed());
    }

    #[test]
    fn test_request_size_estimate_counts_headers() {
        let mut headers = IndexMap::new();
        let bare = estimate_request_size("GET", "http://x/posts", &headers);
        headers.insert("Accept".to_string(), "application/json".to_string());
        let with_header = estimate_request_size("GET", "http://x/posts", &headers);
        assert_eq!(with_header - bare, ("Accept".len() + "application/json".len() + 4) as u64);
    }

    #[tokio::test]
    async fn test_connection_error_is_data() {
        let client = HttpClient::new(Duration::from_secs(2), false).unwrap();
        // Port 9 on localhost is the discard service; nothing listens there in CI
        let response = client
            .get("http://127.0.0.1:9/posts", &IndexMap::new())
            .await;
        assert_eq!(response.status, 0);
        assert!(response.error.is_some());
        assert!(response.is_failed());
    }
}
