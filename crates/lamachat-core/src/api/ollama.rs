use super::inference::{InferenceApi, ModelDescriptor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the Ollama REST API (`/api/tags`, `/api/generate`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Reachability check against the server root. Any HTTP answer, whatever
/// its status, means something is listening.
pub async fn probe(client: &Client, base_url: &str, timeout: Duration) -> bool {
    let url = format!("{}/", base_url.trim_end_matches('/'));
    match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => {
            debug!(status = %resp.status(), "health probe answered");
            true
        }
        Err(e) => {
            debug!("health probe failed: {e}");
            false
        }
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelDescriptor>,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Folds a `/api/generate` body into the final text. Accepts both the
/// single-object reply and newline-delimited partial objects.
#[derive(Debug, Default)]
pub struct GenerateAccumulator {
    text: String,
    chunks: usize,
    done: bool,
    streaming: bool,
}

impl GenerateAccumulator {
    pub fn push_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let chunk: GenerateChunk = serde_json::from_str(line)
            .map_err(|e| Error::MalformedResponse(format!("failed to parse response: {e}")))?;
        if let Some(err) = chunk.error {
            return Err(Error::RequestFailed(err));
        }
        let Some(piece) = chunk.response else {
            return Err(Error::MalformedResponse("missing `response` field".into()));
        };
        self.text.push_str(&piece);
        self.chunks += 1;
        match chunk.done {
            Some(true) => self.done = true,
            Some(false) => self.streaming = true,
            None => {}
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// A lone object without `done` is a complete reply. A stream must end
    /// with its `done: true` chunk, otherwise the text is cut off.
    pub fn finish(self) -> Result<String> {
        if self.chunks == 0 {
            return Err(Error::MalformedResponse("empty response body".into()));
        }
        if !self.done && (self.streaming || self.chunks > 1) {
            return Err(Error::RequestFailed(format!(
                "response stream ended after {} chunks without completing",
                self.chunks
            )));
        }
        Ok(self.text)
    }
}

fn status_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        error: String,
    }
    match serde_json::from_str::<ApiError>(body) {
        Ok(e) => format!("status {status}: {}", e.error),
        Err(_) => format!("status {status}: {}", body.trim()),
    }
}

fn take_line(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buf.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buf.drain(..=pos).collect();
    line.pop();
    Some(line)
}

#[async_trait]
impl InferenceApi for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::CatalogUnavailable(status_message(status, &body)));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("failed to read response body: {e}")))?;
        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| Error::CatalogUnavailable(format!("failed to parse response: {e}")))?;
        debug!(count = tags.models.len(), "model catalog fetched");
        Ok(tags.models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({ "model": model, "prompt": prompt, "stream": false });
        debug!(model, prompt_len = prompt.len(), "generate request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::RequestFailed(status_message(status, &text)));
        }

        let mut acc = GenerateAccumulator::default();
        let mut byte_stream = resp.bytes_stream();
        let mut leftover: Vec<u8> = Vec::new();

        'outer: while let Some(chunk) = byte_stream.next().await {
            let bytes = chunk.map_err(|e| Error::RequestFailed(e.to_string()))?;
            leftover.extend_from_slice(&bytes);
            while let Some(line) = take_line(&mut leftover) {
                acc.push_line(&String::from_utf8_lossy(&line))?;
                if acc.is_done() {
                    break 'outer;
                }
            }
        }
        if !acc.is_done() {
            acc.push_line(&String::from_utf8_lossy(&leftover))?;
        }
        acc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve_once<F, Fut>(handler: F) -> SocketAddr
    where
        F: Fn(Request<hyper::body::Incoming>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = std::result::Result<Response<Full<Bytes>>, Infallible>>
            + Send
            + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service_fn(handler))
                .await
                .ok();
        });

        addr
    }

    fn reply(status: u16, body: &'static str) -> Response<Full<Bytes>> {
        Response::builder()
            .status(status)
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    fn client(addr: SocketAddr) -> OllamaClient {
        OllamaClient::new(format!("http://{addr}"))
    }

    /// Address nothing is listening on.
    async fn dead_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    // --- catalog ---

    #[tokio::test]
    async fn list_models_preserves_server_order() {
        let addr = serve_once(|req| async move {
            assert_eq!(req.uri().path(), "/api/tags");
            Ok::<_, Infallible>(reply(
                200,
                r#"{"models":[{"name":"llama3"},{"name":"mistral"}]}"#,
            ))
        })
        .await;

        let models = client(addr).list_models().await.unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["llama3", "mistral"]);
    }

    #[tokio::test]
    async fn list_models_empty_is_not_an_error() {
        let addr =
            serve_once(|_req| async { Ok::<_, Infallible>(reply(200, r#"{"models":[]}"#)) }).await;
        let models = client(addr).list_models().await.unwrap();
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn list_models_malformed_payload_is_unavailable() {
        let addr =
            serve_once(|_req| async { Ok::<_, Infallible>(reply(200, "<html>nope</html>")) })
                .await;
        let err = client(addr).list_models().await.unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn list_models_server_error_is_unavailable() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(reply(500, r#"{"error":"registry locked"}"#))
        })
        .await;
        let err = client(addr).list_models().await.unwrap_err();
        assert!(err.to_string().contains("registry locked"));
    }

    #[tokio::test]
    async fn list_models_unreachable_is_unavailable() {
        let addr = dead_addr().await;
        let err = client(addr).list_models().await.unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
    }

    // --- generate ---

    #[tokio::test]
    async fn generate_sends_model_and_prompt() {
        let addr = serve_once(|req| async move {
            assert_eq!(req.method(), hyper::Method::POST);
            assert_eq!(req.uri().path(), "/api/generate");
            let body = req.collect().await.unwrap().to_bytes();
            let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(v["model"], "llama3");
            assert_eq!(v["prompt"], "hi");
            assert_eq!(v["stream"], false);
            Ok::<_, Infallible>(reply(200, r#"{"response":"hello","done":true}"#))
        })
        .await;

        let text = client(addr).generate("llama3", "hi").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn generate_accumulates_streamed_chunks() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(reply(
                200,
                "{\"response\":\"Hel\",\"done\":false}\n\
                 {\"response\":\"lo \",\"done\":false}\n\
                 {\"response\":\"there\",\"done\":false}\n\
                 {\"response\":\"\",\"done\":true,\"total_duration\":12}\n",
            ))
        })
        .await;

        let text = client(addr).generate("llama3", "hi").await.unwrap();
        assert_eq!(text, "Hello there");
    }

    #[tokio::test]
    async fn generate_cut_off_stream_is_request_failed() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(reply(
                200,
                "{\"response\":\"The answer \",\"done\":false}\n\
                 {\"response\":\"is not\",\"done\":false}\n",
            ))
        })
        .await;

        let err = client(addr).generate("llama3", "hi").await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)), "got {err:?}");
        assert!(err.to_string().contains("without completing"));
    }

    #[tokio::test]
    async fn generate_single_object_without_done_is_complete() {
        let addr =
            serve_once(|_req| async { Ok::<_, Infallible>(reply(200, r#"{"response":"hello"}"#)) })
                .await;
        let text = client(addr).generate("llama3", "hi").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn generate_unknown_model_is_request_failed() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(reply(404, r#"{"error":"model 'nope' not found"}"#))
        })
        .await;

        let err = client(addr).generate("nope", "hi").await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)));
        assert!(err.to_string().contains("model 'nope' not found"));
    }

    #[tokio::test]
    async fn generate_garbage_body_is_malformed() {
        let addr = serve_once(|_req| async { Ok::<_, Infallible>(reply(200, "bzzt")) }).await;
        let err = client(addr).generate("llama3", "hi").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn generate_unreachable_is_request_failed() {
        let addr = dead_addr().await;
        let err = client(addr).generate("llama3", "hi").await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)));
    }

    // --- accumulator ---

    #[test]
    fn accumulator_rejects_objects_without_response() {
        let mut acc = GenerateAccumulator::default();
        let err = acc.push_line(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn accumulator_surfaces_mid_stream_errors() {
        let mut acc = GenerateAccumulator::default();
        acc.push_line(r#"{"response":"par"}"#).unwrap();
        let err = acc.push_line(r#"{"error":"out of memory"}"#).unwrap_err();
        assert_eq!(err.to_string(), "request failed: out of memory");
    }

    #[test]
    fn accumulator_rejects_lone_unfinished_chunk() {
        let mut acc = GenerateAccumulator::default();
        acc.push_line(r#"{"response":"par","done":false}"#).unwrap();
        assert!(matches!(acc.finish(), Err(Error::RequestFailed(_))));
    }

    #[test]
    fn accumulator_without_lines_is_malformed() {
        let mut acc = GenerateAccumulator::default();
        acc.push_line("   ").unwrap();
        assert!(matches!(acc.finish(), Err(Error::MalformedResponse(_))));
    }

    // --- probe ---

    #[tokio::test]
    async fn probe_counts_any_status_as_running() {
        let addr = serve_once(|_req| async { Ok::<_, Infallible>(reply(404, "")) }).await;
        let up = probe(&Client::new(), &format!("http://{addr}"), Duration::from_secs(2)).await;
        assert!(up);
    }

    #[tokio::test]
    async fn probe_unreachable_is_false() {
        let addr = dead_addr().await;
        let up = probe(&Client::new(), &format!("http://{addr}"), Duration::from_secs(2)).await;
        assert!(!up);
    }

    #[tokio::test]
    async fn probe_hung_server_is_false_within_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept but never reply.
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let started = std::time::Instant::now();
        let up = probe(
            &Client::new(),
            &format!("http://{addr}"),
            Duration::from_millis(300),
        )
        .await;
        assert!(!up);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
