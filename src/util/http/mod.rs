use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde_json::Value;

use crate::logging;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// 以 JSON 交換資料的最小 HTTP 能力，報價抓取只依賴這個介面
#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// Performs a GET request and parses the body as JSON.
    async fn get_json(&self, url: &str, headers: Option<header::HeaderMap>) -> Result<Value>;

    /// Performs a form encoded POST request and parses the body as JSON.
    async fn post_form_json(
        &self,
        url: &str,
        headers: Option<header::HeaderMap>,
        params: &[(&str, &str)],
    ) -> Result<Value>;
}

/// 以 reqwest 實作的 [`JsonTransport`]
#[derive(Default, Clone, Copy)]
pub struct HttpTransport;

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get_json(&self, url: &str, headers: Option<header::HeaderMap>) -> Result<Value> {
        get_json(url, headers).await
    }

    async fn post_form_json(
        &self,
        url: &str,
        headers: Option<header::HeaderMap>,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        post_form_json(url, headers, params).await
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// Timeouts are left at the transport defaults.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .gzip(true)
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and parses the response body as JSON.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to.
/// * `headers`: An optional set of headers to include with the request.
///
/// # Returns
///
/// * `Result<Value>`: The parsed body, or an error if the request fails,
///   the status is not a success or the body is not JSON.
pub async fn get_json(url: &str, headers: Option<header::HeaderMap>) -> Result<Value> {
    let res = send(Method::GET, url, headers, None::<fn(_) -> _>).await?;
    parse_json(url, res).await
}

/// Performs an HTTP POST request with form data and parses the response body as JSON.
pub async fn post_form_json(
    url: &str,
    headers: Option<header::HeaderMap>,
    params: &[(&str, &str)],
) -> Result<Value> {
    let res = send(
        Method::POST,
        url,
        headers,
        Some(|rb: RequestBuilder| rb.form(params)),
    )
    .await?;
    parse_json(url, res).await
}

async fn parse_json(url: &str, res: Response) -> Result<Value> {
    let url = redact_url(url);
    let body = res
        .text()
        .await
        .map_err(|e| anyhow!("Error reading response body from {}: {}", url, e.without_url()))?;

    serde_json::from_str(&body)
        .map_err(|e| anyhow!("Error parsing response JSON from {} because {:?}", url, e))
}

/// Sends a single HTTP request. There is no retry; the next refresh cycle
/// is the retry.
///
/// # Errors
///
/// Returns an `Err` when the transport fails or the response status is not a success.
async fn send(
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Response> {
    let visit_log = format!("{}:{}", method, redact_url(url));
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) if response.status().is_success() => {
            logging::debug_file_async(format!("{} {} ms", visit_log, elapsed));
            Ok(response)
        }
        Ok(response) => Err(anyhow!(
            "Invalid status code <{}> from {}",
            response.status().as_u16(),
            visit_log
        )),
        Err(why) => Err(anyhow!(
            "Failed to send {} because {:?}. {} ms",
            visit_log,
            why.without_url(),
            elapsed
        )),
    }
}

/// 遮蔽路徑中的 Telegram bot token(`/bot{id}:{secret}/`)，避免寫進日誌
fn redact_url(url: &str) -> String {
    url.split('/')
        .map(|segment| match segment.strip_prefix("bot") {
            Some(token) if token.contains(':') => "bot***",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}
