//! # BiznesRadar 行情採集模組
//!
//! 透過 biznesradar.pl 網頁前端使用的 JSON 端點取得報價與技術指標。
//!
//! ## 支援的功能
//!
//! - **即時報價 (`quote`)**：`POST /get-quotes-json/`，表單 `oid={id}&range=1d`。
//! - **技術指標 (`indicator`)**：`GET /get-indicators-json/?oid={id}&aggregate=1d`。
//!
//! 兩個端點都只發一次請求，不重試，失敗由上層在本輪排除該商品。

use std::sync::Arc;

use async_trait::async_trait;
use concat_string::concat_string;
use reqwest::header::{self, HeaderValue};

use crate::{
    crawler::QuoteSource,
    declare::{IndicatorSnapshot, QuoteSnapshot},
    error::WatcherError,
    util::http::{HttpTransport, JsonTransport},
};

/// 指標數據子模組
pub mod indicator;
/// 報價數據子模組
pub mod quote;

/// 報價的時間範圍
const QUOTE_RANGE: &str = "1d";
/// 指標的彙整週期
const INDICATOR_AGGREGATE: &str = "1d";

/// BiznesRadar 採集器
pub struct BiznesRadar {
    host: String,
    transport: Arc<dyn JsonTransport>,
}

impl BiznesRadar {
    pub fn new(host: &str) -> Self {
        Self::with_transport(host, Arc::new(HttpTransport))
    }

    pub fn with_transport(host: &str, transport: Arc<dyn JsonTransport>) -> Self {
        BiznesRadar {
            host: host.trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn quote_url(&self) -> String {
        concat_string!(self.host, "/get-quotes-json/")
    }

    fn indicator_url(&self, id: &str) -> String {
        format!(
            "{}/get-indicators-json/?oid={}&aggregate={}",
            self.host,
            urlencoding::encode(id),
            INDICATOR_AGGREGATE
        )
    }
}

/// 網站只回應帶有 `X-Requested-With` 的請求
fn ajax_headers(accept_json: bool) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        "X-Requested-With",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    if accept_json {
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
    }
    headers
}

fn ensure_id(id: &str) -> Result<(), WatcherError> {
    if id.trim().is_empty() {
        return Err(WatcherError::fetch(id, "instrument id is empty"));
    }
    Ok(())
}

#[async_trait]
impl QuoteSource for BiznesRadar {
    async fn fetch_quote(&self, id: &str) -> Result<QuoteSnapshot, WatcherError> {
        ensure_id(id)?;
        let body = self
            .transport
            .post_form_json(
                &self.quote_url(),
                Some(ajax_headers(false)),
                &[("oid", id), ("range", QUOTE_RANGE)],
            )
            .await
            .map_err(|why| WatcherError::fetch(id, format!("{:?}", why)))?;

        quote::parse(id, body)
    }

    async fn fetch_indicators(&self, id: &str) -> Result<IndicatorSnapshot, WatcherError> {
        ensure_id(id)?;
        let body = self
            .transport
            .get_json(&self.indicator_url(id), Some(ajax_headers(true)))
            .await
            .map_err(|why| WatcherError::fetch(id, format!("{:?}", why)))?;

        indicator::parse(id, body)
    }
}
