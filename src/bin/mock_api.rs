//! 本機開發用的假 biznesradar 服務。
//!
//! 將設定檔的 `apiHost` 指向 `http://127.0.0.1:8080` 即可離線測試：
//!
//! - `GET  /stocks`：全部商品
//! - `POST /stocks`、`POST /get-quotes-json/`：表單 `oid=..&range=..`，找不到回 404
//! - `GET  /get-indicators-json/?oid=..&aggregate=..`：依漲跌產生的技術指標

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[allow(dead_code)]
#[path = "../logging.rs"]
mod logging;

#[derive(Debug, Parser)]
#[command(version, about = "Local stand-in for the biznesradar.pl JSON endpoints", long_about = None)]
struct Args {
    /// HTTP port number
    #[clap(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Stock {
    oid: i64,
    short_name: String,
    full_name: String,
    o: f64,
    c: f64,
    min: f64,
    max: f64,
    v: i64,
    mc: f64,
    pc: f64,
    tr: i64,
    lop: i64,
    ts: i64,
    medium_name: String,
    display_name: String,
    ut: String,
    ind: i64,
    qp: String,
}

impl Stock {
    /// 所有假資料共用 LiveChat 的數字，只換掉代號與名稱
    fn sample(oid: i64, display_name: &str) -> Self {
        Stock {
            oid,
            short_name: "LVC".to_string(),
            full_name: "LIVECHAT SOFTWARE SPÓŁKA AKCYJNA".to_string(),
            o: 35.5,
            c: 36.05,
            min: 35.1,
            max: 36.4,
            v: 12049,
            mc: 429201.3,
            pc: 36.75,
            tr: 92,
            lop: 0,
            ts: 1569837932,
            medium_name: "LIVECHAT".to_string(),
            display_name: display_name.to_string(),
            ut: "LIVECHAT".to_string(),
            ind: -1,
            qp: "2".to_string(),
        }
    }
}

type Stocks = Arc<BTreeMap<String, Stock>>;

fn all_stocks() -> BTreeMap<String, Stock> {
    [
        (9537, "LVC (LIVECHAT)"),
        (221, "AMBRA"),
        (8789, "PKP Cargo"),
        (3972, "JSW"),
        (348, "CCC"),
        (29136, "Orlen"),
        (41, "PZU"),
        (308, "Oponeo"),
        (17347, "Kruk"),
        (66, "CDProject"),
        (3567, "11Bit"),
        (27169, "TenSquareGames"),
        (231, "Tauron"),
        (5730, "Platige Image"),
        (149, "Lena"),
        (9820, "PCC Rokita"),
    ]
    .into_iter()
    .map(|(oid, name)| (oid.to_string(), Stock::sample(oid, name)))
    .collect()
}

#[derive(Deserialize, Debug)]
struct QuoteForm {
    #[serde(default)]
    oid: String,
    #[allow(dead_code)]
    range: Option<String>,
}

#[derive(Deserialize, Debug)]
struct IndicatorQuery {
    #[serde(default)]
    oid: String,
    #[allow(dead_code)]
    aggregate: Option<String>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn not_found(oid: &str) -> (StatusCode, Json<Value>) {
    let msg = format!("can't find stock with oid: {}", oid);
    logging::error_file_async(msg.clone());
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "httpStatus": 404, "error": msg })),
    )
}

async fn stocks(State(stocks): State<Stocks>) -> Json<BTreeMap<String, Stock>> {
    Json(stocks.as_ref().clone())
}

async fn quote(State(stocks): State<Stocks>, Form(form): Form<QuoteForm>) -> ApiResult {
    logging::info_file_async(format!("POST quote oid={}", form.oid));
    let stock = stocks.get(&form.oid).ok_or_else(|| not_found(&form.oid))?;

    Ok(Json(json!({ "data": [{ "symbol": stock }] })))
}

async fn indicators(State(stocks): State<Stocks>, Query(query): Query<IndicatorQuery>) -> ApiResult {
    logging::info_file_async(format!("GET indicators oid={}", query.oid));
    let stock = stocks.get(&query.oid).ok_or_else(|| not_found(&query.oid))?;

    Ok(Json(indicator_payload(stock)))
}

/// 以當日漲跌決定所有指標的方向
fn indicator_payload(stock: &Stock) -> Value {
    let score: i64 = if stock.c > stock.pc {
        1
    } else if stock.c < stock.pc {
        -1
    } else {
        0
    };
    let (action_name, buy, sell, neutral) = match score {
        1 => ("kupuj", 3, 0, 1),
        -1 => ("sprzedaj", 0, 3, 1),
        _ => ("neutralnie", 0, 0, 4),
    };
    let signal = |name: &str, value: String| json!({ "name": name, "value": value, "action_value": score });

    json!({
        "data": {
            "averages": { "SMA15": signal("SMA15", format!("{:.2}", stock.pc)) },
            "indicators": {
                "RSI": signal("RSI", "50.00".to_string()),
                "STS": signal("STS", "50.00".to_string()),
                "MACD": signal("MACD", format!("{:.2}", stock.c - stock.pc)),
            },
            "summary": {
                "summary": {
                    "action_name": action_name,
                    "action_value": score,
                    "buy": buy,
                    "sell": sell,
                    "neutral": neutral,
                }
            }
        }
    })
}

/// 記錄每個請求的來源、方法、URI、狀態碼、User-Agent 與耗時
async fn log_request(req: Request, next: Next) -> Response {
    let begin = Instant::now();
    let remote = remote_addr(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0),
    );
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let proto = format!("{:?}", req.version());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let res = next.run(req).await;

    logging::info_file_async(access_line(
        &remote,
        &method,
        &uri,
        &proto,
        res.status(),
        &user_agent,
        begin.elapsed(),
    ));

    res
}

/// 優先採用 `X-Forwarded-For`
fn remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.to_string()))
        .unwrap_or_else(|| "-".to_string())
}

fn access_line(
    remote: &str,
    method: &str,
    uri: &str,
    proto: &str,
    status: StatusCode,
    user_agent: &str,
    took: Duration,
) -> String {
    format!(
        "{} - {} {} {} {} {} Took: {:?}",
        remote,
        method,
        uri,
        proto,
        status.as_u16(),
        user_agent,
        took
    )
}

fn router() -> Router {
    Router::new()
        .route("/stocks", get(stocks).post(quote))
        .route("/get-quotes-json/", post(quote))
        .route("/get-indicators-json/", get(indicators))
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(all_stocks()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    logging::info_console(format!("mock api listening on http://{}", addr));
    axum::serve(
        listener,
        router().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Stocks {
        Arc::new(all_stocks())
    }

    #[tokio::test]
    async fn test_quote() {
        let form = QuoteForm {
            oid: "9537".to_string(),
            range: Some("1d".to_string()),
        };
        let Json(body) = quote(State(state()), Form(form)).await.unwrap();
        let symbol = &body["data"][0]["symbol"];
        assert_eq!(symbol["displayName"], "LVC (LIVECHAT)");
        assert_eq!(symbol["c"], 36.05);
        assert_eq!(symbol["pc"], 36.75);
        assert_eq!(symbol["ut"], "LIVECHAT");
    }

    #[tokio::test]
    async fn test_quote_not_found() {
        let form = QuoteForm {
            oid: "1".to_string(),
            range: None,
        };
        let (status, Json(body)) = quote(State(state()), Form(form)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "can't find stock with oid: 1");
    }

    #[tokio::test]
    async fn test_indicators() {
        let query = IndicatorQuery {
            oid: "66".to_string(),
            aggregate: Some("1d".to_string()),
        };
        let Json(body) = indicators(State(state()), Query(query)).await.unwrap();
        let data = &body["data"];
        assert_eq!(data["indicators"]["RSI"]["action_value"], -1);
        assert_eq!(data["summary"]["summary"]["action_name"], "sprzedaj");
        assert_eq!(data["averages"]["SMA15"]["value"], "36.75");
    }

    #[test]
    fn test_access_line() {
        let line = access_line(
            "127.0.0.1:50000",
            "POST",
            "/get-quotes-json/",
            "HTTP/1.1",
            StatusCode::NOT_FOUND,
            "stocks_watcher/0.1.0",
            Duration::from_millis(3),
        );
        assert_eq!(
            line,
            "127.0.0.1:50000 - POST /get-quotes-json/ HTTP/1.1 404 stocks_watcher/0.1.0 Took: 3ms"
        );
    }

    #[test]
    fn test_remote_addr() {
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 50000)));
        let mut headers = HeaderMap::new();
        assert_eq!(remote_addr(&headers, peer), "127.0.0.1:50000");
        assert_eq!(remote_addr(&headers, None), "-");

        headers.insert("X-Forwarded-For", "10.0.0.7".parse().unwrap());
        assert_eq!(remote_addr(&headers, peer), "10.0.0.7");
    }

    #[test]
    fn test_all_stocks() {
        let stocks = all_stocks();
        assert_eq!(stocks.len(), 16);
        assert_eq!(stocks["3567"].display_name, "11Bit");
    }
}
