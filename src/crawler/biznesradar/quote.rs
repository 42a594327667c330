use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{declare::QuoteSnapshot, error::WatcherError};

/// `get-quotes-json` 的回應外層
#[derive(Deserialize, Debug)]
struct Envelope {
    data: Vec<Element>,
}

#[derive(Deserialize, Debug)]
struct Element {
    symbol: Symbol,
}

/// 報價欄位，僅保留畫面需要的部分
#[derive(Deserialize, Debug)]
struct Symbol {
    #[serde(rename = "displayName")]
    display_name: String,
    /// 最新成交價
    c: f64,
    /// 昨收
    pc: f64,
    /// 最後成交時間
    #[serde(default)]
    ts: i64,
    /// 成交值
    #[serde(default)]
    mc: Option<f64>,
    /// 個股頁面代號
    #[serde(default)]
    ut: String,
}

/// 由回應內容取出 `data[0].symbol`
pub(super) fn parse(id: &str, body: Value) -> Result<QuoteSnapshot, WatcherError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|why| WatcherError::fetch(id, format!("malformed quote JSON: {}", why)))?;
    let symbol = envelope
        .data
        .into_iter()
        .next()
        .map(|e| e.symbol)
        .ok_or_else(|| WatcherError::fetch(id, "quote JSON has no data[0].symbol"))?;

    Ok(QuoteSnapshot {
        display_name: symbol.display_name,
        current_price: to_decimal(id, symbol.c)?,
        previous_close: to_decimal(id, symbol.pc)?,
        last_transaction_time: symbol.ts,
        volume_value: symbol.mc.map(|mc| to_decimal(id, mc)).transpose()?,
        external_link_id: symbol.ut,
    })
}

fn to_decimal(id: &str, value: f64) -> Result<Decimal, WatcherError> {
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|why| WatcherError::fetch(id, format!("invalid number {}: {}", value, why)))
}
