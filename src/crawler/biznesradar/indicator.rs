use serde::Deserialize;
use serde_json::Value;

use crate::{
    declare::{IndicatorSnapshot, Signal, Summary},
    error::WatcherError,
};

/// `get-indicators-json` 的回應外層
#[derive(Deserialize, Debug)]
struct Envelope {
    data: Data,
}

#[derive(Deserialize, Debug)]
struct Data {
    averages: Averages,
    indicators: Indicators,
    summary: SummaryWrapper,
}

#[derive(Deserialize, Debug)]
struct Averages {
    #[serde(rename = "SMA15")]
    sma15: SignalDto,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(rename = "RSI")]
    rsi: SignalDto,
    #[serde(rename = "STS")]
    sts: SignalDto,
    #[serde(rename = "MACD")]
    macd: SignalDto,
}

#[derive(Deserialize, Debug)]
struct SignalDto {
    name: String,
    /// 數值或文字都有可能
    #[serde(default)]
    value: Value,
    action_value: i64,
}

#[derive(Deserialize, Debug)]
struct SummaryWrapper {
    summary: SummaryDto,
}

#[derive(Deserialize, Debug)]
struct SummaryDto {
    action_name: String,
    action_value: i64,
    #[serde(default)]
    buy: i64,
    #[serde(default)]
    sell: i64,
    #[serde(default)]
    neutral: i64,
}

impl From<SignalDto> for Signal {
    fn from(dto: SignalDto) -> Self {
        let value = match dto.value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Signal {
            name: dto.name,
            value,
            action_score: dto.action_value,
        }
    }
}

/// 由回應內容取出 `data.averages`、`data.indicators`、`data.summary.summary`
pub(super) fn parse(id: &str, body: Value) -> Result<IndicatorSnapshot, WatcherError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|why| WatcherError::fetch(id, format!("malformed indicator JSON: {}", why)))?;
    let data = envelope.data;
    let summary = data.summary.summary;

    Ok(IndicatorSnapshot {
        moving_average: data.averages.sma15.into(),
        rsi: data.indicators.rsi.into(),
        stochastic: data.indicators.sts.into(),
        macd: data.indicators.macd.into(),
        summary: Summary {
            action_name: summary.action_name,
            action_score: summary.action_value,
            buy: summary.buy,
            sell: summary.sell,
            neutral: summary.neutral,
        },
    })
}
