use async_trait::async_trait;

use crate::{
    declare::{IndicatorSnapshot, QuoteSnapshot},
    error::WatcherError,
};

/// biznesradar.pl
pub mod biznesradar;

/// 報價來源，每次呼叫只對上游發一次請求
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, id: &str) -> Result<QuoteSnapshot, WatcherError>;
    async fn fetch_indicators(&self, id: &str) -> Result<IndicatorSnapshot, WatcherError>;
}
