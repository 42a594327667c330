//! 刷新流程：同時抓取所有商品、合併、排序、整批寫回 SessionState 再交給畫面。
//!
//! 單一商品失敗只會讓它在本輪消失；全部失敗時保留上一輪的畫面。

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use futures::future::join_all;

use crate::{
    bot::Notifier,
    config::WatchedInstrument,
    crawler::QuoteSource,
    declare::RenderRecord,
    error::WatcherError,
    logging,
    presenter::Presenter,
    session::SessionState,
    util::datetime,
};

pub const NOTIFICATION_TITLE: &str = "Stocks Watcher Updated";

/// 一輪刷新的結果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Updated {
        updated: usize,
        failed: usize,
        refreshed_at: i64,
    },
    /// 上一輪尚未結束，本次跳過
    Skipped,
}

pub struct Refresher {
    source: Arc<dyn QuoteSource>,
    session: Arc<SessionState>,
    notifier: Arc<dyn Notifier>,
    presenter: Arc<Mutex<Presenter>>,
    running: AtomicBool,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        session: Arc<SessionState>,
        notifier: Arc<dyn Notifier>,
        presenter: Arc<Mutex<Presenter>>,
    ) -> Self {
        Refresher {
            source,
            session,
            notifier,
            presenter,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 執行一輪刷新，上一輪還在跑時直接跳過
    pub async fn execute(&self) -> Result<CycleOutcome> {
        if self.running.swap(true, Ordering::AcqRel) {
            logging::warn_file_async("previous refresh is still running, skip this tick".to_string());
            return Ok(CycleOutcome::Skipped);
        }
        let _running = scopeguard::guard(&self.running, |r| r.store(false, Ordering::Release));

        let config = self.session.config();
        let watchlist = &config.stocks;
        let (mut records, failures) =
            fetch_all(self.source.as_ref(), watchlist, config.at_signals).await;

        for why in &failures {
            if why.is_fetch() {
                logging::warn_file_async(format!("{}", why));
            } else {
                logging::error_file_async(format!("{}", why));
            }
        }

        if records.is_empty() && !failures.is_empty() {
            return Err(anyhow!(
                "all {} stocks failed to refresh, keep the previous board",
                failures.len()
            ));
        }

        RenderRecord::sort(&mut records);
        let refreshed_at = datetime::now_unix();
        let updated = records.len();

        self.session.commit(records, refreshed_at);
        self.presenter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .render(&self.session.board().records);

        logging::info_file_async(format!(
            "refreshed {} of {} stocks, {} failed",
            self.session.record_count(),
            watchlist.len(),
            failures.len()
        ));

        if config.notifications {
            let body = notification_body(updated, refreshed_at);
            if let Err(why) = self.notifier.notify(NOTIFICATION_TITLE, &body).await {
                logging::error_file_async(format!("Failed to notify because {:?}", why));
            }
        }

        Ok(CycleOutcome::Updated {
            updated,
            failed: failures.len(),
            refreshed_at,
        })
    }
}

pub fn notification_body(updated: usize, refreshed_at: i64) -> String {
    format!(
        "{} Stocks Has Been Updated at {}",
        updated,
        datetime::format_unix(refreshed_at)
    )
}

/// 同時抓取清單內所有商品，回傳成功的紀錄與失敗的原因
///
/// 重複的代號只抓一次，以第一筆設定為準。
pub async fn fetch_all(
    source: &dyn QuoteSource,
    watchlist: &[WatchedInstrument],
    with_indicators: bool,
) -> (Vec<RenderRecord>, Vec<WatcherError>) {
    let mut seen = HashSet::with_capacity(watchlist.len());
    let futures = watchlist
        .iter()
        .filter(|instrument| seen.insert(instrument.id.as_str()))
        .map(|instrument| fetch_one(source, instrument, with_indicators))
        .collect::<Vec<_>>();

    let mut records = Vec::with_capacity(futures.len());
    let mut failures = Vec::new();
    for result in join_all(futures).await {
        match result {
            Ok(record) => records.push(record),
            Err(why) => failures.push(why),
        }
    }

    (records, failures)
}

/// 先取報價，成功後視需要再取技術指標
async fn fetch_one(
    source: &dyn QuoteSource,
    instrument: &WatchedInstrument,
    with_indicators: bool,
) -> Result<RenderRecord, WatcherError> {
    let snapshot = source.fetch_quote(&instrument.id).await?;
    let indicators = if with_indicators {
        Some(source.fetch_indicators(&instrument.id).await?)
    } else {
        None
    };

    Ok(RenderRecord {
        instrument: instrument.clone(),
        snapshot,
        indicators,
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        config::App,
        crawler::biznesradar::{tests::FakeTransport, BiznesRadar},
        declare::{IndicatorSnapshot, QuoteSnapshot, Signal, Summary},
        presenter::tests::MemoryScreen,
    };

    /// 依代號回傳固定報價，`failing` 內的代號一律失敗
    #[derive(Default)]
    struct FakeSource {
        prices: HashMap<String, Decimal>,
        failing: HashSet<String>,
        failing_indicators: HashSet<String>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(ids: &[&str]) -> Self {
            FakeSource {
                prices: ids.iter().map(|id| (id.to_string(), dec!(105))).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn fetch_quote(&self, id: &str) -> Result<QuoteSnapshot, WatcherError> {
            self.calls.lock().unwrap().push(format!("quote {id}"));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(id) {
                return Err(WatcherError::fetch(id, "Invalid status code <500>"));
            }
            let price = self
                .prices
                .get(id)
                .copied()
                .ok_or_else(|| WatcherError::fetch(id, "unknown id"))?;

            Ok(QuoteSnapshot {
                display_name: format!("{id} Corp"),
                current_price: price,
                previous_close: dec!(100),
                last_transaction_time: 1700000000,
                volume_value: Some(dec!(5000)),
                external_link_id: id.to_string(),
            })
        }

        async fn fetch_indicators(&self, id: &str) -> Result<IndicatorSnapshot, WatcherError> {
            self.calls.lock().unwrap().push(format!("indicators {id}"));
            if self.failing_indicators.contains(id) {
                return Err(WatcherError::fetch(id, "malformed indicator JSON"));
            }
            let signal = Signal {
                name: "RSI".to_string(),
                value: "50".to_string(),
                action_score: 0,
            };
            Ok(IndicatorSnapshot {
                moving_average: signal.clone(),
                rsi: signal.clone(),
                stochastic: signal.clone(),
                macd: signal,
                summary: Summary {
                    action_name: "neutralnie".to_string(),
                    action_score: 0,
                    buy: 1,
                    sell: 1,
                    neutral: 1,
                },
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, title: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        refresher: Arc<Refresher>,
        session: Arc<SessionState>,
        source: Arc<FakeSource>,
        notifier: Arc<RecordingNotifier>,
        presenter: Arc<Mutex<Presenter>>,
    }

    fn fixture(config: App, source: FakeSource) -> Fixture {
        let session = Arc::new(SessionState::new(config));
        let source = Arc::new(source);
        let notifier = Arc::new(RecordingNotifier::default());
        let presenter = Arc::new(Mutex::new(Presenter::new(Box::new(MemoryScreen::default()))));
        let refresher = Arc::new(Refresher::new(
            source.clone(),
            session.clone(),
            notifier.clone(),
            presenter.clone(),
        ));

        Fixture {
            refresher,
            session,
            source,
            notifier,
            presenter,
        }
    }

    fn watchlist(items: &[(&str, &str, bool)]) -> Vec<WatchedInstrument> {
        items
            .iter()
            .map(|(name, id, is_index)| WatchedInstrument::new(name, id, *is_index))
            .collect()
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let mut source = FakeSource::new(&["1", "2", "3"]);
        source.failing.insert("2".to_string());
        let config = App {
            stocks: watchlist(&[("A", "1", false), ("B", "2", false), ("C", "3", false)]),
            ..Default::default()
        };
        let f = fixture(config, source);

        let outcome = f.refresher.execute().await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Updated {
                updated: 2,
                failed: 1,
                ..
            }
        ));

        let ids: Vec<String> = f
            .session
            .board()
            .records
            .into_iter()
            .map(|r| r.instrument.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(f.presenter.lock().unwrap().surface().children.len(), 2);
    }

    #[tokio::test]
    async fn test_sorted_and_unique() {
        let source = FakeSource::new(&["a", "b", "c"]);
        let config = App {
            stocks: watchlist(&[
                ("B", "a", true),
                ("A", "b", false),
                ("A", "c", true),
                ("duplicate", "a", false),
            ]),
            ..Default::default()
        };
        let configured: HashSet<String> = config.stocks.iter().map(|s| s.id.clone()).collect();
        let f = fixture(config, source);

        f.refresher.execute().await.unwrap();

        let ids: Vec<String> = f
            .session
            .board()
            .records
            .into_iter()
            .map(|r| r.instrument.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(ids.iter().all(|id| configured.contains(id)));
        assert_eq!(f.source.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_total_failure_keeps_previous_board() {
        let config = App {
            stocks: watchlist(&[("A", "1", false), ("B", "2", false)]),
            notifications: true,
            ..Default::default()
        };
        let f = fixture(config, FakeSource::new(&["1", "2"]));
        f.refresher.execute().await.unwrap();
        let before = f.session.board();
        assert_eq!(before.records.len(), 2);

        // 換一個全部失敗的來源，但沿用同一份 session
        let mut broken = FakeSource::new(&[]);
        broken.failing.extend(["1".to_string(), "2".to_string()]);
        let refresher = Refresher::new(
            Arc::new(broken),
            f.session.clone(),
            f.notifier.clone(),
            f.presenter.clone(),
        );

        assert!(refresher.execute().await.is_err());
        assert_eq!(f.session.board(), before);
        assert_eq!(f.notifier.sent.lock().unwrap().len(), 1);
        assert!(!refresher.is_running());
    }

    #[tokio::test]
    async fn test_empty_watchlist() {
        let f = fixture(App::default(), FakeSource::default());
        let outcome = f.refresher.execute().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Updated { updated: 0, .. }));
        assert!(f.session.last_refresh() > 0);
    }

    #[tokio::test]
    async fn test_indicators_chained() {
        let mut source = FakeSource::new(&["1", "2"]);
        source.failing.insert("2".to_string());
        let config = App {
            stocks: watchlist(&[("A", "1", false), ("B", "2", false)]),
            at_signals: true,
            ..Default::default()
        };
        let f = fixture(config, source);
        f.refresher.execute().await.unwrap();

        let mut calls = f.source.calls();
        calls.sort();
        // 報價失敗的商品不會再去抓技術指標
        assert_eq!(calls, vec!["indicators 1", "quote 1", "quote 2"]);
        assert!(f.session.board().records[0].indicators.is_some());
    }

    #[tokio::test]
    async fn test_indicator_failure_excludes_instrument() {
        let mut source = FakeSource::new(&["1", "2"]);
        source.failing_indicators.insert("1".to_string());
        let (records, failures) = fetch_all(
            &source,
            &watchlist(&[("A", "1", false), ("B", "2", false)]),
            true,
        )
        .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instrument.id, "2");
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_indicators_disabled() {
        let f = fixture(
            App {
                stocks: watchlist(&[("A", "1", false)]),
                ..Default::default()
            },
            FakeSource::new(&["1"]),
        );
        f.refresher.execute().await.unwrap();
        assert_eq!(f.source.calls(), vec!["quote 1"]);
        assert!(f.session.board().records[0].indicators.is_none());
    }

    #[tokio::test]
    async fn test_notification() {
        let config = App {
            stocks: watchlist(&[("A", "1", false), ("B", "2", false)]),
            notifications: true,
            ..Default::default()
        };
        let f = fixture(config, FakeSource::new(&["1", "2"]));
        f.refresher.execute().await.unwrap();

        let sent = f.notifier.sent.lock().unwrap().clone();
        let refreshed_at = f.session.last_refresh();
        assert_eq!(
            sent,
            vec![(
                NOTIFICATION_TITLE.to_string(),
                notification_body(2, refreshed_at)
            )]
        );
        assert!(sent[0].1.starts_with("2 Stocks Has Been Updated at "));
    }

    #[tokio::test]
    async fn test_no_notification_when_disabled() {
        let config = App {
            stocks: watchlist(&[("A", "1", false)]),
            ..Default::default()
        };
        let f = fixture(config, FakeSource::new(&["1"]));
        f.refresher.execute().await.unwrap();
        assert!(f.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_skipped() {
        let mut source = FakeSource::new(&["1"]);
        source.delay = Some(Duration::from_millis(100));
        let config = App {
            stocks: watchlist(&[("A", "1", false)]),
            ..Default::default()
        };
        let f = fixture(config, source);

        let (first, second) = tokio::join!(f.refresher.execute(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.refresher.execute().await
        });

        assert!(matches!(first.unwrap(), CycleOutcome::Updated { .. }));
        assert_eq!(second.unwrap(), CycleOutcome::Skipped);
        assert!(!f.refresher.is_running());
        assert_eq!(f.source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_scenario() {
        let config = App::from_json(
            r#"{"stocks":[{"id":"1","name":"X"}],"refreshInterval":60,"notifications":false,"atSignals":false}"#,
        )
        .unwrap();
        let f = fixture(config, FakeSource::new(&["1"]));
        f.refresher.execute().await.unwrap();

        let presenter = f.presenter.lock().unwrap();
        let stock = &presenter.surface().children[0];
        assert_eq!(stock.find_class("link").unwrap().text, "1 Corp");
        assert_eq!(
            stock.find_class("price").unwrap().text_content(),
            "105.00 ▲ +5.00%"
        );
        assert!(stock.find_class("change-indicator").unwrap().has_class("up"));
        assert_eq!(
            stock.find_class("volume").unwrap().text_content(),
            "volume: 5 000.00"
        );
        assert_eq!(
            stock.find_class("last-transaction").unwrap().find_class("value").unwrap().text,
            datetime::format_unix(1700000000)
        );
    }

    #[tokio::test]
    async fn test_scenario_through_parser() {
        let config = App::from_json(
            r#"{"stocks":[{"id":"1","name":"X"}],"refreshInterval":60,"notifications":false,"atSignals":false}"#,
        )
        .unwrap();
        let transport = Arc::new(FakeTransport {
            quote: Some(serde_json::json!({"data": [{"symbol": {
                "displayName": "X Corp", "c": 105, "pc": 100, "ts": 1700000000, "mc": 5000
            }}]})),
            ..Default::default()
        });
        let source = Arc::new(BiznesRadar::with_transport("http://localhost:8080", transport));
        let session = Arc::new(SessionState::new(config));
        let presenter = Arc::new(Mutex::new(Presenter::new(Box::new(MemoryScreen::default()))));
        let refresher = Refresher::new(
            source,
            session.clone(),
            Arc::new(RecordingNotifier::default()),
            presenter.clone(),
        );

        refresher.execute().await.unwrap();

        let presenter = presenter.lock().unwrap();
        let stock = &presenter.surface().children[0];
        assert_eq!(stock.id.as_deref(), Some("1"));
        assert_eq!(stock.find_class("link").unwrap().text, "X Corp");
        let change = stock.find_class("change-indicator").unwrap();
        assert_eq!(change.text, "+5.00%");
        assert!(change.has_class("up"));
        assert_eq!(
            stock.find_class("price").unwrap().text_content(),
            "105.00 ▲ +5.00%"
        );
        assert_eq!(
            stock.find_class("volume").unwrap().text_content(),
            "volume: 5 000.00"
        );
        assert_eq!(
            stock.find_class("last-transaction").unwrap().find_class("value").unwrap().text,
            datetime::format_unix(1700000000)
        );
        assert_eq!(session.record_count(), 1);
    }
}
