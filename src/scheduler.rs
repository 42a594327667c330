use std::{
    env,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    task::{self, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    event::{
        refresh::{CycleOutcome, Refresher},
        status,
    },
    logging,
    presenter::Presenter,
    session::SessionState,
};

/// 啟動排程：狀態列、立即一輪刷新，以及之後每隔 refreshInterval 秒的刷新
pub fn start(
    refresher: Arc<Refresher>,
    session: Arc<SessionState>,
    presenter: Arc<Mutex<Presenter>>,
) -> Vec<JoinHandle<()>> {
    let period = Duration::from_secs(session.config().refresh_interval.max(1));

    let status_task = task::spawn(status::execute(session.clone(), presenter));
    let refresh_task = task::spawn(run_refresh(refresher, period));

    logging::info_file_async(format!(
        "StocksWatcher 已啟動 {} stocks, every {:?}\r\nRust OS/Arch: {}/{}",
        session.config().stocks.len(),
        period,
        env::consts::OS,
        env::consts::ARCH
    ));

    vec![status_task, refresh_task]
}

/// 第一個 tick 立即觸發；每輪各自 spawn，上一輪未完成時由 Refresher 跳過
async fn run_refresh(refresher: Arc<Refresher>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now(), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if refresher.is_running() {
            logging::debug_file_async("refresh still running, wait for the next tick".to_string());
            continue;
        }
        let r = refresher.clone();
        task::spawn(async move {
            run_cycle(&r).await;
        });
    }
}

/// 執行一輪並記錄結果，錯誤不會往上拋
pub async fn run_cycle(refresher: &Refresher) -> Option<CycleOutcome> {
    match refresher.execute().await {
        Ok(outcome) => {
            if let CycleOutcome::Updated {
                updated, failed, ..
            } = &outcome
            {
                logging::debug_file_async(format!(
                    "refresh cycle done: {} updated, {} failed",
                    updated, failed
                ));
            }
            Some(outcome)
        }
        Err(why) => {
            logging::error_file_async(format!("Failed to refresh because {:?}", why));
            None
        }
    }
}
