use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Local;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{presenter::Presenter, session::SessionState, util::datetime};

/// 狀態列的更新頻率
pub const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// 尚未刷新過時顯示的時間
const NEVER: &str = "--:--:--";

/// 狀態列的內容，全部由 SessionState 推導
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub clock: String,
    /// 監看清單中的商品數
    pub counter: usize,
    pub last_refresh: String,
    pub interval: String,
}

impl StatusLine {
    pub fn read(session: &SessionState) -> Self {
        let last_refresh = match session.last_refresh() {
            0 => NEVER.to_string(),
            ts => datetime::format_unix(ts),
        };

        StatusLine {
            clock: datetime::format_clock(&Local::now()),
            counter: session.config().stocks.len(),
            last_refresh,
            interval: format!("{}s", session.config().refresh_interval),
        }
    }
}

/// 每秒更新一次狀態列，不會發出任何請求
pub async fn execute(session: Arc<SessionState>, presenter: Arc<Mutex<Presenter>>) {
    let mut ticker = time::interval_at(Instant::now(), STATUS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let status = StatusLine::read(&session);
        presenter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .update_status(status);
    }
}
