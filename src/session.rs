//! 執行期間的共享狀態。
//!
//! [`SessionState`] 由 `main` 建立後以 `Arc` 分享給刷新流程、畫面與狀態列。
//! 報價清單與最後刷新時間放在同一把 `RwLock` 之下，寫入時一起替換，
//! 讀取端永遠不會看到只更新一半的內容。

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{config::App, declare::RenderRecord};

/// 某一輪刷新完成後的完整畫面資料
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub records: Vec<RenderRecord>,
    /// 最後一次成功刷新的 unix 秒數，尚未刷新過為 0
    pub last_refresh: i64,
}

pub struct SessionState {
    config: App,
    board: RwLock<Board>,
}

impl SessionState {
    pub fn new(config: App) -> Self {
        let last_refresh = config.last_check;
        SessionState {
            config,
            board: RwLock::new(Board {
                records: Vec::new(),
                last_refresh,
            }),
        }
    }

    pub fn config(&self) -> &App {
        &self.config
    }

    /// 以新的一輪結果整批取代舊資料
    pub fn commit(&self, records: Vec<RenderRecord>, refreshed_at: i64) {
        let mut board = self.write();
        board.records = records;
        board.last_refresh = refreshed_at;
    }

    /// 取得目前畫面資料的複本
    pub fn board(&self) -> Board {
        self.read().clone()
    }

    pub fn last_refresh(&self) -> i64 {
        self.read().last_refresh
    }

    pub fn record_count(&self) -> usize {
        self.read().records.len()
    }

    // 資料每次都整批替換，鎖被污染時內容仍是完整的某一輪
    fn read(&self) -> RwLockReadGuard<'_, Board> {
        self.board.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Board> {
        self.board.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
