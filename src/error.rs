use std::path::PathBuf;

use thiserror::Error;

/// 監看程式的錯誤分類
#[derive(Error, Debug)]
pub enum WatcherError {
    /// 設定檔不存在或無法解析，啟動時即終止程式
    #[error("config error: {0}")]
    Config(String),

    /// 找不到任何可用的設定檔
    #[error("config error: can't read {user:?} nor the bundled {bundled:?}")]
    ConfigMissing { user: Option<PathBuf>, bundled: PathBuf },

    /// 單一商品的抓取失敗，只會讓該商品在本輪被排除
    #[error("fetch error({id}): {reason}")]
    Fetch { id: String, reason: String },

    /// 非預期的繪製錯誤
    #[error("render error: {0}")]
    Render(String),
}

impl WatcherError {
    pub fn fetch(id: &str, reason: impl Into<String>) -> Self {
        WatcherError::Fetch {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, WatcherError::Fetch { .. })
    }
}
