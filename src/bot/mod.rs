use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::{config::App, logging};

pub mod telegram;

/// 刷新完成時的通知出口
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// 只寫到 console 與日誌，不打擾使用者
#[derive(Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        logging::info_console(format!("{}: {}", title, body));
        logging::info_file_async(format!("notify {}: {}", title, body));
        Ok(())
    }
}

/// 設定了 Telegram 就走 Telegram，否則退回 console
pub fn from_config(config: &App) -> Arc<dyn Notifier> {
    if config.telegram.is_enabled() {
        Arc::new(telegram::Telegram::new(&config.telegram))
    } else {
        Arc::new(ConsoleNotifier)
    }
}
