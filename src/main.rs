use std::{
    io,
    path::PathBuf,
    process,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use clap::Parser;

use crate::{
    config::App,
    crawler::{biznesradar::BiznesRadar, QuoteSource},
    event::refresh::Refresher,
    presenter::{terminal::TerminalScreen, Presenter, Screen},
    session::SessionState,
    util::opener,
};

pub mod bot;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod event;
pub mod logging;
pub mod presenter;
pub mod scheduler;
pub mod session;
pub mod util;

/// 監看 biznesradar.pl 上的股票與指數
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// 設定檔路徑，未指定時依序找 STOCKS_CONFIG、~/.stocks.json、./stocks.json
    #[clap(long)]
    config: Option<PathBuf>,

    /// 只刷新一輪，印出結果後結束
    #[clap(long)]
    once: bool,

    /// 開啟指定代號的個股頁面後結束
    #[clap(long, value_name = "ID")]
    open: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let args = Args::parse();
    let config = match App::load(args.config) {
        Ok(config) => config,
        Err(why) => {
            logging::error_console(format!("{}", why));
            process::exit(1);
        }
    };

    let source: Arc<dyn QuoteSource> = Arc::new(BiznesRadar::new(&config.api_host));

    if let Some(id) = args.open {
        return open(source.as_ref(), &id).await;
    }

    let once = args.once;
    let screen: Box<dyn Screen> = if once {
        Box::new(TerminalScreen::plain(io::stdout()))
    } else {
        Box::new(TerminalScreen::stdout())
    };

    let notifier = bot::from_config(&config);
    let session = Arc::new(SessionState::new(config));
    let presenter = Arc::new(Mutex::new(Presenter::new(screen)));
    let refresher = Arc::new(Refresher::new(
        source,
        session.clone(),
        notifier,
        presenter.clone(),
    ));

    if once {
        refresher.execute().await?;
        return Ok(());
    }

    let handles = scheduler::start(refresher, session, presenter);

    tokio::signal::ctrl_c().await?;
    for h in handles {
        h.abort();
    }
    logging::info_file_async("StocksWatcher stopped".to_string());

    Ok(())
}

/// 先取報價拿到網址代號，再交給瀏覽器開啟
async fn open(source: &dyn QuoteSource, id: &str) -> Result<()> {
    let snapshot = source.fetch_quote(id).await?;
    let url = opener::quote_page_url(&snapshot.external_link_id);
    logging::info_console(format!("{} -> {}", snapshot.display_name, url));
    opener::open_external(&url)
}
