use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use concat_string::concat_string;

use crate::logging;

/// 個股頁面的基底網址
pub const QUOTE_PAGE_BASE: &str = "https://www.biznesradar.pl/notowania/";

/// 組出商品頁面的完整網址
pub fn quote_page_url(external_link_id: &str) -> String {
    concat_string!(QUOTE_PAGE_BASE, urlencoding::encode(external_link_id))
}

/// 交給作業系統預設的瀏覽器開啟網址
pub fn open_external(url: &str) -> Result<()> {
    let mut cmd = platform_command(url);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    cmd.spawn()
        .map(|_| logging::info_file_async(format!("opened {}", url)))
        .map_err(|why| anyhow!("Failed to open {} because {:?}", url, why))
}

#[cfg(target_os = "macos")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
