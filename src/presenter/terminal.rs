use std::io::{self, Write};

use crate::{event::status::StatusLine, presenter::Node};

/// 游標移回左上角
const CURSOR_HOME: &str = "\x1B[H";
/// 清除游標到行尾
const CLEAR_LINE: &str = "\x1B[K";
/// 清除游標到畫面結尾
const CLEAR_BELOW: &str = "\x1B[J";

/// 實際的顯示外殼
pub trait Screen: Send {
    fn paint(&mut self, surface: &Node, status: Option<&StatusLine>) -> io::Result<()>;
}

/// 以純文字輸出到終端機，每次都整頁重畫
///
/// 覆寫模式下不先清空畫面，而是從左上角直接蓋過舊內容，再清掉多餘的部分。
pub struct TerminalScreen<W: Write + Send> {
    out: W,
    overwrite: bool,
}

impl TerminalScreen<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalScreen {
            out: io::stdout(),
            overwrite: true,
        }
    }
}

impl<W: Write + Send> TerminalScreen<W> {
    /// 不送出控制碼，用於 `--once` 或輸出到檔案
    pub fn plain(out: W) -> Self {
        TerminalScreen {
            out,
            overwrite: false,
        }
    }
}

impl<W: Write + Send> Screen for TerminalScreen<W> {
    fn paint(&mut self, surface: &Node, status: Option<&StatusLine>) -> io::Result<()> {
        let mut frame = String::new();
        if self.overwrite {
            frame.push_str(CURSOR_HOME);
        }
        for line in layout(surface, status) {
            frame.push_str(&line);
            if self.overwrite {
                frame.push_str(CLEAR_LINE);
            }
            frame.push('\n');
        }
        if self.overwrite {
            frame.push_str(CLEAR_BELOW);
        }

        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }
}

/// 將節點樹排成一行一行的文字
///
/// 狀態列在最上方；每檔商品的標題一行，其餘區塊各一行並縮排。
pub fn layout(surface: &Node, status: Option<&StatusLine>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(s) = status {
        lines.push(format!(
            "{}  |  stocks: {}  |  last refresh: {}  |  every {}",
            s.clock, s.counter, s.last_refresh, s.interval
        ));
        lines.push(String::new());
    }

    for stock in &surface.children {
        for block in &stock.children {
            if block.has_class("header") {
                let parts: Vec<String> = block.children.iter().map(Node::text_content).collect();
                lines.push(parts.join("  "));
            } else {
                lines.push(format!("    {}", block.text_content()));
            }
        }
    }

    lines
}
