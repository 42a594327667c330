//! 非同步檔案日誌。
//!
//! 呼叫端只把訊息丟進 channel，實際寫檔由背景執行緒批次處理，
//! 避免在刷新流程中因為磁碟 I/O 而卡住事件迴圈。
//! 日誌檔位於 `log/{日期}_{名稱}.log`，可用 `STOCKS_LOG_DIR` 改變目錄。

use std::{
    env,
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    thread,
};

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

const LOG_DIR: &str = "STOCKS_LOG_DIR";
/// 累積到這個大小就寫入一次
const FLUSH_SIZE: usize = 4096;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("stocks_watcher"));

pub struct Logger {
    writer: Option<Sender<LogMessage>>,
}

impl Logger {
    fn new(log_name: &str) -> Self {
        let log_path = match Self::get_log_path(log_name) {
            Some(p) => p,
            None => {
                error_console("Failed to create log directory, fallback to console.".to_string());
                return Logger { writer: None };
            }
        };
        let (tx, rx) = unbounded::<LogMessage>();

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
                Ok(f) => f,
                Err(why) => {
                    error_console(format!("Failed to open log file {:?}: {}", log_path, why));
                    // 檔案開不起來時，把訊息導向 console 以免遺失
                    for received in &rx {
                        println!("{}", received.line());
                    }
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(FLUSH_SIZE);

            for received in &rx {
                if writeln!(&mut line, "{}", received.line()).is_err() {
                    continue;
                }

                if rx.is_empty() || line.len() >= FLUSH_SIZE {
                    if let Err(why) = writer.write_all(line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    if let Err(why) = writer.flush() {
                        error_console(format!("Failed to flush log file. because:{:#?}", why));
                    }

                    line.clear();
                }
            }
        });

        Logger { writer: Some(tx) }
    }

    fn send(&self, level: log::Level, msg: String) {
        let message = LogMessage::new(level, msg);
        match &self.writer {
            Some(writer) => {
                if let Err(why) = writer.send(message) {
                    error_console(format!("{} {}", why, why.0.msg));
                }
            }
            None => println!("{}", message.line()),
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = env::var(LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("log"));

        if !path.exists() {
            fs::create_dir_all(&path).ok()?;
        }

        let mut log_path = path;
        log_path.push(format!("{}_{}.log", Local::now().format("%Y-%m-%d"), name));

        Some(log_path)
    }
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }

    fn line(&self) -> String {
        format!(
            "{} {} {}",
            self.created_at.format("%F %X%.6f"),
            self.level,
            self.msg
        )
    }
}

pub fn info_file_async(log: String) {
    LOGGER.send(log::Level::Info, log);
}

pub fn warn_file_async(log: String) {
    LOGGER.send(log::Level::Warn, log);
}

pub fn error_file_async(log: String) {
    LOGGER.send(log::Level::Error, log);
}

pub fn debug_file_async(log: String) {
    LOGGER.send(log::Level::Debug, log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}
