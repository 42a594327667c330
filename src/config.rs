use std::{env, fmt, path::PathBuf, str::FromStr};

use config::{Config as config_config, File as config_file, FileFormat};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{error::WatcherError, logging};

/// 使用者家目錄下的設定檔名稱
const USER_CONFIG_NAME: &str = ".stocks.json";
/// 隨程式附帶的預設設定檔
const BUNDLED_CONFIG_PATH: &str = "stocks.json";

const STOCKS_CONFIG: &str = "STOCKS_CONFIG";
const STOCKS_REFRESH_INTERVAL: &str = "STOCKS_REFRESH_INTERVAL";
const STOCKS_NOTIFICATIONS: &str = "STOCKS_NOTIFICATIONS";
const STOCKS_AT_SIGNALS: &str = "STOCKS_AT_SIGNALS";
const STOCKS_API_HOST: &str = "STOCKS_API_HOST";
const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";

pub const DEFAULT_API_HOST: &str = "https://www.biznesradar.pl";
const DEFAULT_REFRESH_INTERVAL: u64 = 60;

/// 監看清單中的一檔商品，`id` 為資料來源認得的代號
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchedInstrument {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// 指數類商品排序時優先
    #[serde(rename = "index", default)]
    pub is_index: bool,
}

impl WatchedInstrument {
    pub fn new(name: &str, id: &str, is_index: bool) -> Self {
        WatchedInstrument {
            name: name.to_string(),
            id: id.to_string(),
            is_index,
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Telegram {
    #[serde(default)]
    pub token: String,
    #[serde(rename = "chatIds", alias = "chatids", default)]
    pub chat_ids: Vec<i64>,
}

impl Telegram {
    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty() && !self.chat_ids.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub stocks: Vec<WatchedInstrument>,
    /// 刷新間隔(秒)
    #[serde(
        rename = "refreshInterval",
        alias = "refreshinterval",
        default = "default_refresh_interval"
    )]
    pub refresh_interval: u64,
    #[serde(default)]
    pub notifications: bool,
    /// 是否一併抓取技術指標
    #[serde(rename = "atSignals", alias = "atsignals", default)]
    pub at_signals: bool,
    /// 最後一次成功刷新的 unix 秒數
    #[serde(rename = "lastCheck", alias = "lastcheck", default)]
    pub last_check: i64,
    #[serde(rename = "apiHost", alias = "apihost", default = "default_api_host")]
    pub api_host: String,
    #[serde(default)]
    pub telegram: Telegram,
}

impl Default for App {
    fn default() -> Self {
        App {
            stocks: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            notifications: false,
            at_signals: false,
            last_check: 0,
            api_host: DEFAULT_API_HOST.to_string(),
            telegram: Telegram::default(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

impl App {
    /// 讀取設定檔
    ///
    /// 順序：指定路徑(`--config` 或 `STOCKS_CONFIG`) → `$HOME/.stocks.json` → `stocks.json`。
    /// 指定路徑不存在、或全部都找不到時回傳錯誤；找到了但內容有誤也直接回傳錯誤，不會往下一個退。
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, WatcherError> {
        let explicit = explicit.or_else(|| env::var(STOCKS_CONFIG).ok().map(PathBuf::from));
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(WatcherError::Config(format!("{:?} does not exist", path)));
            }
            return Self::from_path(&path);
        }

        let user_path = user_config_path();
        if let Some(path) = user_path.as_ref().filter(|p| p.exists()) {
            return Self::from_path(path);
        }

        logging::info_console(format!(
            "no {} file in HOME directory, using default stocks file",
            USER_CONFIG_NAME
        ));

        let bundled = PathBuf::from(BUNDLED_CONFIG_PATH);
        if bundled.exists() {
            return Self::from_path(&bundled);
        }

        Err(WatcherError::ConfigMissing {
            user: user_path,
            bundled,
        })
    }

    fn from_path(path: &PathBuf) -> Result<Self, WatcherError> {
        let config: App = config_config::builder()
            .add_source(config_file::from(path.as_path()).format(FileFormat::Json))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|why| WatcherError::Config(format!("{:?}: {}", path, why)))?;

        logging::info_file_async(format!(
            "config loaded from {:?} with {} stocks",
            path,
            config.stocks.len()
        ));

        config.override_with_env().validate()
    }

    /// 直接由 JSON 文字建立設定，不套用環境變數
    pub fn from_json(text: &str) -> Result<Self, WatcherError> {
        let config: App = config_config::builder()
            .add_source(config_file::from_str(text, FileFormat::Json))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|why| WatcherError::Config(why.to_string()))?;

        config.validate()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(interval) = env::var(STOCKS_REFRESH_INTERVAL) {
            match u64::from_str(&interval) {
                Ok(i) => self.refresh_interval = i,
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse {}={} because {:?}",
                    STOCKS_REFRESH_INTERVAL, interval, why
                )),
            }
        }

        if let Ok(notifications) = env::var(STOCKS_NOTIFICATIONS) {
            self.notifications = parse_flag(&notifications);
        }

        if let Ok(at_signals) = env::var(STOCKS_AT_SIGNALS) {
            self.at_signals = parse_flag(&at_signals);
        }

        if let Ok(host) = env::var(STOCKS_API_HOST) {
            self.api_host = host;
        }

        if let Ok(token) = env::var(TELEGRAM_TOKEN) {
            self.telegram.token = token;
        }

        self
    }

    fn validate(mut self) -> Result<Self, WatcherError> {
        if self.refresh_interval == 0 {
            return Err(WatcherError::Config(
                "refreshInterval must be at least 1 second".to_string(),
            ));
        }

        if let Some(s) = self.stocks.iter().find(|s| s.id.trim().is_empty()) {
            return Err(WatcherError::Config(format!(
                "stock '{}' has an empty id",
                s.name
            )));
        }

        self.api_host = self.api_host.trim_end_matches('/').to_string();

        Ok(self)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 回傳 `$HOME/.stocks.json`
fn user_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(USER_CONFIG_NAME))
}

/// 商品代號在設定檔內可能寫成字串或數字
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl de::Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or an integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
