use rust_decimal::Decimal;
use strum::{AsRefStr, Display};

use crate::config::WatchedInstrument;

/// 漲跌方向，字串值同時作為畫面上的樣式類別
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
pub enum Direction {
    #[strum(serialize = "up")]
    Up,
    #[strum(serialize = "no-change")]
    NoChange,
    #[strum(serialize = "down")]
    Down,
}

impl Direction {
    /// 依漲跌幅的正負號判斷方向
    pub fn from_change(change: Decimal) -> Self {
        if change > Decimal::ZERO {
            Direction::Up
        } else if change < Decimal::ZERO {
            Direction::Down
        } else {
            Direction::NoChange
        }
    }

    /// 技術指標的評分 {1,2} 為多、{-1,-2} 為空，其餘一律視為持平
    pub fn from_action_score(score: i64) -> Self {
        match score {
            1 | 2 => Direction::Up,
            -1 | -2 => Direction::Down,
            _ => Direction::NoChange,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => " ▲ ",
            Direction::NoChange => " ▬ ",
            Direction::Down => " ▼ ",
        }
    }
}

/// 單一商品在一輪刷新中取得的報價
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub display_name: String,
    pub current_price: Decimal,
    pub previous_close: Decimal,
    /// 最後成交時間(unix 秒)
    pub last_transaction_time: i64,
    /// 成交值，來源沒有提供時為 None
    pub volume_value: Option<Decimal>,
    /// 外部連結用的代號
    pub external_link_id: String,
}

impl QuoteSnapshot {
    /// 漲跌幅(%)，昨收為零時視為沒有變化
    pub fn percent_change(&self) -> Decimal {
        (self.current_price - self.previous_close)
            .checked_div(self.previous_close)
            .map(|ratio| ratio * Decimal::ONE_HUNDRED)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_change(self.percent_change())
    }
}

/// 單一技術指標
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub value: String,
    pub action_score: i64,
}

impl Signal {
    pub fn direction(&self) -> Direction {
        Direction::from_action_score(self.action_score)
    }
}

/// 技術指標總結
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub action_name: String,
    pub action_score: i64,
    pub buy: i64,
    pub sell: i64,
    pub neutral: i64,
}

impl Summary {
    pub fn direction(&self) -> Direction {
        Direction::from_action_score(self.action_score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub moving_average: Signal,
    pub rsi: Signal,
    pub stochastic: Signal,
    pub macd: Signal,
    pub summary: Summary,
}

impl IndicatorSnapshot {
    /// 畫面上的顯示順序
    pub fn signals(&self) -> [&Signal; 4] {
        [&self.moving_average, &self.rsi, &self.stochastic, &self.macd]
    }
}

/// 交給畫面繪製的最小單位
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    pub instrument: WatchedInstrument,
    pub snapshot: QuoteSnapshot,
    pub indicators: Option<IndicatorSnapshot>,
}

impl RenderRecord {
    /// 指數在前，同組內依名稱排序
    pub fn sort(records: &mut [RenderRecord]) {
        records.sort_by(|a, b| {
            b.instrument
                .is_index
                .cmp(&a.instrument.is_index)
                .then_with(|| a.instrument.name.cmp(&b.instrument.name))
        });
    }
}
