use chrono::{DateTime, Local, TimeZone, Utc};

/// 畫面上統一使用的時間格式
const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Formats a unix timestamp (seconds) as local `HH:MM:SS`.
///
/// Timestamps chrono can't represent fall back to the epoch.
pub fn format_unix(ts: i64) -> String {
    let dt = Local
        .timestamp_opt(ts, 0)
        .single()
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local));
    format_clock(&dt)
}

pub fn format_clock(dt: &DateTime<Local>) -> String {
    dt.format(CLOCK_FORMAT).to_string()
}

pub fn now_unix() -> i64 {
    Local::now().timestamp()
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_format_unix() {
        let expected = Local.timestamp_opt(1700000000, 0).unwrap();
        let text = format_unix(1700000000);
        assert_eq!(
            text,
            format!(
                "{:02}:{:02}:{:02}",
                expected.hour(),
                expected.minute(),
                expected.second()
            )
        );
        assert_eq!(text.len(), 8);
    }

    #[test]
    fn test_format_unix_out_of_range() {
        assert_eq!(format_unix(i64::MAX), format_unix(0));
    }
}
