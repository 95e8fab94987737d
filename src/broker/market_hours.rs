//! Exchange session clock: pure functions over IST.
//!
//! The exchange runs 09:15-15:30 IST, Monday to Friday. IST is a fixed
//! UTC+05:30 offset with no daylight saving, so a `FixedOffset` suffices.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn market_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).unwrap()
}

fn market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).unwrap()
}

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap()
}

fn is_trading_day(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// True when the exchange is open at the given IST instant. Both the open
/// and close bounds are inclusive.
pub fn is_market_open_at(now_ist: DateTime<FixedOffset>) -> bool {
    let time = now_ist.time();
    is_trading_day(now_ist.weekday()) && time >= market_open() && time <= market_close()
}

/// The start of the next trading session strictly after `now_ist`. Rolls
/// forward across weekends (Friday after close, Saturday and Sunday all
/// resolve to Monday 09:15).
pub fn next_session_start(now_ist: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    if is_trading_day(now_ist.weekday()) && now_ist.time() < market_open() {
        return at_market_open(now_ist);
    }

    let mut next = now_ist + Duration::days(1);
    while !is_trading_day(next.weekday()) {
        next += Duration::days(1);
    }
    at_market_open(next)
}

fn at_market_open(day: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    day.with_hour(9)
        .and_then(|d| d.with_minute(15))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .expect("09:15 is always a valid IST wall-clock time")
}

/// Session status report exposed alongside refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatus {
    pub is_open: bool,
    pub current_time_ist: String,
    pub market_open_time: String,
    pub market_close_time: String,
    pub is_weekday: bool,
    pub next_session: String,
}

pub fn market_status_at(now_ist: DateTime<FixedOffset>) -> MarketStatus {
    MarketStatus {
        is_open: is_market_open_at(now_ist),
        current_time_ist: now_ist.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        market_open_time: "09:15".to_string(),
        market_close_time: "15:30".to_string(),
        is_weekday: is_trading_day(now_ist.weekday()),
        next_session: next_session_start(now_ist)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
    }
}

pub fn market_status_now() -> MarketStatus {
    market_status_at(Utc::now().with_timezone(&ist()))
}
