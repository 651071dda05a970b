use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::IdError;

const FORMAT: &str = "%d%m%Y";

/// Calendar date of a purchase, return or exchange, written `ddMMyyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    /// Parses a `ddMMyyyy` date.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != 8 {
            return Err(IdError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, FORMAT)
            .map(Self)
            .map_err(|_| IdError::InvalidDate(s.to_string()))
    }

    /// Wraps a calendar date.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Returns the underlying calendar date.
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the date `days` later, saturating at the calendar maximum.
    pub fn plus_days(&self, days: u64) -> Self {
        Self(self.0.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX))
    }

    /// True if `later` is at most `window_days` after this date.
    ///
    /// The last day of the window is still inside it.
    pub fn within_days(&self, later: TradeDate, window_days: u64) -> bool {
        later <= self.plus_days(window_days)
    }
}

impl std::fmt::Display for TradeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl FromStr for TradeDate {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TradeDate {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TradeDate> for String {
    fn from(date: TradeDate) -> Self {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders_ddmmyyyy() {
        let date = TradeDate::parse("01012025").unwrap();
        assert_eq!(date.as_naive(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(date.to_string(), "01012025");
    }

    #[test]
    fn rejects_other_layouts() {
        assert!(TradeDate::parse("2025-01-01").is_err());
        assert!(TradeDate::parse("1012025").is_err());
        assert!(TradeDate::parse("32012025").is_err());
        assert!(TradeDate::parse("").is_err());
    }

    #[test]
    fn window_includes_its_last_day() {
        let bought = TradeDate::parse("01012025").unwrap();
        assert!(bought.within_days(bought, 30));
        assert!(bought.within_days(TradeDate::parse("31012025").unwrap(), 30));
        assert!(!bought.within_days(TradeDate::parse("01022025").unwrap(), 30));
    }

    #[test]
    fn window_crosses_month_and_leap_boundaries() {
        let bought = TradeDate::parse("15022024").unwrap();
        assert_eq!(bought.plus_days(30).to_string(), "16032024");
        assert!(bought.within_days(TradeDate::parse("16032024").unwrap(), 30));
        assert!(!bought.within_days(TradeDate::parse("17032024").unwrap(), 30));
    }
}
