//! Calendar-month arithmetic.
//!
//! Every series in this crate lives on a monthly grid, so we never carry full
//! dates past ingest. A `MonthPeriod` is a `(year, month)` pair with a total
//! order and cheap successor/offset operations via its month ordinal
//! (`year * 12 + month - 1`).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    /// Build a period; `month` must be in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `date` (the day is discarded).
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// Calendar quarter, `1..=4`.
    pub fn quarter(self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        let year = ordinal.div_euclid(12);
        let month = ordinal.rem_euclid(12) + 1;
        Self {
            year: year as i32,
            month: month as u32,
        }
    }

    /// Shift by `months` (negative moves backwards).
    pub fn offset(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    pub fn succ(self) -> Self {
        self.offset(1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(self, other: MonthPeriod) -> i64 {
        other.ordinal() - self.ordinal()
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        MonthPeriod::new(year, month).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

impl TryFrom<String> for MonthPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthPeriod> for String {
    fn from(value: MonthPeriod) -> Self {
        value.to_string()
    }
}

/// Inclusive span of months `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: MonthPeriod,
    pub end: MonthPeriod,
}

impl PeriodRange {
    /// Build a range; the endpoints are swapped if given in reverse.
    pub fn new(start: MonthPeriod, end: MonthPeriod) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Number of months covered (always >= 1).
    pub fn len(&self) -> usize {
        (self.start.months_until(self.end) + 1) as usize
    }

    pub fn contains(&self, period: MonthPeriod) -> bool {
        self.start <= period && period <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = MonthPeriod> {
        let start = self.start;
        (0..self.len() as i64).map(move |i| start.offset(i))
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(y: i32, m: u32) -> MonthPeriod {
        MonthPeriod::new(y, m).unwrap()
    }

    #[test]
    fn offset_crosses_year_boundaries() {
        assert_eq!(p(2024, 12).succ(), p(2025, 1));
        assert_eq!(p(2024, 1).offset(-1), p(2023, 12));
        assert_eq!(p(2024, 3).offset(25), p(2026, 4));
        assert_eq!(p(2023, 11).months_until(p(2024, 2)), 3);
    }

    #[test]
    fn quarter_and_parse() {
        assert_eq!(p(2024, 1).quarter(), 1);
        assert_eq!(p(2024, 6).quarter(), 2);
        assert_eq!(p(2024, 12).quarter(), 4);
        assert_eq!("2024-07".parse::<MonthPeriod>().unwrap(), p(2024, 7));
        assert!("2024-13".parse::<MonthPeriod>().is_err());
        assert!(MonthPeriod::new(2024, 0).is_none());
    }

    #[test]
    fn range_iterates_every_month() {
        let r = PeriodRange::new(p(2024, 11), p(2025, 2));
        let months: Vec<String> = r.iter().map(|m| m.to_string()).collect();
        assert_eq!(months, ["2024-11", "2024-12", "2025-01", "2025-02"]);
        assert_eq!(r.len(), 4);
        assert!(r.contains(p(2025, 1)));
        assert!(!r.contains(p(2025, 3)));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&p(2025, 3)).unwrap();
        assert_eq!(json, "\"2025-03\"");
        let back: MonthPeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p(2025, 3));
    }
}
