use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;
use time::macros::format_description;

/// Reporting window accepted by the analytics endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Year => "1y",
            TimeRange::All => "all",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = RangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "90d" => Ok(TimeRange::Quarter),
            "1y" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(RangeError::UnknownRange(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("unknown time range `{0}` (expected 7d, 30d, 90d, 1y or all)")]
    UnknownRange(String),
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("start date {start} is after end date {end}")]
    Inverted { start: String, end: String },
}

/// Arguments shared by every analytics read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRange {
    pub range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl AnalyticsRange {
    pub fn last(range: TimeRange) -> Self {
        Self {
            range,
            start_date: None,
            end_date: None,
        }
    }

    /// Pin the window to explicit calendar dates.
    pub fn between(mut self, start: Date, end: Date) -> Result<Self, RangeError> {
        let start_text = format_date(start)?;
        let end_text = format_date(end)?;
        if start > end {
            return Err(RangeError::Inverted {
                start: start_text,
                end: end_text,
            });
        }
        self.start_date = Some(start_text);
        self.end_date = Some(end_text);
        Ok(self)
    }
}

pub fn parse_date(value: &str) -> Result<Date, RangeError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| RangeError::InvalidDate(value.to_string()))
}

fn format_date(date: Date) -> Result<String, RangeError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|_| RangeError::InvalidDate(date.to_string()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_users: u64,
    pub active_users: u64,
    pub new_users: u64,
    pub total_courses: u64,
    pub total_livestreams: u64,
    pub total_documents: u64,
    pub revenue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePerformance {
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub enrollments: u64,
    #[serde(default)]
    pub completion_rate: Option<f64>,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LivestreamAnalytics {
    pub total_sessions: u64,
    pub total_viewers: u64,
    pub peak_viewers: u64,
    pub average_duration_minutes: f64,
}
