//! Date and time tools.

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{Map, Value};

use super::{ParamSpec, Tool};

/// Today's local date as `YYYY-MM-DD`.
pub struct CurrentDate;

#[async_trait]
impl Tool for CurrentDate {
    fn name(&self) -> &str {
        "current_date"
    }

    fn description(&self) -> &str {
        "Get the current local date in YYYY-MM-DD format, e.g. 2024-01-15."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
        Ok(Value::String(Local::now().format("%Y-%m-%d").to_string()))
    }
}

/// The local date and time as `YYYY-MM-DD HH:MM:SS`.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time in YYYY-MM-DD HH:MM:SS format, e.g. 2024-01-15 14:30:25."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
        Ok(Value::String(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

pub struct CurrentTimestamp;

#[async_trait]
impl Tool for CurrentTimestamp {
    fn name(&self) -> &str {
        "current_timestamp"
    }

    fn description(&self) -> &str {
        "Get the current Unix timestamp in seconds."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
        Ok(Value::String(Utc::now().timestamp().to_string()))
    }
}

pub struct CurrentUtcTime;

#[async_trait]
impl Tool for CurrentUtcTime {
    fn name(&self) -> &str {
        "current_utc_time"
    }

    fn description(&self) -> &str {
        "Get the current UTC date and time in YYYY-MM-DD HH:MM:SS UTC format."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn execute(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
        Ok(Value::String(
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn current_date_is_iso_formatted() {
        let out = CurrentDate.execute(&Map::new()).await.unwrap();
        let s = out.as_str().unwrap();
        assert!(NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(), "{s}");
    }

    #[tokio::test]
    async fn timestamp_is_numeric() {
        let out = CurrentTimestamp.execute(&Map::new()).await.unwrap();
        let secs: i64 = out.as_str().unwrap().parse().unwrap();
        assert!(secs > 1_600_000_000);
    }

    #[tokio::test]
    async fn utc_time_has_suffix() {
        let out = CurrentUtcTime.execute(&Map::new()).await.unwrap();
        assert!(out.as_str().unwrap().ends_with(" UTC"));
    }
}
