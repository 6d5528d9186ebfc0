// Usage analytics over API call logs
//
// All functions are pure: callers pass the logs and the current time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::catalog::{self, ApiProfile};

/// Projected monthly spend above this is flagged
pub const MONTHLY_COST_ALERT: f64 = 500.0;
/// Projected daily spend for one API above this is flagged
pub const DAILY_COST_ALERT: f64 = 10.0;

const TOP_CONSUMERS: usize = 10;
const MIN_HOURS_PASSED: f64 = 0.1;

/// One API call as recorded by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    pub api: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_latency")]
    pub latency_ms: f64,
}

fn default_status_code() -> u16 {
    200
}

fn default_country() -> String {
    "Unknown".to_string()
}

fn default_api_version() -> String {
    "v1.0".to_string()
}

fn default_endpoint() -> String {
    "/default".to_string()
}

fn default_latency() -> f64 {
    50.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiUsage {
    pub api: String,
    pub calls: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_calls: u64,
    pub total_cost: f64,
    pub average_latency_ms: f64,
    /// Calls answered with a 4xx or 5xx status
    pub error_calls: u64,
    pub error_rate: f64,
    /// Sorted by calls, busiest first
    pub per_api: Vec<ApiUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Consumer {
    pub user_id: String,
    pub calls: u64,
}

/// Calls grouped under one country, endpoint or version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallCount {
    pub key: String,
    pub calls: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaLevel {
    Ok,
    Low,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaStatus {
    pub api: String,
    pub quota_daily: u64,
    pub used_today: u64,
    pub remaining: i64,
    pub level: QuotaLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyProjection {
    pub calls: u64,
    pub cost: f64,
    pub days_passed: u32,
    pub days_in_month: u32,
    pub projected_cost: f64,
    pub high: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCostProjection {
    pub api: String,
    pub used_today: u64,
    pub hours_passed: f64,
    pub projected_calls: f64,
    pub projected_cost: f64,
    pub high: bool,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Midnight UTC of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()))
}

pub fn summarize(logs: &[UsageLog]) -> UsageSummary {
    let mut calls: HashMap<&str, u64> = HashMap::new();
    let mut latency_total = 0.0;
    for log in logs {
        *calls.entry(log.api.as_str()).or_insert(0) += 1;
        latency_total += log.latency_ms;
    }

    let mut per_api: Vec<ApiUsage> = calls
        .into_iter()
        .map(|(api, calls)| ApiUsage {
            api: api.to_string(),
            calls,
            cost: round3(calls as f64 * catalog::cost_per_call(api)),
        })
        .collect();
    per_api.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.api.cmp(&b.api)));

    let total_cost = logs
        .iter()
        .map(|log| catalog::cost_per_call(&log.api))
        .sum();
    let average_latency_ms = if logs.is_empty() {
        0.0
    } else {
        latency_total / logs.len() as f64
    };
    let error_calls = logs.iter().filter(|log| log.status_code >= 400).count() as u64;
    let error_rate = if logs.is_empty() {
        0.0
    } else {
        round3(error_calls as f64 / logs.len() as f64)
    };

    UsageSummary {
        total_calls: logs.len() as u64,
        total_cost,
        average_latency_ms,
        error_calls,
        error_rate,
        per_api,
    }
}

fn count_by<'a>(
    logs: impl Iterator<Item = &'a UsageLog>,
    key: fn(&UsageLog) -> &str,
) -> Vec<CallCount> {
    let mut calls: HashMap<&str, u64> = HashMap::new();
    for log in logs {
        *calls.entry(key(log)).or_insert(0) += 1;
    }

    let mut counts: Vec<CallCount> = calls
        .into_iter()
        .map(|(key, calls)| CallCount {
            key: key.to_string(),
            calls,
        })
        .collect();
    counts.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.key.cmp(&b.key)));
    counts
}

/// Calls per reporting country, busiest first
pub fn by_country(logs: &[UsageLog]) -> Vec<CallCount> {
    count_by(logs.iter(), |log| log.country.as_str())
}

/// Calls per endpoint of one API, busiest first
pub fn by_endpoint(logs: &[UsageLog], api: &str) -> Vec<CallCount> {
    count_by(logs.iter().filter(|log| log.api == api), |log| log.endpoint.as_str())
}

/// Calls per version of one API, busiest first
pub fn by_version(logs: &[UsageLog], api: &str) -> Vec<CallCount> {
    count_by(logs.iter().filter(|log| log.api == api), |log| log.api_version.as_str())
}

/// Heaviest users by call count
pub fn top_consumers(logs: &[UsageLog]) -> Vec<Consumer> {
    let mut calls: HashMap<&str, u64> = HashMap::new();
    for log in logs {
        *calls.entry(log.user_id.as_str()).or_insert(0) += 1;
    }

    let mut consumers: Vec<Consumer> = calls
        .into_iter()
        .map(|(user_id, calls)| Consumer {
            user_id: user_id.to_string(),
            calls,
        })
        .collect();
    consumers.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.user_id.cmp(&b.user_id)));
    consumers.truncate(TOP_CONSUMERS);
    consumers
}

/// Calls per day for one API across `start..=end`, with empty days as zero
pub fn daily_usage(logs: &[UsageLog], api: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyCount> {
    let mut counts: HashMap<NaiveDate, u64> = HashMap::new();
    for log in logs.iter().filter(|log| log.api == api) {
        *counts.entry(log.timestamp.date_naive()).or_insert(0) += 1;
    }

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| DailyCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

fn used_today(logs: &[UsageLog], api: &str, now: DateTime<Utc>) -> u64 {
    let today = start_of_day(now);
    logs.iter()
        .filter(|log| log.api == api && log.timestamp >= today)
        .count() as u64
}

pub fn quota_status(logs: &[UsageLog], profile: &ApiProfile, now: DateTime<Utc>) -> QuotaStatus {
    let used = used_today(logs, profile.name, now);
    let remaining = profile.quota_daily as i64 - used as i64;
    let level = if remaining <= 0 {
        QuotaLevel::Exceeded
    } else if (remaining as f64) < profile.quota_daily as f64 * 0.2 {
        QuotaLevel::Low
    } else {
        QuotaLevel::Ok
    };

    QuotaStatus {
        api: profile.name.to_string(),
        quota_daily: profile.quota_daily,
        used_today: used,
        remaining,
        level,
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

/// Month-to-date spend extrapolated to the whole month
pub fn monthly_projection(logs: &[UsageLog], now: DateTime<Utc>) -> MonthlyProjection {
    let month_start = start_of_day(now) - Duration::days(i64::from(now.day0()));
    let month_logs: Vec<&UsageLog> = logs
        .iter()
        .filter(|log| log.timestamp >= month_start && log.timestamp <= now)
        .collect();

    let cost: f64 = month_logs
        .iter()
        .map(|log| catalog::cost_per_call(&log.api))
        .sum();
    let days_passed = ((now - month_start).num_days() + 1).max(1) as u32;
    let days_in_month = days_in_month(now.year(), now.month());
    let projected_cost = cost / f64::from(days_passed) * f64::from(days_in_month);

    MonthlyProjection {
        calls: month_logs.len() as u64,
        cost,
        days_passed,
        days_in_month,
        projected_cost,
        high: projected_cost > MONTHLY_COST_ALERT,
    }
}

/// Today's calls for one API extrapolated to a full day
pub fn daily_cost_projection(
    logs: &[UsageLog],
    profile: &ApiProfile,
    now: DateTime<Utc>,
) -> DailyCostProjection {
    let used = used_today(logs, profile.name, now);
    let elapsed = now - start_of_day(now);
    let hours_passed = (elapsed.num_seconds() as f64 / 3600.0).max(MIN_HOURS_PASSED);
    let projected_calls = used as f64 / hours_passed * 24.0;
    let projected_cost = projected_calls * profile.cost_per_call;

    DailyCostProjection {
        api: profile.name.to_string(),
        used_today: used,
        hours_passed,
        projected_calls,
        projected_cost,
        high: projected_cost > DAILY_COST_ALERT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn log(api: &str, user: &str, timestamp: DateTime<Utc>, latency_ms: f64) -> UsageLog {
        UsageLog {
            api: api.to_string(),
            timestamp,
            user_id: user.to_string(),
            status_code: 200,
            country: "IN".to_string(),
            api_version: "v1.0".to_string(),
            endpoint: "/default".to_string(),
            latency_ms,
        }
    }

    #[test]
    fn test_summary_of_empty_period() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_calls, 0);
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.average_latency_ms, 0.0);
        assert!(summary.per_api.is_empty());
    }

    #[test]
    fn test_summary_costs_and_ordering() {
        let now = at(2024, 5, 10, 12);
        let logs = vec![
            log("Video API", "u1", now, 100.0),
            log("Weather API", "u1", now, 20.0),
            log("Weather API", "u2", now, 30.0),
            log("Mystery API", "u3", now, 50.0),
        ];

        let summary = summarize(&logs);
        assert_eq!(summary.total_calls, 4);
        assert!((summary.total_cost - 0.003).abs() < 1e-9);
        assert_eq!(summary.average_latency_ms, 50.0);
        assert_eq!(summary.per_api[0].api, "Weather API");
        assert_eq!(summary.per_api[0].calls, 2);
        assert_eq!(summary.per_api[0].cost, 0.001);
        let mystery = summary.per_api.iter().find(|a| a.api == "Mystery API").unwrap();
        assert_eq!(mystery.cost, 0.0);
    }

    #[test]
    fn test_error_rate_counts_failed_calls() {
        let now = at(2024, 5, 10, 12);
        let mut logs = vec![log("Image API", "u1", now, 10.0); 3];
        logs[0].status_code = 500;
        logs.push(UsageLog {
            status_code: 404,
            ..log("Image API", "u2", now, 10.0)
        });

        let summary = summarize(&logs);
        assert_eq!(summary.error_calls, 2);
        assert_eq!(summary.error_rate, 0.5);
        assert_eq!(summarize(&[]).error_rate, 0.0);
    }

    #[test]
    fn test_calls_by_country() {
        let now = at(2024, 5, 10, 12);
        let from = |country: &str| UsageLog {
            country: country.to_string(),
            ..log("Weather API", "u1", now, 10.0)
        };
        let logs = vec![from("Germany"), from("India"), from("Germany"), from("Unknown")];

        let countries = by_country(&logs);
        assert_eq!(
            countries[0],
            CallCount {
                key: "Germany".to_string(),
                calls: 2
            }
        );
        let keys: Vec<&str> = countries.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["Germany", "India", "Unknown"]);
        assert!(by_country(&[]).is_empty());
    }

    #[test]
    fn test_endpoint_and_version_breakdowns_stay_within_one_api() {
        let now = at(2024, 5, 10, 12);
        let call = |api: &str, endpoint: &str, version: &str| UsageLog {
            endpoint: endpoint.to_string(),
            api_version: version.to_string(),
            ..log(api, "u1", now, 10.0)
        };
        let logs = vec![
            call("Weather API", "/forecast", "v3.0"),
            call("Weather API", "/forecast", "v2.1"),
            call("Weather API", "/current", "v3.0"),
            call("Jokes API", "/random", "v1.0"),
        ];

        let endpoints = by_endpoint(&logs, "Weather API");
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].key, "/forecast");
        assert_eq!(endpoints[0].calls, 2);

        let versions = by_version(&logs, "Weather API");
        assert_eq!(versions[0].key, "v3.0");
        assert_eq!(versions[0].calls, 2);
        assert!(by_version(&logs, "Video API").is_empty());
    }

    #[test]
    fn test_top_consumers_caps_at_ten() {
        let now = at(2024, 5, 10, 12);
        let mut logs = Vec::new();
        for user in 0..12 {
            for _ in 0..=user {
                logs.push(log("Jokes API", &format!("user-{:02}", user), now, 10.0));
            }
        }

        let top = top_consumers(&logs);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].user_id, "user-11");
        assert_eq!(top[0].calls, 12);
    }

    #[test]
    fn test_daily_usage_zero_fills() {
        let logs = vec![
            log("Image API", "u1", at(2024, 5, 1, 9), 10.0),
            log("Image API", "u1", at(2024, 5, 3, 9), 10.0),
            log("Image API", "u2", at(2024, 5, 3, 18), 10.0),
            log("Video API", "u2", at(2024, 5, 2, 18), 10.0),
        ];
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();

        let counts: Vec<u64> = daily_usage(&logs, "Image API", start, end)
            .iter()
            .map(|day| day.count)
            .collect();
        assert_eq!(counts, vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_quota_levels() {
        let profile = ApiProfile {
            quota_daily: 10,
            ..*catalog::find("Image API").unwrap()
        };
        let now = at(2024, 5, 10, 12);
        let yesterday = at(2024, 5, 9, 12);

        let mut logs = vec![log("Image API", "u", yesterday, 1.0); 20];
        assert_eq!(quota_status(&logs, &profile, now).level, QuotaLevel::Ok);

        logs.extend(vec![log("Image API", "u", now, 1.0); 9]);
        let status = quota_status(&logs, &profile, now);
        assert_eq!(status.used_today, 9);
        assert_eq!(status.remaining, 1);
        assert_eq!(status.level, QuotaLevel::Low);

        logs.push(log("Image API", "u", now, 1.0));
        assert_eq!(quota_status(&logs, &profile, now).level, QuotaLevel::Exceeded);
    }

    #[test]
    fn test_monthly_projection() {
        let now = at(2024, 2, 10, 12);
        let logs = vec![
            log("Video API", "u", at(2024, 2, 1, 0), 1.0),
            log("Video API", "u", at(2024, 2, 9, 0), 1.0),
            log("Video API", "u", at(2024, 1, 31, 23), 1.0),
        ];

        let projection = monthly_projection(&logs, now);
        assert_eq!(projection.calls, 2);
        assert_eq!(projection.days_passed, 10);
        assert_eq!(projection.days_in_month, 29);
        assert!((projection.projected_cost - 0.004 / 10.0 * 29.0).abs() < 1e-9);
        assert!(!projection.high);
    }

    #[test]
    fn test_first_day_of_month_counts_as_one_day() {
        let projection = monthly_projection(&[], at(2024, 12, 1, 0));
        assert_eq!(projection.days_passed, 1);
        assert_eq!(projection.days_in_month, 31);
    }

    #[test]
    fn test_daily_cost_projection() {
        let profile = catalog::find("Video API").unwrap();
        let now = at(2024, 5, 10, 6);
        let logs = vec![log("Video API", "u", at(2024, 5, 10, 1), 1.0); 3000];

        let projection = daily_cost_projection(&logs, profile, now);
        assert_eq!(projection.hours_passed, 6.0);
        assert_eq!(projection.projected_calls, 12000.0);
        assert!((projection.projected_cost - 24.0).abs() < 1e-9);
        assert!(projection.high);
    }

    #[test]
    fn test_daily_cost_projection_at_midnight() {
        let profile = catalog::find("Jokes API").unwrap();
        let projection = daily_cost_projection(&[], profile, at(2024, 5, 10, 0));
        assert_eq!(projection.hours_passed, 0.1);
        assert_eq!(projection.projected_calls, 0.0);
    }

    #[test]
    fn test_log_defaults_when_fields_missing() {
        let parsed: UsageLog = serde_json::from_str(
            r#"{"api":"Jokes API","timestamp":"2024-05-10T06:00:00Z","user_id":"u1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.endpoint, "/default");
        assert_eq!(parsed.latency_ms, 50.0);
    }
}
