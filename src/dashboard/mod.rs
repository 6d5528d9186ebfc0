// Operator analytics: API catalog, usage summaries, quotas and projections

pub mod catalog;
pub mod usage;

pub use catalog::{ApiProfile, Release, CATALOG};
pub use usage::{
    by_country, by_endpoint, by_version, daily_cost_projection, daily_usage, monthly_projection,
    quota_status, summarize, top_consumers, ApiUsage, CallCount, Consumer, DailyCostProjection,
    DailyCount, MonthlyProjection, QuotaLevel, QuotaStatus, UsageLog, UsageSummary,
};
