//! Aggregates for the analysis centre and the dashboard.
//!
//! The store does the counting; these functions shape the counts into the
//! payloads the console renders.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::alert::{Alert, AlertStatus};

pub const DEFAULT_CRITICAL_THRESHOLD: u8 = 85;
pub const TOP_CRITICAL: usize = 3;
const DASHBOARD_DAYS: i64 = 7;

/// Faible below 30, Critique from 70.
pub const ANALYSIS_BANDS: (u8, u8) = (30, 70);
/// LOW below 35, HIGH from 65.
pub const DASHBOARD_BANDS: (u8, u8) = (35, 65);

/// Whole-table figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertTotals {
    pub count: u64,
    /// Alerts that left the NEW status.
    pub analyzed: u64,
    pub average_risk: f64,
}

/// Alerts split by risk score at two thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl BandCounts {
    pub fn tally(scores: impl IntoIterator<Item = u8>, medium_from: u8, high_from: u8) -> Self {
        let mut bands = Self::default();
        for score in scores {
            match score {
                s if s >= high_from => bands.high += 1,
                s if s >= medium_from => bands.medium += 1,
                _ => bands.low += 1,
            }
        }
        bands
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub name: &'static str,
    pub value: u64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub global_risk_score: f64,
    pub analyzed_count: u64,
    pub top_entities: Vec<serde_json::Value>,
    pub threat_distribution: Vec<DistributionSlice>,
}

/// `bands` split at [`ANALYSIS_BANDS`].
pub fn analysis_stats(totals: &AlertTotals, bands: &BandCounts) -> AnalysisStats {
    AnalysisStats {
        global_risk_score: (totals.average_risk * 100.0).round() / 100.0,
        analyzed_count: totals.analyzed,
        top_entities: Vec::new(),
        threat_distribution: vec![
            DistributionSlice {
                name: "Faible",
                value: bands.low,
                color: "#10B981",
            },
            DistributionSlice {
                name: "Moyen",
                value: bands.medium,
                color: "#F59E0B",
            },
            DistributionSlice {
                name: "Critique",
                value: bands.high,
                color: "#EF4444",
            },
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub incidents_by_day: Vec<DayCount>,
    pub incidents_by_risk: BTreeMap<&'static str, u64>,
    pub incidents_by_status: BTreeMap<&'static str, u64>,
}

/// Midnight UTC opening the seven-day dashboard window.
pub fn dashboard_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() - Duration::days(DASHBOARD_DAYS - 1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Every day of the window is listed, oldest first, including empty ones.
/// `bands` split at [`DASHBOARD_BANDS`].
pub fn dashboard_stats(
    days: &[DayCount],
    bands: &BandCounts,
    by_status: &[(AlertStatus, u64)],
    now: DateTime<Utc>,
) -> DashboardStats {
    let start = dashboard_window_start(now).date_naive();
    let mut per_day: BTreeMap<NaiveDate, u64> = (0..DASHBOARD_DAYS)
        .map(|offset| (start + Duration::days(offset), 0))
        .collect();
    for day in days {
        if let Some(count) = per_day.get_mut(&day.date) {
            *count += day.count;
        }
    }

    let mut statuses: BTreeMap<&'static str, u64> =
        AlertStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for (status, count) in by_status {
        *statuses.entry(status.as_str()).or_default() += count;
    }

    DashboardStats {
        incidents_by_day: per_day
            .into_iter()
            .map(|(date, count)| DayCount { date, count })
            .collect(),
        incidents_by_risk: BTreeMap::from([
            ("HIGH", bands.high),
            ("MEDIUM", bands.medium),
            ("LOW", bands.low),
        ]),
        incidents_by_status: statuses,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    pub current_week_count: u64,
    pub previous_week_count: u64,
    pub delta_percent: f64,
}

/// Starts of the current and previous rolling seven-day windows.
pub fn weekly_windows(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(7), now - Duration::days(14))
}

pub fn weekly_stats(current: u64, previous: u64) -> WeeklyStats {
    let delta_percent = if previous == 0 {
        if current > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        let raw = (current as f64 - previous as f64) / previous as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    };
    WeeklyStats {
        current_week_count: current,
        previous_week_count: previous,
        delta_percent,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalThreat {
    pub uuid: String,
    pub title: String,
    pub risk_score: u8,
    pub source_type: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalThreats {
    pub count: u64,
    pub top_alerts: Vec<CriticalThreat>,
}

/// `top` is already ordered riskiest first.
pub fn critical_threats(count: u64, top: &[Alert]) -> CriticalThreats {
    CriticalThreats {
        count,
        top_alerts: top
            .iter()
            .take(TOP_CRITICAL)
            .map(|a| CriticalThreat {
                uuid: a.id().to_string(),
                title: format!("Menace {} ({})", a.source_type(), a.risk_score()),
                risk_score: a.risk_score(),
                source_type: a.source_type().to_string(),
                status: a.status(),
                created_at: a.created_at(),
            })
            .collect(),
    }
}
