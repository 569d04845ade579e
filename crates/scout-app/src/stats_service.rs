use chrono::{DateTime, Utc};

use scout_core::alert::AlertStatus;
use scout_core::stats::{
    analysis_stats, critical_threats, dashboard_stats, dashboard_window_start, weekly_stats,
    weekly_windows, AnalysisStats, CriticalThreats, DashboardStats, WeeklyStats, ANALYSIS_BANDS,
    DASHBOARD_BANDS, TOP_CRITICAL,
};
use scout_ports::outbound::{AlertMetrics, ReportRepository, SourceRepository};

use crate::error::AppError;

/// Read-only aggregates for the analysis centre and the dashboard.
pub struct StatsService<A, S, R>
where
    A: AlertMetrics,
    S: SourceRepository,
    R: ReportRepository,
{
    alerts: A,
    sources: S,
    reports: R,
}

impl<A, S, R> StatsService<A, S, R>
where
    A: AlertMetrics,
    S: SourceRepository,
    R: ReportRepository,
{
    pub fn new(alerts: A, sources: S, reports: R) -> Self {
        Self {
            alerts,
            sources,
            reports,
        }
    }

    pub async fn analysis(&self) -> Result<AnalysisStats, AppError> {
        let totals = self.alerts.totals().await?;
        let (medium_from, high_from) = ANALYSIS_BANDS;
        let bands = self.alerts.count_by_risk_band(medium_from, high_from).await?;
        Ok(analysis_stats(&totals, &bands))
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardStats, AppError> {
        let days = self.alerts.count_by_day(dashboard_window_start(now)).await?;
        let (medium_from, high_from) = DASHBOARD_BANDS;
        let bands = self.alerts.count_by_risk_band(medium_from, high_from).await?;
        let by_status = self.alerts.count_by_status().await?;
        Ok(dashboard_stats(&days, &bands, &by_status, now))
    }

    pub async fn weekly(&self, now: DateTime<Utc>) -> Result<WeeklyStats, AppError> {
        let (week_start, previous_start) = weekly_windows(now);
        let current = self.alerts.count_created_since(week_start).await?;
        let both = self.alerts.count_created_since(previous_start).await?;
        Ok(weekly_stats(current, both.saturating_sub(current)))
    }

    /// Confirmed alerts at or above the threshold, riskiest first.
    pub async fn critical_threats(&self, threshold: u8) -> Result<CriticalThreats, AppError> {
        let (count, top) = self
            .alerts
            .riskiest(AlertStatus::Confirmed, threshold, TOP_CRITICAL)
            .await?;
        Ok(critical_threats(count, &top))
    }

    pub async fn sources_active(&self) -> Result<u64, AppError> {
        Ok(self.sources.count_active().await?)
    }

    pub async fn reports_count(&self) -> Result<u64, AppError> {
        Ok(self.reports.count().await?)
    }
}
