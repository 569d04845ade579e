//! In-memory port implementations shared by the service tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use scout_core::alert::{Alert, AlertStatus};
use scout_core::events::DomainEvent;
use scout_core::evidence::{content_hash, Evidence};
use scout_core::ids::UserId;
use scout_core::report::Report;
use scout_core::shield::ShieldDispatch;
use scout_core::source::{MonitoringSource, ScrapingRun};
use scout_core::stats::{AlertTotals, BandCounts, DayCount};
use scout_core::user::{Session, User};
use scout_ports::error::PortError;
use scout_ports::outbound::*;
use scout_ports::types::{AlertFilter, Page, PurgedRows, ScanTask, StoredArtifact};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

fn upsert<T: Clone>(items: &Mutex<Vec<T>>, item: &T, same: impl Fn(&T) -> bool) {
    let mut items = items.lock().unwrap();
    match items.iter_mut().find(|i| same(i)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

#[derive(Default)]
pub struct MockAlertRepo {
    pub alerts: Mutex<Vec<Alert>>,
}

impl MockAlertRepo {
    pub fn with(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
        }
    }

    pub fn get(&self, id: &str) -> Alert {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id().to_string() == id)
            .cloned()
            .unwrap()
    }

    fn matching(&self, filter: &AlertFilter) -> Vec<Alert> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        self.newest_first()
            .into_iter()
            .filter(|a| filter.status.map_or(true, |s| a.status() == s))
            .filter(|a| !filter.citizen_only || a.is_citizen())
            .filter(|a| filter.owner.is_none() || a.owner_user_id() == filter.owner.as_ref())
            .filter(|a| match (&search, a.citizen()) {
                (None, _) => true,
                (Some(q), Some(c)) => {
                    c.phone_number.to_lowercase().contains(q)
                        || c.message.to_lowercase().contains(q)
                }
                (Some(_), None) => false,
            })
            .collect()
    }

    fn newest_first(&self) -> Vec<Alert> {
        let mut alerts = self.alerts.lock().unwrap().clone();
        alerts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        alerts
    }
}

#[async_trait]
impl AlertRepository for MockAlertRepo {
    async fn save(&self, alert: &Alert) -> Result<(), PortError> {
        upsert(&self.alerts, alert, |a| a.id() == alert.id());
        Ok(())
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Alert>, PortError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id().to_string() == id)
            .cloned())
    }
    async fn find_by_filter(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError> {
        Ok(paginate(self.matching(filter), filter.page))
    }
    async fn count_by_filter(&self, filter: &AlertFilter) -> Result<u64, PortError> {
        Ok(self.matching(filter).len() as u64)
    }
    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Alert>, PortError> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|a| a.citizen().is_some_and(|c| c.phone_number == phone))
            .collect())
    }
}

#[async_trait]
impl AlertMetrics for MockAlertRepo {
    async fn totals(&self) -> Result<AlertTotals, PortError> {
        let alerts = self.alerts.lock().unwrap();
        let count = alerts.len() as u64;
        let sum: u64 = alerts.iter().map(|a| u64::from(a.risk_score())).sum();
        Ok(AlertTotals {
            count,
            analyzed: alerts.iter().filter(|a| a.status() != AlertStatus::New).count() as u64,
            average_risk: if count == 0 { 0.0 } else { sum as f64 / count as f64 },
        })
    }
    async fn count_by_risk_band(
        &self,
        medium_from: u8,
        high_from: u8,
    ) -> Result<BandCounts, PortError> {
        let alerts = self.alerts.lock().unwrap();
        Ok(BandCounts::tally(alerts.iter().map(Alert::risk_score), medium_from, high_from))
    }
    async fn count_by_status(&self) -> Result<Vec<(AlertStatus, u64)>, PortError> {
        let mut counts: BTreeMap<&'static str, (AlertStatus, u64)> = BTreeMap::new();
        for alert in self.alerts.lock().unwrap().iter() {
            counts.entry(alert.status().as_str()).or_insert((alert.status(), 0)).1 += 1;
        }
        Ok(counts.into_values().collect())
    }
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.created_at() >= since)
            .count() as u64)
    }
    async fn count_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DayCount>, PortError> {
        let mut days = BTreeMap::new();
        for alert in self.alerts.lock().unwrap().iter() {
            if alert.created_at() >= since {
                *days.entry(alert.created_at().date_naive()).or_insert(0) += 1;
            }
        }
        Ok(days
            .into_iter()
            .map(|(date, count)| DayCount { date, count })
            .collect())
    }
    async fn riskiest(
        &self,
        status: AlertStatus,
        min_risk: u8,
        limit: usize,
    ) -> Result<(u64, Vec<Alert>), PortError> {
        let mut matching: Vec<Alert> = self
            .newest_first()
            .into_iter()
            .filter(|a| a.status() == status && a.risk_score() >= min_risk)
            .collect();
        matching.sort_by(|a, b| b.risk_score().cmp(&a.risk_score()));
        let count = matching.len() as u64;
        matching.truncate(limit);
        Ok((count, matching))
    }
}

/// Records purged alert ids and answers with canned row counts.
#[derive(Default)]
pub struct MockPurge {
    pub purged: Mutex<Vec<String>>,
    pub rows: PurgedRows,
    pub failing: bool,
}

impl MockPurge {
    pub fn removing(rows: PurgedRows) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl IncidentPurge for MockPurge {
    async fn purge(&self, alert_id: &str) -> Result<Option<PurgedRows>, PortError> {
        if self.failing {
            return Err(PortError::Persistence("database is locked".into()));
        }
        self.purged.lock().unwrap().push(alert_id.to_string());
        Ok(Some(self.rows))
    }
}

#[derive(Default)]
pub struct MockEvidenceRepo {
    pub evidences: Mutex<Vec<Evidence>>,
}

#[async_trait]
impl EvidenceRepository for MockEvidenceRepo {
    async fn insert(&self, evidence: &Evidence) -> Result<(), PortError> {
        let mut evidences = self.evidences.lock().unwrap();
        if evidences.iter().any(|e| e.file_hash() == evidence.file_hash()) {
            return Err(PortError::Conflict(evidence.file_hash().to_string()));
        }
        evidences.push(evidence.clone());
        Ok(())
    }
    async fn save(&self, evidence: &Evidence) -> Result<(), PortError> {
        upsert(&self.evidences, evidence, |e| e.id() == evidence.id());
        Ok(())
    }
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Evidence>, PortError> {
        Ok(self
            .evidences
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.file_hash() == hash)
            .cloned())
    }
    async fn find_by_file_name(&self, name: &str) -> Result<Option<Evidence>, PortError> {
        Ok(self
            .evidences
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.file_name() == name)
            .cloned())
    }
    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Evidence>, PortError> {
        Ok(self
            .evidences
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.alert_id().to_string() == alert_id)
            .cloned()
            .collect())
    }
    async fn list(&self, page: Page) -> Result<Vec<Evidence>, PortError> {
        let mut evidences = self.evidences.lock().unwrap().clone();
        evidences.sort_by(|a, b| b.captured_at().cmp(&a.captured_at()));
        Ok(paginate(evidences, page))
    }
}

#[derive(Default)]
pub struct MockReportRepo {
    pub reports: Mutex<Vec<Report>>,
}

#[async_trait]
impl ReportRepository for MockReportRepo {
    async fn save(&self, report: &Report) -> Result<(), PortError> {
        upsert(&self.reports, report, |r| r.id() == report.id());
        Ok(())
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Report>, PortError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id().to_string() == id)
            .cloned())
    }
    /// Reports carry no owner of their own; scoping is exercised against SQLite.
    async fn list(&self, _owner: Option<&UserId>, page: Page) -> Result<Vec<Report>, PortError> {
        let mut reports = self.reports.lock().unwrap().clone();
        reports.sort_by(|a, b| b.generated_at().cmp(&a.generated_at()));
        Ok(paginate(reports, page))
    }
    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Report>, PortError> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.alert_id().to_string() == alert_id)
            .cloned()
            .collect())
    }
    async fn count(&self) -> Result<u64, PortError> {
        Ok(self.reports.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub struct MockDispatchRepo {
    pub dispatches: Mutex<Vec<ShieldDispatch>>,
}

#[async_trait]
impl DispatchRepository for MockDispatchRepo {
    async fn save(&self, dispatch: &ShieldDispatch) -> Result<(), PortError> {
        upsert(&self.dispatches, dispatch, |d| d.id() == dispatch.id());
        Ok(())
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<ShieldDispatch>, PortError> {
        Ok(self
            .dispatches
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id().to_string() == id)
            .cloned())
    }
    async fn list_for_incident(
        &self,
        incident_id: &str,
        limit: usize,
    ) -> Result<Vec<ShieldDispatch>, PortError> {
        Ok(self
            .dispatches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|d| d.incident_id().to_string() == incident_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MockSourceRepo {
    pub sources: Mutex<Vec<MonitoringSource>>,
}

#[async_trait]
impl SourceRepository for MockSourceRepo {
    async fn save(&self, source: &MonitoringSource) -> Result<(), PortError> {
        upsert(&self.sources, source, |s| s.id() == source.id());
        Ok(())
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<MonitoringSource>, PortError> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id().to_string() == id)
            .cloned())
    }
    async fn list(
        &self,
        owner: Option<&UserId>,
        page: Page,
    ) -> Result<Vec<MonitoringSource>, PortError> {
        let sources: Vec<_> = self
            .sources
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| owner.is_none() || s.owner_user_id() == owner)
            .cloned()
            .collect();
        Ok(paginate(sources, page))
    }
    async fn list_active(&self) -> Result<Vec<MonitoringSource>, PortError> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect())
    }
    async fn count_active(&self) -> Result<u64, PortError> {
        Ok(self.sources.lock().unwrap().iter().filter(|s| s.is_active()).count() as u64)
    }
    async fn delete(&self, id: &str) -> Result<bool, PortError> {
        let mut sources = self.sources.lock().unwrap();
        let before = sources.len();
        sources.retain(|s| s.id().to_string() != id);
        Ok(sources.len() != before)
    }
}

#[derive(Default)]
pub struct MockRunRepo {
    pub runs: Mutex<Vec<ScrapingRun>>,
}

#[async_trait]
impl RunRepository for MockRunRepo {
    async fn save(&self, run: &ScrapingRun) -> Result<(), PortError> {
        upsert(&self.runs, run, |r| r.id() == run.id());
        Ok(())
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<ScrapingRun>, PortError> {
        Ok(self
            .runs
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id().to_string() == id)
            .cloned())
    }
    async fn list_for_source(
        &self,
        source_id: &str,
        page: Page,
    ) -> Result<Vec<ScrapingRun>, PortError> {
        let runs: Vec<_> = self
            .runs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.source_id().to_string() == source_id)
            .cloned()
            .collect();
        Ok(paginate(runs, page))
    }
    async fn list(&self, page: Page) -> Result<Vec<ScrapingRun>, PortError> {
        let runs: Vec<_> = self.runs.lock().unwrap().iter().rev().cloned().collect();
        Ok(paginate(runs, page))
    }
    async fn delete_for_source(&self, source_id: &str) -> Result<u64, PortError> {
        let mut runs = self.runs.lock().unwrap();
        let before = runs.len();
        runs.retain(|r| r.source_id().to_string() != source_id);
        Ok((before - runs.len()) as u64)
    }
}

#[derive(Default)]
pub struct MockScanQueue {
    pub tasks: Mutex<Vec<ScanTask>>,
    pub unavailable: bool,
}

impl MockScanQueue {
    pub fn unavailable() -> Self {
        Self {
            tasks: Mutex::default(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl ScanQueue for MockScanQueue {
    async fn enqueue(&self, task: ScanTask) -> Result<(), PortError> {
        if self.unavailable {
            return Err(PortError::Connection("queue down".into()));
        }
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
    async fn claim(&self, limit: usize) -> Result<Vec<ScanTask>, PortError> {
        let mut tasks = self.tasks.lock().unwrap();
        let take = limit.min(tasks.len());
        Ok(tasks.drain(..take).collect())
    }
}

#[derive(Default)]
pub struct MockUserRepo {
    pub users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for MockUserRepo {
    async fn save(&self, user: &User) -> Result<(), PortError> {
        upsert(&self.users, user, |u| u.email() == user.email());
        Ok(())
    }
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email() == email)
            .cloned())
    }
}

#[derive(Default)]
pub struct MockSessionRepo {
    pub sessions: Mutex<Vec<Session>>,
}

#[async_trait]
impl SessionRepository for MockSessionRepo {
    async fn save(&self, session: &Session) -> Result<(), PortError> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }
    async fn find(&self, token: &str) -> Result<Option<Session>, PortError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token() == token)
            .cloned())
    }
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, PortError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Default)]
pub struct MockEventPublisher {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl MockEventPublisher {
    pub fn types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        self.events.lock().unwrap().extend(events);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockArtifactStore {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MockArtifactStore {
    pub fn with_file(name: &str, bytes: &[u8]) -> Self {
        Self {
            files: Mutex::new(BTreeMap::from([(name.to_string(), bytes.to_vec())])),
        }
    }
}

#[async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<StoredArtifact, PortError> {
        let file_hash = content_hash(bytes);
        let file_name = format!("{file_hash}{extension}");
        self.files
            .lock()
            .unwrap()
            .insert(file_name.clone(), bytes.to_vec());
        Ok(StoredArtifact {
            file_name,
            file_hash,
            size: bytes.len() as u64,
        })
    }
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, PortError> {
        Ok(self.files.lock().unwrap().get(name).cloned())
    }
    async fn remove(&self, name: &str) -> Result<bool, PortError> {
        Ok(self.files.lock().unwrap().remove(name).is_some())
    }
}
