use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use scout_core::ids::{SourceId, UserId};
use scout_core::source::{MonitoringSource, NewSource, ScrapingRun, SourcePatch, SourceStatus};
use scout_ports::outbound::{RunRepository, ScanQueue, SourceRepository};
use scout_ports::types::{Page, ScanTask};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDeletion {
    pub source_id: SourceId,
    pub deleted_runs_count: u64,
}

/// What one scheduler pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scheduled: usize,
    pub failed: usize,
}

pub struct SourceService<S, U, Q>
where
    S: SourceRepository,
    U: RunRepository,
    Q: ScanQueue,
{
    sources: S,
    runs: U,
    scans: Q,
}

impl<S, U, Q> SourceService<S, U, Q>
where
    S: SourceRepository,
    U: RunRepository,
    Q: ScanQueue,
{
    pub fn new(sources: S, runs: U, scans: Q) -> Self {
        Self {
            sources,
            runs,
            scans,
        }
    }

    pub async fn create(
        &self,
        input: NewSource,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<MonitoringSource, AppError> {
        let mut source = MonitoringSource::new(input, now)?;
        if let Some(owner) = owner {
            source.assign_owner(owner);
        }
        self.sources.save(&source).await?;
        info!(source_id = %source.id(), url = %source.url(), "monitoring source created");
        Ok(source)
    }

    pub async fn list(
        &self,
        owner: Option<&UserId>,
        page: Page,
    ) -> Result<Vec<MonitoringSource>, AppError> {
        Ok(self.sources.list(owner, page).await?)
    }

    pub async fn get(&self, id: &str) -> Result<MonitoringSource, AppError> {
        let id = SourceId::parse(id)?;
        self.sources
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("source"))
    }

    pub async fn update(&self, id: &str, patch: SourcePatch) -> Result<MonitoringSource, AppError> {
        let mut source = self.get(id).await?;
        source.apply(patch)?;
        self.sources.save(&source).await?;
        Ok(source)
    }

    pub async fn toggle(&self, id: &str) -> Result<MonitoringSource, AppError> {
        let mut source = self.get(id).await?;
        let active = source.toggle();
        self.sources.save(&source).await?;
        info!(source_id = %source.id(), active, "monitoring source toggled");
        Ok(source)
    }

    /// Remove a source together with its run history.
    pub async fn delete(&self, id: &str) -> Result<SourceDeletion, AppError> {
        let source = self.get(id).await?;
        let key = source.id().to_string();
        let deleted_runs_count = self.runs.delete_for_source(&key).await?;
        self.sources.delete(&key).await?;
        Ok(SourceDeletion {
            source_id: source.id().clone(),
            deleted_runs_count,
        })
    }

    pub async fn runs(&self, source_id: &str, page: Page) -> Result<Vec<ScrapingRun>, AppError> {
        let source = self.get(source_id).await?;
        Ok(self
            .runs
            .list_for_source(&source.id().to_string(), page)
            .await?)
    }

    pub async fn all_runs(&self, page: Page) -> Result<Vec<ScrapingRun>, AppError> {
        Ok(self.runs.list(page).await?)
    }

    /// One scheduler pass: every due source gets a PENDING run and a
    /// discovery task. A source whose task cannot be queued keeps its
    /// schedule and is retried on the next pass.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let mut report = TickReport::default();
        for mut source in self.sources.list_active().await? {
            if !source.is_due(now) {
                continue;
            }
            let mut run = ScrapingRun::pending(source.id().clone(), now);
            self.runs.save(&run).await?;

            match self.scans.enqueue(ScanTask::discovery(&source, &run, now)).await {
                Ok(()) => {
                    source.mark_scheduled(now);
                    report.scheduled += 1;
                    debug!(source_id = %source.id(), run_id = %run.id(), "source scheduled");
                }
                Err(e) => {
                    warn!(source_id = %source.id(), error = %e, "failed to queue discovery scan");
                    run.fail(&format!("Scan queue unavailable: {e}"), now);
                    self.runs.save(&run).await?;
                    source.record_outcome(SourceStatus::Error);
                    report.failed += 1;
                }
            }
            self.sources.save(&source).await?;
        }
        if report.scheduled > 0 || report.failed > 0 {
            info!(scheduled = report.scheduled, failed = report.failed, "scheduler pass done");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::Duration;
    use scout_core::source::RunStatus;
    use scout_ports::types::{ScanMode, DISCOVERY_SOURCE_TYPE};

    type Service = SourceService<MockSourceRepo, MockRunRepo, MockScanQueue>;

    fn service(scans: MockScanQueue) -> Service {
        SourceService::new(MockSourceRepo::default(), MockRunRepo::default(), scans)
    }

    fn input(name: &str, frequency_minutes: u32) -> NewSource {
        NewSource {
            name: name.into(),
            url: format!("https://{name}.bj"),
            source_type: "WEB".into(),
            frequency_minutes,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let svc = service(MockScanQueue::default());
        assert!(svc.create(input("  ", 60), None, now()).await.is_err());
        assert!(svc.sources.sources.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tick_schedules_due_sources_once_per_period() {
        let svc = service(MockScanQueue::default());
        let source = svc.create(input("forum", 60), None, now()).await.unwrap();
        let paused = svc.create(input("paused", 60), None, now()).await.unwrap();
        svc.toggle(&paused.id().to_string()).await.unwrap();

        let first = svc.tick(now()).await.unwrap();
        assert_eq!(first, TickReport { scheduled: 1, failed: 0 });
        {
            let tasks = svc.scans.tasks.lock().unwrap();
            assert_eq!(tasks[0].mode, ScanMode::Discovery);
            assert_eq!(tasks[0].url, "https://forum.bj");
            assert_eq!(tasks[0].source_type, DISCOVERY_SOURCE_TYPE);
            assert_eq!(tasks[0].run_id.as_deref(), Some(tasks[0].id.as_str()));
        }

        let again = svc.tick(now() + Duration::minutes(30)).await.unwrap();
        assert_eq!(again.scheduled, 0);
        let later = svc.tick(now() + Duration::minutes(60)).await.unwrap();
        assert_eq!(later.scheduled, 1);

        let runs = svc.runs(&source.id().to_string(), Page::default()).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.status() == RunStatus::Pending));
        let stored = svc.get(&source.id().to_string()).await.unwrap();
        assert_eq!(stored.last_run_at(), Some(now() + Duration::minutes(60)));
    }

    #[tokio::test]
    async fn queue_outage_fails_run_and_retries() {
        let svc = service(MockScanQueue::unavailable());
        let source = svc.create(input("forum", 60), None, now()).await.unwrap();

        let report = svc.tick(now()).await.unwrap();
        assert_eq!(report, TickReport { scheduled: 0, failed: 1 });

        let stored = svc.get(&source.id().to_string()).await.unwrap();
        assert_eq!(stored.last_status(), SourceStatus::Error);
        assert!(stored.last_run_at().is_none());
        let runs = svc.all_runs(Page::default()).await.unwrap();
        assert_eq!(runs[0].status(), RunStatus::Failed);
        assert!(runs[0].log_message().unwrap().starts_with("Scan queue unavailable"));
    }

    #[tokio::test]
    async fn delete_removes_run_history() {
        let svc = service(MockScanQueue::default());
        let source = svc.create(input("forum", 60), None, now()).await.unwrap();
        let other = svc.create(input("blog", 60), None, now()).await.unwrap();
        svc.tick(now()).await.unwrap();

        let deletion = svc.delete(&source.id().to_string()).await.unwrap();
        assert_eq!(deletion.deleted_runs_count, 1);
        assert!(matches!(
            svc.get(&source.id().to_string()).await.unwrap_err(),
            AppError::NotFound("source")
        ));
        let remaining = svc.runs(&other.id().to_string(), Page::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn update_validates_and_persists() {
        let svc = service(MockScanQueue::default());
        let source = svc.create(input("forum", 60), None, now()).await.unwrap();
        let id = source.id().to_string();

        let bad = SourcePatch {
            frequency_minutes: Some(0),
            name: Some("renamed".into()),
            ..SourcePatch::default()
        };
        assert!(svc.update(&id, bad).await.is_err());
        assert_eq!(svc.get(&id).await.unwrap().name(), "forum");

        let good = SourcePatch {
            name: Some("renamed".into()),
            ..SourcePatch::default()
        };
        assert_eq!(svc.update(&id, good).await.unwrap().name(), "renamed");
    }

    #[tokio::test]
    async fn owned_sources_are_listed_for_their_owner() {
        let svc = service(MockScanQueue::default());
        let sme = UserId::new();
        let owned = svc.create(input("alpha", 60), Some(sme.clone()), now()).await.unwrap();
        svc.create(input("shared", 60), None, now()).await.unwrap();

        assert_eq!(owned.owner_user_id(), Some(&sme));
        let mine = svc.list(Some(&sme), Page::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id(), owned.id());
        assert_eq!(svc.list(None, Page::default()).await.unwrap().len(), 2);
    }
}
