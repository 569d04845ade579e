use std::sync::Arc;

use anyhow::Context;

use scout_adapters::persistence::sqlite::SqliteDb;
use scout_adapters::storage::FsArtifactStore;
use scout_app::alert_service::AlertService;
use scout_app::auth_service::AuthService;
use scout_app::evidence_service::EvidenceService;
use scout_app::incident_service::IncidentService;
use scout_app::report_service::ReportService;
use scout_app::result_service::ResultService;
use scout_app::shield_service::ShieldService;
use scout_app::source_service::SourceService;
use scout_app::stats_service::StatsService;

use crate::config::Config;

type Db = SqliteDb;
type Files = FsArtifactStore;

pub type Alerts = AlertService<Db, Db, Db, Db, Files, Db, Db>;
pub type Incidents = IncidentService<Db, Db, Files, Db, Db>;
pub type Shield = ShieldService<Db, Db, Db>;
pub type Reports = ReportService<Db, Db, Db, Files, Db>;
pub type Sources = SourceService<Db, Db, Db>;
pub type Results = ResultService<Db, Db, Db, Db, Db>;
pub type Stats = StatsService<Db, Db, Db>;
pub type Auth = AuthService<Db, Db>;
pub type Evidences = EvidenceService<Db, Files>;

/// Services shared by every request handler and the scheduler.
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<Alerts>,
    pub incidents: Arc<Incidents>,
    pub shield: Arc<Shield>,
    pub reports: Arc<Reports>,
    pub sources: Arc<Sources>,
    pub results: Arc<Results>,
    pub stats: Arc<Stats>,
    pub auth: Arc<Auth>,
    pub evidences: Arc<Evidences>,
    pub operator_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        db: SqliteDb,
        evidence_files: FsArtifactStore,
        report_files: FsArtifactStore,
        session_ttl_minutes: i64,
        operator_secret: &str,
    ) -> Self {
        Self {
            alerts: Arc::new(AlertService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                evidence_files.clone(),
                report_files.clone(),
                db.clone(),
                db.clone(),
            )),
            incidents: Arc::new(IncidentService::new(
                db.clone(),
                db.clone(),
                evidence_files.clone(),
                db.clone(),
                db.clone(),
            )),
            shield: Arc::new(ShieldService::new(db.clone(), db.clone(), db.clone())),
            reports: Arc::new(ReportService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                report_files,
                db.clone(),
            )),
            sources: Arc::new(SourceService::new(db.clone(), db.clone(), db.clone())),
            results: Arc::new(ResultService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
            )),
            stats: Arc::new(StatsService::new(db.clone(), db.clone(), db.clone())),
            auth: Arc::new(AuthService::new(db.clone(), db.clone(), session_ttl_minutes)),
            evidences: Arc::new(EvidenceService::new(db, evidence_files)),
            operator_secret: Arc::from(operator_secret),
        }
    }

    /// Open the database and artifact stores named by the configuration.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let db = SqliteDb::new(&config.database_url)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?;
        let evidence_files = FsArtifactStore::new(&config.evidence_dir)
            .await
            .with_context(|| format!("failed to prepare {}", config.evidence_dir.display()))?;
        let report_files = FsArtifactStore::new(&config.report_dir)
            .await
            .with_context(|| format!("failed to prepare {}", config.report_dir.display()))?;

        Ok(Self::new(
            db,
            evidence_files,
            report_files,
            config.session_ttl_minutes,
            &config.operator_secret,
        ))
    }

    pub async fn seed_users(&self, config: &Config) -> anyhow::Result<()> {
        for (seed, role) in config.seed_users() {
            self.auth
                .seed(&seed.email, &seed.password, role)
                .await
                .with_context(|| format!("failed to seed {role} user"))?;
        }
        Ok(())
    }
}
