use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scout_core::alert::{clamp_risk_score, Alert, AlertStatus};
use scout_core::ids::UserId;
use scout_core::source::{MonitoringSource, ScrapingRun};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 500;
/// Source type of alerts raised by scheduled discovery scans.
pub const DISCOVERY_SOURCE_TYPE: &str = "AUTOMATIC_SCRAPING";

/// Offset pagination as exposed by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(skip: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Filter criteria for querying alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    /// Only alerts raised from citizen reports.
    pub citizen_only: bool,
    /// Free text matched against phone number and reported message.
    pub search: Option<String>,
    /// Only alerts raised by this account.
    pub owner: Option<UserId>,
    pub page: Page,
}

/// Rows removed together with an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgedRows {
    pub reports: u64,
    pub evidences: u64,
    pub dispatches: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanMode {
    /// Re-scan a known target attached to an existing alert.
    Targeted,
    /// Scan a monitoring source; an alert is created only if a threat is found.
    Discovery,
}

/// Work item for the external OSINT crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    /// Alert id for targeted scans, run id for discovery scans.
    pub id: String,
    pub url: String,
    pub source_type: String,
    pub run_id: Option<String>,
    pub mode: ScanMode,
    pub enqueued_at: DateTime<Utc>,
}

impl ScanTask {
    pub fn targeted(alert: &Alert, now: DateTime<Utc>) -> Self {
        Self {
            id: alert.id().to_string(),
            url: alert.url().to_string(),
            source_type: alert.source_type().to_string(),
            run_id: None,
            mode: ScanMode::Targeted,
            enqueued_at: now,
        }
    }

    pub fn discovery(source: &MonitoringSource, run: &ScrapingRun, now: DateTime<Utc>) -> Self {
        Self {
            id: run.id().to_string(),
            url: source.url().to_string(),
            source_type: DISCOVERY_SOURCE_TYPE.to_string(),
            run_id: Some(run.id().to_string()),
            mode: ScanMode::Discovery,
            enqueued_at: now,
        }
    }
}

fn completed() -> String {
    "COMPLETED".to_string()
}

/// Outcome posted back by the crawler for a [`ScanTask`]. Every field but
/// `task_id` is optional and malformed sub-documents are read as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanResult {
    pub task_id: String,
    #[serde(default = "completed")]
    pub status: String,
    #[serde(default)]
    pub is_alert: bool,
    #[serde(default)]
    pub risk_score: Value,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub evidence_hash: Option<String>,
    #[serde(default)]
    pub evidence_file_path: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ScanResult {
    pub fn normalized_status(&self) -> String {
        self.status.trim().to_uppercase()
    }

    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    /// Accepts numbers and numeric strings; anything else scores 0.
    pub fn clamped_risk_score(&self) -> u8 {
        let raw = match &self.risk_score {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        clamp_risk_score(raw)
    }

    pub fn target_url(&self) -> &str {
        self.url.as_deref().unwrap_or("").trim()
    }

    pub fn failure_message(&self) -> String {
        let code = non_blank(self.error_code.as_deref()).unwrap_or("UNKNOWN_ERROR");
        let text = non_blank(self.error.as_deref()).unwrap_or("No details");
        format!("OSINT {}: {code} - {text}", self.normalized_status())
    }

    pub fn evidence_hash(&self) -> Option<&str> {
        non_blank(self.evidence_hash.as_deref())
    }

    /// Capture time reported by the crawler, with or without an offset.
    pub fn captured_at(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        let Some(raw) = non_blank(self.timestamp.as_deref()) else {
            return fallback;
        };
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
            })
            .unwrap_or(fallback)
    }

    fn details_object(&self, key: &str) -> Map<String, Value> {
        match self.details.get(key) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn evidence_metadata(&self) -> Value {
        Value::Object(self.details_object("evidence_metadata"))
    }

    pub fn summary(&self) -> String {
        match self.details_object("analysis").get("summary") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn categories(&self) -> Vec<Value> {
        self.analysis_list("categories")
    }

    pub fn entities(&self) -> Vec<Value> {
        self.analysis_list("entities")
    }

    fn analysis_list(&self, key: &str) -> Vec<Value> {
        match self.details_object("analysis").get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A file written to a content-addressed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub file_name: String,
    pub file_hash: String,
    pub size: u64,
}
