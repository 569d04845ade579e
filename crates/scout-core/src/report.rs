//! Forensic reports: a frozen, versioned snapshot of an alert and its
//! evidence, identified by the SHA-256 of its canonical JSON form.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::alert::Alert;
use crate::evidence::Evidence;
use crate::events::{DomainEvent, ReportGenerated};
use crate::ids::{AlertId, ReportId};

pub const SNAPSHOT_VERSION: &str = "1.0";
pub const ENGINE_VERSION: &str = "v1.0.3";

/// Build the snapshot document for an alert as it is right now.
pub fn build_snapshot(alert: &Alert, evidences: &[Evidence], now: DateTime<Utc>) -> Value {
    let alert_core = json!({
        "uuid": alert.id().to_string(),
        "url": alert.url(),
        "source_type": alert.source_type(),
        "risk_score": alert.risk_score(),
        "status_at_snapshot": alert.status().as_str(),
        "created_at": alert.created_at().to_rfc3339(),
        "updated_at": alert.updated_at().map(|t| t.to_rfc3339()),
        "analysis_note": alert.analysis_note().unwrap_or(""),
    });

    let evidence_data: Vec<Value> = evidences
        .iter()
        .map(|ev| {
            json!({
                "id": ev.id().to_string(),
                "type": ev.kind(),
                "file_path": ev.file_path(),
                "file_hash": ev.file_hash(),
                "status": ev.status().as_str(),
                "captured_at": ev.captured_at().to_rfc3339(),
                "metadata": ev.metadata(),
                "content_preview": ev.content_preview(),
            })
        })
        .collect();

    let analysis = alert.analysis().map(|a| {
        json!({
            "risk_score": alert.risk_score(),
            "categories": a.categories,
            "entities": a.entities,
            "generated_at": now.to_rfc3339(),
        })
    });

    json!({
        "snapshot_version": SNAPSHOT_VERSION,
        "engine_version": ENGINE_VERSION,
        "generated_at": now.to_rfc3339(),
        "data": {
            "alert": alert_core,
            "evidences": evidence_data,
            "analysis": analysis,
        },
    })
}

/// Compact JSON with sorted keys and every non-ASCII character escaped as
/// `\uXXXX`, so the byte form is stable regardless of how it was built.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

pub fn snapshot_hash(snapshot: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(snapshot).as_bytes()))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{7f}' => out.push(c),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    id: ReportId,
    alert_id: AlertId,
    snapshot: Value,
    report_hash: String,
    snapshot_version: String,
    generated_by: Option<String>,
    pdf_path: Option<String>,
    generated_at: DateTime<Utc>,
}

impl Report {
    /// Freeze the alert and its evidence. Sealing the evidence is the
    /// caller's job once the report is stored.
    pub fn generate(
        alert: &Alert,
        evidences: &[Evidence],
        generated_by: Option<String>,
        now: DateTime<Utc>,
    ) -> (Self, Vec<DomainEvent>) {
        let snapshot = build_snapshot(alert, evidences, now);
        let report_hash = snapshot_hash(&snapshot);
        let report = Self {
            id: ReportId::new(),
            alert_id: alert.id().clone(),
            pdf_path: Some(format!("report_{}.pdf", &report_hash[..8])),
            snapshot,
            report_hash,
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            generated_by,
            generated_at: now,
        };
        let events = vec![DomainEvent::ReportGenerated(ReportGenerated {
            report_id: report.id.clone(),
            alert_id: report.alert_id.clone(),
            report_hash: report.report_hash.clone(),
            occurred_at: now,
        })];
        (report, events)
    }

    /// Recompute the hash of the stored snapshot and compare.
    pub fn verify(&self) -> bool {
        snapshot_hash(&self.snapshot) == self.report_hash
    }

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn alert_id(&self) -> &AlertId {
        &self.alert_id
    }

    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    pub fn report_hash(&self) -> &str {
        &self.report_hash
    }

    pub fn snapshot_version(&self) -> &str {
        &self.snapshot_version
    }

    pub fn generated_by(&self) -> Option<&str> {
        self.generated_by.as_deref()
    }

    pub fn pdf_path(&self) -> Option<&str> {
        self.pdf_path.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
