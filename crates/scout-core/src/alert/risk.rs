use serde::{Deserialize, Serialize};

/// Clamp any incoming score into the 0..=100 range.
pub fn clamp_risk_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

pub fn risk_severity(score: i64) -> RiskSeverity {
    if score >= 90 {
        RiskSeverity::Critical
    } else if score >= 70 {
        RiskSeverity::High
    } else if score >= 40 {
        RiskSeverity::Medium
    } else {
        RiskSeverity::Low
    }
}
