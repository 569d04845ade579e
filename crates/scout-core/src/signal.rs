//! Rule-based risk scoring of a suspicious message.
//!
//! Deterministic: the same message, url and phone always produce the same
//! assessment.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::alert::CITIZEN_SOURCE_PREFIX;
use crate::error::DomainError;
use crate::vocabulary::define_vocabulary;

pub const MAX_SCORE: u8 = 100;
pub const MAX_EXPLANATIONS: usize = 3;
pub const DEFAULT_EXPLANATION: &str = "Aucun indicateur critique detecte.";

const MESSAGE_CHARS: std::ops::RangeInclusive<usize> = 5..=3000;
const PHONE_CHARS: std::ops::RangeInclusive<usize> = 8..=32;
const MAX_URL_CHARS: usize = 2048;

const SUSPICIOUS_LINK_PATTERNS: &[&str] = &["bit.ly", "tinyurl", "t.me/", "wa.me/"];

static BENIN_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+229|00229)?\s?[014569][0-9]{7}$").expect("valid regex")
});

define_vocabulary!(
    /// Where the citizen submitted the signal from. Client-declared.
    SignalChannel, "signal channel" {
        MobileApp => "MOBILE_APP",
        WebPortal => "WEB_PORTAL",
    }
);

define_vocabulary!(
    RiskLevel, "risk level" {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
);

impl Default for SignalChannel {
    fn default() -> Self {
        Self::WebPortal
    }
}

impl SignalChannel {
    /// Alert source type for reports arriving through this channel.
    pub fn source_type(&self) -> String {
        format!("{CITIZEN_SOURCE_PREFIX}{}", self.as_str())
    }
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => Self::High,
            35.. => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn should_report(&self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

struct Rule {
    code: &'static str,
    points: u8,
    explanation: &'static str,
    keywords: &'static [&'static str],
}

const MESSAGE_RULES: &[Rule] = &[
    Rule {
        code: "URGENCY_PATTERN",
        points: 20,
        explanation: "Le message utilise un ton d'urgence.",
        keywords: &["urgent", "immédiat", "immediat", "dernier rappel", "bloqué", "bloque"],
    },
    Rule {
        code: "CREDENTIAL_REQUEST",
        points: 30,
        explanation: "Le message demande un code ou des informations sensibles.",
        keywords: &["code", "otp", "pin", "mot de passe", "password", "confirmer"],
    },
    Rule {
        code: "MONEY_REQUEST",
        points: 25,
        explanation: "Le contenu mentionne un contexte financier potentiellement frauduleux.",
        keywords: &["transfert", "mtn money", "moov money", "frais", "paiement", "transaction"],
    },
    Rule {
        code: "IMPERSONATION_PATTERN",
        points: 15,
        explanation: "Le message semble se faire passer pour un service officiel.",
        keywords: &["service client", "agent", "support", "officiel"],
    },
];

const SUSPICIOUS_LINK: (&str, u8, &str) = (
    "SUSPICIOUS_LINK",
    20,
    "Le lien partage des signes techniques suspects.",
);
const PHONE_FORMAT_ANOMALY: (&str, u8, &str) = (
    "PHONE_FORMAT_ANOMALY",
    10,
    "Le format du numero est atypique.",
);

/// A message submitted for checking, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignalInput {
    pub message: String,
    #[serde(default)]
    pub channel: SignalChannel,
    #[serde(default)]
    pub url: Option<String>,
    pub phone: String,
}

impl SignalInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let message_len = self.message.chars().count();
        if !MESSAGE_CHARS.contains(&message_len) {
            return Err(DomainError::invalid_field(
                "message",
                format!(
                    "must be between {} and {} characters",
                    MESSAGE_CHARS.start(),
                    MESSAGE_CHARS.end()
                ),
            ));
        }
        let phone_len = self.phone.chars().count();
        if !PHONE_CHARS.contains(&phone_len) {
            return Err(DomainError::invalid_field(
                "phone",
                format!(
                    "must be between {} and {} characters",
                    PHONE_CHARS.start(),
                    PHONE_CHARS.end()
                ),
            ));
        }
        if let Some(url) = &self.url {
            if url.chars().count() > MAX_URL_CHARS {
                return Err(DomainError::invalid_field(
                    "url",
                    format!("must be at most {MAX_URL_CHARS} characters"),
                ));
            }
        }
        Ok(())
    }

    pub fn score(&self) -> SignalAssessment {
        score_signal(&self.message, self.url.as_deref(), Some(&self.phone))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalAssessment {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub explanation: Vec<String>,
    pub matched_rules: Vec<String>,
    pub should_report: bool,
}

pub fn score_signal(message: &str, url: Option<&str>, phone: Option<&str>) -> SignalAssessment {
    let text = message.trim().to_lowercase();
    let url = url.unwrap_or("").trim().to_lowercase();
    let phone = phone.unwrap_or("").trim();

    let mut score: u32 = 0;
    let mut matched_rules = Vec::new();
    let mut explanation = Vec::new();
    let mut hit = |(code, points, why): (&str, u8, &str)| {
        score += u32::from(points);
        matched_rules.push(code.to_string());
        explanation.push(why.to_string());
    };

    for rule in MESSAGE_RULES {
        if rule.keywords.iter().any(|k| text.contains(k)) {
            hit((rule.code, rule.points, rule.explanation));
        }
    }

    if !url.is_empty()
        && (SUSPICIOUS_LINK_PATTERNS.iter().any(|p| url.contains(p)) || url.starts_with("http://"))
    {
        hit(SUSPICIOUS_LINK);
    }

    if !phone.is_empty() && !BENIN_PHONE.is_match(phone) {
        hit(PHONE_FORMAT_ANOMALY);
    }

    let risk_score = score.min(u32::from(MAX_SCORE)) as u8;
    let risk_level = RiskLevel::from_score(risk_score);
    if explanation.is_empty() {
        explanation.push(DEFAULT_EXPLANATION.to_string());
    }
    explanation.truncate(MAX_EXPLANATIONS);

    SignalAssessment {
        risk_score,
        risk_level,
        explanation,
        matched_rules,
        should_report: risk_level.should_report(),
    }
}
