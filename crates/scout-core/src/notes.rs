//! Turns the append-only analysis note log into structured timeline entries.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::shield::PlaybookActionType;

static TAGGED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([A-Z_]+)\]\s*(.*)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteTag {
    SocDecision,
    ShieldDispatch,
    OperatorCallback,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteTone {
    Neutral,
    Success,
    Warning,
}

impl NoteTag {
    fn resolve(raw: &str) -> Self {
        match raw {
            "SOC_DECISION" => Self::SocDecision,
            "SHIELD_DISPATCH" => Self::ShieldDispatch,
            "OPERATOR_CALLBACK" => Self::OperatorCallback,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SocDecision => "SOC_DECISION",
            Self::ShieldDispatch => "SHIELD_DISPATCH",
            Self::OperatorCallback => "OPERATOR_CALLBACK",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SocDecision => "Decision SOC",
            Self::ShieldDispatch => "Action SHIELD",
            Self::OperatorCallback => "Retour operateur",
            Self::Unknown => "Note analyste",
        }
    }

    fn tone(&self, content: &str) -> NoteTone {
        match self {
            Self::ShieldDispatch => NoteTone::Warning,
            Self::SocDecision if content.contains("CONFIRM") => NoteTone::Success,
            Self::OperatorCallback if content.contains("EXECUTED") => NoteTone::Success,
            _ => NoteTone::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteEntry {
    pub id: String,
    pub tag: NoteTag,
    pub title: &'static str,
    pub content: String,
    pub details: Vec<String>,
    pub tone: NoteTone,
}

fn replace_playbook_codes(input: &str) -> String {
    PlaybookActionType::ALL
        .iter()
        .fold(input.to_string(), |acc, code| acc.replace(code.as_str(), code.label()))
}

pub fn parse_notes(raw: Option<&str>) -> Vec<NoteEntry> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let (tag, body) = match TAGGED_LINE.captures(line) {
                Some(caps) => (
                    NoteTag::resolve(caps.get(1).map_or("", |m| m.as_str())),
                    caps.get(2).map_or("", |m| m.as_str()),
                ),
                None => (NoteTag::Unknown, line),
            };
            let content = replace_playbook_codes(body);
            let mut parts = content
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from);
            let main = parts.next().unwrap_or_else(|| content.clone());
            let details: Vec<String> = parts.collect();

            NoteEntry {
                id: format!("{}-{index}", tag.as_str()),
                tag,
                title: tag.title(),
                tone: tag.tone(&content),
                content: main,
                details,
            }
        })
        .collect()
}
