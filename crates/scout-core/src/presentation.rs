//! Display vocabulary for operator consoles: French labels, badge variants
//! and which actions a status permits. Total over raw strings so that an
//! unexpected server value renders instead of failing.

use serde::Serialize;

use crate::alert::AlertStatus;
use crate::incident::has_justification;
use crate::shield::PlaybookActionType;
use crate::signal::SignalChannel;

pub const TEXT_SIGNAL_LABEL: &str = "Signal textuel (sans URL crawlable)";
const CITIZEN_HOST_LABEL: &str = "Signal citoyen";
const INVALID_HOST_LABEL: &str = "Cible invalide";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Outline,
    Warning,
    Destructive,
    Success,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorAction {
    TakeCharge,
    Confirm,
    Reject,
    Escalate,
    DispatchShield,
    GenerateReport,
    ConfirmAndBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPresentation {
    pub label: String,
    pub variant: BadgeVariant,
    pub actions: Vec<OperatorAction>,
}

pub fn present_status(status: AlertStatus) -> StatusPresentation {
    use OperatorAction::*;

    let (label, variant, actions): (&str, BadgeVariant, &[OperatorAction]) = match status {
        AlertStatus::New => (
            "Nouveau",
            BadgeVariant::Outline,
            &[TakeCharge, Confirm, Reject, Escalate],
        ),
        AlertStatus::InReview => (
            "En revision",
            BadgeVariant::Warning,
            &[Confirm, Reject, Escalate],
        ),
        AlertStatus::Confirmed => (
            "Confirme",
            BadgeVariant::Destructive,
            &[DispatchShield, GenerateReport, ConfirmAndBlock, Escalate],
        ),
        AlertStatus::Dismissed => ("Classe sans suite", BadgeVariant::Secondary, &[Escalate]),
        AlertStatus::BlockedSimulated => (
            "Bloque (simule)",
            BadgeVariant::Success,
            &[DispatchShield, GenerateReport],
        ),
    };
    StatusPresentation {
        label: label.to_string(),
        variant,
        actions: actions.to_vec(),
    }
}

/// Presentation for a raw status string. Unknown values are shown as-is
/// with the neutral variant and no actions.
pub fn present_alert_status(raw: &str) -> StatusPresentation {
    match raw.parse::<AlertStatus>() {
        Ok(status) => present_status(status),
        Err(_) => StatusPresentation {
            label: raw.to_string(),
            variant: BadgeVariant::Default,
            actions: Vec::new(),
        },
    }
}

pub fn can_dispatch(raw_status: &str) -> bool {
    raw_status
        .parse::<AlertStatus>()
        .is_ok_and(|s| s.is_dispatchable())
}

pub fn can_decide(comment: Option<&str>) -> bool {
    has_justification(comment)
}

pub fn channel_label(channel: SignalChannel) -> &'static str {
    match channel {
        SignalChannel::MobileApp => "Application mobile",
        SignalChannel::WebPortal => "Interface web",
    }
}

pub fn source_label(source_type: &str) -> &str {
    match source_type {
        "CITIZEN_MOBILE_APP" => "Citizen mobile",
        "CITIZEN_WEB_PORTAL" => "Citizen web",
        other => other,
    }
}

pub fn playbook_action_label(action: PlaybookActionType) -> &'static str {
    action.label()
}

pub fn is_http_url(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn display_target(value: &str) -> &str {
    if value.starts_with("citizen://") {
        TEXT_SIGNAL_LABEL
    } else {
        value
    }
}

pub fn safe_hostname(value: &str) -> String {
    if !is_http_url(value) {
        return CITIZEN_HOST_LABEL.to_string();
    }
    match url::Url::parse(value.trim()) {
        Ok(parsed) => parsed
            .host_str()
            .map(String::from)
            .unwrap_or_else(|| INVALID_HOST_LABEL.to_string()),
        Err(_) => INVALID_HOST_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_label_and_variant() {
        for status in AlertStatus::ALL {
            let p = present_alert_status(status.as_str());
            assert!(!p.label.is_empty());
            assert_ne!(p.variant, BadgeVariant::Default);
            assert_eq!(p, present_alert_status(status.as_str()));
        }
    }

    #[test]
    fn labels_and_variants() {
        let p = present_alert_status("BLOCKED_SIMULATED");
        assert_eq!(p.label, "Bloque (simule)");
        assert_eq!(p.variant, BadgeVariant::Success);
        assert_eq!(present_alert_status("DISMISSED").label, "Classe sans suite");
        assert_eq!(present_alert_status("NEW").variant, BadgeVariant::Outline);
    }

    #[test]
    fn unknown_status_renders_literally() {
        let p = present_alert_status("ARCHIVED");
        assert_eq!(p.label, "ARCHIVED");
        assert_eq!(p.variant, BadgeVariant::Default);
        assert!(p.actions.is_empty());
    }

    #[test]
    fn actions_per_status() {
        use OperatorAction::*;
        assert_eq!(
            present_alert_status("NEW").actions,
            vec![TakeCharge, Confirm, Reject, Escalate]
        );
        assert_eq!(present_alert_status("DISMISSED").actions, vec![Escalate]);
        assert!(present_alert_status("CONFIRMED").actions.contains(&DispatchShield));
        assert!(!present_alert_status("IN_REVIEW").actions.contains(&DispatchShield));
    }

    #[test]
    fn dispatch_gate() {
        assert!(can_dispatch("CONFIRMED"));
        assert!(can_dispatch("BLOCKED_SIMULATED"));
        for s in ["NEW", "IN_REVIEW", "DISMISSED", "", "confirmed"] {
            assert!(!can_dispatch(s), "{s}");
        }
    }

    #[test]
    fn decide_gate() {
        assert!(!can_decide(None));
        assert!(!can_decide(Some("   ")));
        assert!(can_decide(Some("verifie")));
    }

    #[test]
    fn channel_labels() {
        assert_eq!(channel_label(SignalChannel::MobileApp), "Application mobile");
        assert_eq!(channel_label(SignalChannel::WebPortal), "Interface web");
    }

    #[test]
    fn source_labels() {
        assert_eq!(source_label("CITIZEN_MOBILE_APP"), "Citizen mobile");
        assert_eq!(source_label("WEB"), "WEB");
    }

    #[test]
    fn targets_and_hosts() {
        assert_eq!(display_target("citizen://text-signal"), TEXT_SIGNAL_LABEL);
        assert_eq!(display_target("https://a.bj"), "https://a.bj");
        assert_eq!(safe_hostname("https://scam.example.bj/login?x=1"), "scam.example.bj");
        assert_eq!(safe_hostname("citizen://text-signal"), "Signal citoyen");
        assert_eq!(safe_hostname("http://"), "Cible invalide");
    }
}
