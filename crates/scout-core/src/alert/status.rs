use crate::vocabulary::define_vocabulary;

define_vocabulary!(
    /// Workflow state of an alert. Owned by the server; clients only request
    /// transitions.
    AlertStatus, "alert status" {
        New => "NEW",
        InReview => "IN_REVIEW",
        Confirmed => "CONFIRMED",
        Dismissed => "DISMISSED",
        BlockedSimulated => "BLOCKED_SIMULATED",
    }
);

impl AlertStatus {
    /// Still awaiting an analyst outcome.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::InReview)
    }

    /// SHIELD actions may only target a confirmed threat.
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Confirmed | Self::BlockedSimulated)
    }

    /// Closing an alert either way needs a written justification.
    pub fn requires_note(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Dismissed)
    }

    /// Lenient parse used when reading legacy rows: anything unknown is NEW.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Self::New)
    }
}
