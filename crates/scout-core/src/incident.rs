use crate::alert::AlertStatus;
use crate::error::DomainError;
use crate::vocabulary::define_vocabulary;

pub const DEFAULT_AUTHOR: &str = "SOC_ANALYST";
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_AUTHOR_CHARS: usize = 128;
pub const SOC_DECISION_TAG: &str = "[SOC_DECISION]";

define_vocabulary!(
    DecisionAction, "decision action" {
        Confirm => "CONFIRM",
        Reject => "REJECT",
        Escalate => "ESCALATE",
    }
);

define_vocabulary!(
    /// Outcome of an analyst decision or of a SHIELD action on an incident.
    DecisionStatus, "decision status" {
        Pending => "PENDING",
        Validated => "VALIDATED",
        Rejected => "REJECTED",
        Escalated => "ESCALATED",
        Executed => "EXECUTED",
    }
);

impl DecisionAction {
    /// Alert status and decision status produced by this action.
    pub fn outcome(&self) -> (AlertStatus, DecisionStatus) {
        match self {
            Self::Confirm => (AlertStatus::Confirmed, DecisionStatus::Validated),
            Self::Reject => (AlertStatus::Dismissed, DecisionStatus::Rejected),
            Self::Escalate => (AlertStatus::InReview, DecisionStatus::Escalated),
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Reject => "reject",
            Self::Escalate => "escalate",
        }
    }
}

/// True when the comment holds something other than whitespace.
pub fn has_justification(comment: Option<&str>) -> bool {
    comment.is_some_and(|c| !c.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: DecisionAction,
    pub comment: Option<String>,
    pub decided_by: Option<String>,
}

impl Decision {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_COMMENT_CHARS {
                return Err(DomainError::invalid_field(
                    "comment",
                    format!("must be at most {MAX_COMMENT_CHARS} characters"),
                ));
            }
        }
        if let Some(author) = &self.decided_by {
            if author.chars().count() > MAX_AUTHOR_CHARS {
                return Err(DomainError::invalid_field(
                    "decided_by",
                    format!("must be at most {MAX_AUTHOR_CHARS} characters"),
                ));
            }
        }
        if !has_justification(self.comment.as_deref()) {
            return Err(DomainError::JustificationRequired(self.action.verb()));
        }
        Ok(())
    }

    pub fn author(&self) -> &str {
        self.decided_by
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AUTHOR)
    }

    pub fn note_line(&self) -> String {
        let comment = self.comment.as_deref().unwrap_or("").trim();
        format!(
            "{SOC_DECISION_TAG} {} by {} | {comment}",
            self.action,
            self.author()
        )
    }
}
