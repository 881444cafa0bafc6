use serde::{Deserialize, Serialize};

/// Oracle attestation about the real-world obligation behind an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Completed { approved: bool },
    Pending { reason: String },
    NotFound { reason: String },
}

impl VerificationOutcome {
    /// Only an approved completion authorizes a release.
    pub fn authorizes_release(&self) -> bool {
        matches!(self, Self::Completed { approved: true })
    }

    /// Human-readable reason for any outcome that does not authorize a release.
    pub fn rejection_reason(&self) -> Option<String> {
        match self {
            Self::Completed { approved: true } => None,
            Self::Completed { approved: false } => {
                Some("obligation completed but payment was not approved".to_string())
            }
            Self::Pending { reason } | Self::NotFound { reason } => Some(reason.clone()),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Pending { .. } => "pending",
            Self::NotFound { .. } => "not_found",
        }
    }
}
