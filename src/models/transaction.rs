use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Processing status of an upload transaction. The set is closed: every
/// transaction visible to a reader carries exactly one of these values.
///
/// Transitions are one-directional: `pending -> processing -> {completed, error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Processing,
    Completed,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "pending" => Some(Status::Pending),
            "processing" => Some(Status::Processing),
            "completed" => Some(Status::Completed),
            "error" => Some(Status::Error),
            _ => None,
        }
    }

    /// Position in the transition order `pending < processing < {completed, error}`.
    pub fn rank(&self) -> u8 {
        match self {
            Status::Pending => 0,
            Status::Processing => 1,
            Status::Completed | Status::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full status record of one transaction as read back from the state store.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusRecord {
    pub status: Status,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [Status::Pending, Status::Processing, Status::Completed, Status::Error] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("bogus"), None);
    }

    #[test]
    fn rank_orders_the_lifecycle() {
        assert!(Status::Pending.rank() < Status::Processing.rank());
        assert!(Status::Processing.rank() < Status::Completed.rank());
        assert_eq!(Status::Completed.rank(), Status::Error.rank());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(!Status::Processing.is_terminal());
    }
}
