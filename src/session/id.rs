//! Session identifiers derived from the wall-clock start time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout of a session id: filesystem safe and lexically sortable.
pub const SESSION_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Identifies a session and names its output folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_datetime(at: &NaiveDateTime) -> Self {
        Self(at.format(SESSION_ID_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_session_id_truncates_to_seconds() {
        let at = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 8, 999)
            .unwrap();
        let id = SessionId::from_datetime(&at);
        assert_eq!(id.as_str(), "2024-12-31_23-59-08");
        assert_eq!(id, SessionId::from_datetime(&at.with_nanosecond(0).unwrap()));
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_session_ids_sort_chronologically() {
        let earlier = NaiveDate::from_ymd_opt(2024, 2, 9)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert!(SessionId::from_datetime(&earlier) < SessionId::from_datetime(&later));
    }
}
