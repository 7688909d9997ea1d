//! The build-status wire message.
//!
//! One message per build transition, JSON-encoded into a WebSocket text
//! frame. Per bundle name, a `building: true` message is always
//! followed by exactly one `building: false` message before the next
//! `building: true` - the orchestrator emits them sequentially from a
//! single task.

use serde::{Deserialize, Serialize};

use crate::engine::BuildReport;

/// Server-to-client build status for one logical bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStatus {
    /// Logical bundle name, stable for the connection's lifetime.
    pub name: String,

    /// True while a rebuild is in progress.
    pub building: bool,

    /// Present once `building` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BuildReport>,
}

impl BuildStatus {
    /// A rebuild started.
    pub fn started(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            building: true,
            result: None,
        }
    }

    /// A rebuild finished, successfully or not.
    pub fn finished(name: impl Into<String>, result: BuildReport) -> Self {
        Self {
            name: name.into(),
            building: false,
            result: Some(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_omits_result_field() {
        let json = serde_json::to_string(&BuildStatus::started("app")).unwrap();
        assert_eq!(json, r#"{"name":"app","building":true}"#);
    }

    #[test]
    fn test_finished_wire_shape() {
        let status = BuildStatus::finished(
            "app",
            BuildReport {
                warnings: vec!["w1".to_string()],
                errors: vec!["e1".to_string()],
            },
        );
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"name":"app","building":false,"result":{"warnings":["w1"],"errors":["e1"]}}"#
        );
    }

    #[test]
    fn test_round_trip() {
        let status = BuildStatus::finished("runtime", BuildReport::clean());
        let json = serde_json::to_string(&status).unwrap();
        let back: BuildStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
