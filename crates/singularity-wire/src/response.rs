//! Read payloads returned by the scheduler.

use serde::{Deserialize, Serialize};

use crate::deploy::SingularityDeploy;
use crate::request::{RequestState, SingularityRequest};

/// Pointer to a deploy inside a request's deploy state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployMarker {
    pub request_id: String,
    pub deploy_id: String,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Which deploys of a request are committed and which are still rolling out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDeployState {
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deploy: Option<DeployMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_deploy: Option<DeployMarker>,
}

/// Response of `GET /api/requests/request/{id}` and elements of `GET /api/requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParent {
    pub request: SingularityRequest,
    pub state: RequestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_deploy_state: Option<RequestDeployState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deploy: Option<SingularityDeploy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_deploy: Option<SingularityDeploy>,
}

impl RequestParent {
    /// Id of the committed deploy, if any.
    pub fn active_deploy_id(&self) -> Option<&str> {
        self.request_deploy_state
            .as_ref()
            .and_then(|s| s.active_deploy.as_ref())
            .map(|m| m.deploy_id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Id of the deploy still rolling out, if any.
    pub fn pending_deploy_id(&self) -> Option<&str> {
        self.request_deploy_state
            .as_ref()
            .and_then(|s| s.pending_deploy.as_ref())
            .map(|m| m.deploy_id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Whether `deploy_id` is either the active or the pending deploy.
    pub fn tracks_deploy(&self, deploy_id: &str) -> bool {
        self.active_deploy_id() == Some(deploy_id) || self.pending_deploy_id() == Some(deploy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parent(deploy_state: serde_json::Value) -> RequestParent {
        serde_json::from_value(json!({
            "request": {"id": "web", "requestType": "SERVICE", "instances": 2},
            "state": "ACTIVE",
            "requestDeployState": deploy_state,
        }))
        .unwrap()
    }

    #[test]
    fn test_deploy_ids_from_deploy_state() {
        let p = parent(json!({
            "requestId": "web",
            "activeDeploy": {"requestId": "web", "deployId": "a1", "timestamp": 1700000000000i64},
            "pendingDeploy": {"requestId": "web", "deployId": "p2"}
        }));
        assert_eq!(p.active_deploy_id(), Some("a1"));
        assert_eq!(p.pending_deploy_id(), Some("p2"));
        assert!(p.tracks_deploy("p2"));
        assert!(!p.tracks_deploy("zz"));
    }

    #[test]
    fn test_empty_deploy_id_is_absent() {
        let p = parent(json!({
            "requestId": "web",
            "activeDeploy": {"requestId": "web", "deployId": ""}
        }));
        assert_eq!(p.active_deploy_id(), None);
        assert_eq!(p.pending_deploy_id(), None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let p: RequestParent = serde_json::from_value(json!({
            "request": {"id": "w", "requestType": "WORKER", "owners": ["ops"]},
            "state": "PAUSED",
            "taskIds": {"healthy": []}
        }))
        .unwrap();
        assert_eq!(p.state, RequestState::Paused);
        assert!(p.request_deploy_state.is_none());
    }
}
