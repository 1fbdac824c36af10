//! Mutation payloads.

use serde::{Deserialize, Serialize};

use crate::deploy::SingularityDeploy;
use crate::request::SingularityRequest;

/// Audit message attached to every request deletion.
pub const DELETE_MESSAGE: &str = "reconciler detected changes";

/// Action id attached to every request deletion.
pub const DELETE_ACTION_ID: &str = "reconcile update";

/// Body of `DELETE /api/requests/request/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub delete_from_load_balancer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

impl DeleteRequest {
    /// Deletion with the fixed audit message.
    pub fn audited() -> Self {
        Self {
            delete_from_load_balancer: false,
            message: Some(DELETE_MESSAGE.to_string()),
            action_id: Some(DELETE_ACTION_ID.to_string()),
        }
    }
}

/// Body of `PUT /api/requests/request/{id}/scale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    pub instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Roll instances over in batches rather than all at once.
    #[serde(default)]
    pub incremental: bool,
}

impl ScaleRequest {
    pub fn to(instances: u32) -> Self {
        Self {
            instances,
            message: Some(format!("scale to {}", instances)),
            incremental: true,
        }
    }
}

/// Body of `POST /api/deploys`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub deploy: SingularityDeploy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_request: Option<SingularityRequest>,
    #[serde(default)]
    pub unpause_on_successful_deploy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeployRequest {
    pub fn new(deploy: SingularityDeploy) -> Self {
        let message = Some(format!("deploy {}", deploy.id));
        Self {
            deploy,
            updated_request: None,
            unpause_on_successful_deploy: false,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delete_body() {
        let v = serde_json::to_value(DeleteRequest::audited()).unwrap();
        assert_eq!(
            v,
            json!({
                "deleteFromLoadBalancer": false,
                "message": DELETE_MESSAGE,
                "actionId": DELETE_ACTION_ID
            })
        );
    }

    #[test]
    fn test_scale_body() {
        let v = serde_json::to_value(ScaleRequest::to(5)).unwrap();
        assert_eq!(v, json!({"instances": 5, "message": "scale to 5", "incremental": true}));
    }
}
