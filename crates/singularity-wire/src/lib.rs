//! Singularity Wire Types
//!
//! JSON payloads exchanged with the Singularity scheduler HTTP API, plus the
//! route table the reconciler talks to.

pub mod error;
pub mod request;
pub mod deploy;
pub mod response;
pub mod ops;

pub use error::WireError;
pub use request::{RequestState, RequestType, ScheduleType, SingularityRequest, SlavePlacement};
pub use deploy::{
    ContainerInfo, ContainerType, DeployResources, DockerInfo, DockerNetwork, DockerPortMapping,
    MesosArtifact, PortMappingType, PortProtocol, SingularityDeploy, SingularityVolume, VolumeMode,
};
pub use response::{DeployMarker, RequestDeployState, RequestParent};
pub use ops::{DeleteRequest, DeployRequest, ScaleRequest};

/// HTTP routes exposed by the scheduler.
pub mod routes {
    /// Collection of requests (list and create).
    pub const REQUESTS: &str = "/api/requests";

    /// Deploy submission endpoint.
    pub const DEPLOYS: &str = "/api/deploys";

    /// Single request by id (read and delete).
    pub fn request(request_id: &str) -> String {
        format!("/api/requests/request/{}", request_id)
    }

    /// Instance count of a request.
    pub fn scale(request_id: &str) -> String {
        format!("/api/requests/request/{}/scale", request_id)
    }

    /// A deploy that has not yet become active.
    pub fn pending_deploy(deploy_id: &str, request_id: &str) -> String {
        format!("/api/deploys/deploy/{}/request/{}", deploy_id, request_id)
    }
}
