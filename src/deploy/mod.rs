//! Deployment Builder
//!
//! A deployment is an immutable runtime version attached to one job.
//! `DeploymentBuilder` accumulates attributes through value-returning
//! setters; `build()` hands out an independent snapshot, so a builder can be
//! reused for several partial variants.

mod container;
mod fingerprint;

pub use container::{ContainerSpec, PortMapping, Volume};
pub use fingerprint::{fingerprint, FINGERPRINT_LEN};

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use singularity_wire::{ContainerType, DeployRequest, DeployResources, MesosArtifact, SingularityDeploy};

use crate::api::ClientError;
use crate::job::{normalize_job_id, JobError};

pub type Resources = DeployResources;
pub type Artifact = MesosArtifact;

/// Maximum length of a deploy id accepted by the scheduler.
pub const MAX_DEPLOY_ID_LEN: usize = 50;

/// Check a deploy id against `[A-Za-z0-9_]+`, at most 50 characters.
pub fn validate_deploy_id(id: &str) -> Result<(), DeployError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

    if id.len() > MAX_DEPLOY_ID_LEN || !pattern.is_match(id) {
        return Err(DeployError::InvalidDeployId(id.to_string()));
    }
    Ok(())
}

/// An immutable deployment snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub job_id: String,
    pub command: Option<String>,
    pub arguments: Vec<String>,
    pub container: ContainerSpec,
    pub resources: Resources,
    pub env: BTreeMap<String, String>,
    pub uris: Vec<Artifact>,
    pub labels: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

/// Start building a deployment.
pub fn new_deployment(id: impl Into<String>) -> DeploymentBuilder {
    DeploymentBuilder::new(id)
}

/// Value-returning deployment builder
#[derive(Debug, Clone)]
pub struct DeploymentBuilder {
    draft: Deployment,
}

impl DeploymentBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            draft: Deployment {
                id: id.into(),
                job_id: String::new(),
                command: None,
                arguments: Vec::new(),
                container: ContainerSpec::default(),
                resources: Resources::default(),
                env: BTreeMap::new(),
                uris: Vec::new(),
                labels: BTreeMap::new(),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// The job this deployment attaches to.
    pub fn set_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.draft.job_id = job_id.into();
        self
    }

    pub fn set_command(mut self, command: impl Into<String>) -> Self {
        self.draft.command = Some(command.into());
        self
    }

    /// Replace the container spec. Only `DOCKER` is supported.
    pub fn set_container_spec(mut self, spec: ContainerSpec) -> Result<Self, DeployError> {
        if spec.container_type != ContainerType::Docker {
            return Err(DeployError::UnsupportedContainerType(spec.container_type));
        }
        self.draft.container = spec;
        Ok(self)
    }

    pub fn set_resources(mut self, resources: Resources) -> Self {
        self.draft.resources = resources;
        self
    }

    pub fn set_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.draft.env = env;
        self
    }

    pub fn set_args(mut self, args: Vec<String>) -> Self {
        self.draft.arguments = args;
        self
    }

    pub fn set_uris(mut self, uris: Vec<Artifact>) -> Self {
        self.draft.uris = uris;
        self
    }

    pub fn set_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.draft.labels = labels;
        self
    }

    pub fn set_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.draft.metadata = metadata;
        self
    }

    /// Snapshot the current state.
    ///
    /// The deploy id may be empty; it is assigned from the content
    /// fingerprint at creation time.
    pub fn build(&self) -> Result<Deployment, DeployError> {
        let mut snapshot = self.draft.clone();
        if snapshot.job_id.is_empty() {
            return Err(DeployError::MissingJobId);
        }
        snapshot.job_id = normalize_job_id(&snapshot.job_id)?;
        if !snapshot.id.is_empty() {
            validate_deploy_id(&snapshot.id)?;
        }
        Ok(snapshot)
    }
}

impl Deployment {
    /// Cross-field checks performed before anything is sent.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.container.image.trim().is_empty() {
            return Err(DeployError::MissingImage);
        }
        let mappings = self.container.port_mappings.len();
        if (self.resources.num_ports as usize) < mappings {
            return Err(DeployError::NotEnoughPorts {
                num_ports: self.resources.num_ports,
                mappings,
            });
        }
        for (name, value) in [("cpus", self.resources.cpus), ("memory_mb", self.resources.memory_mb)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DeployError::InvalidResources(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Fields that force a new deployment version when they change.
    /// Identity (`id`, `job_id`) is excluded.
    pub fn same_content(&self, other: &Deployment) -> bool {
        self.command == other.command
            && self.arguments == other.arguments
            && self.container == other.container
            && self.resources == other.resources
            && self.env == other.env
            && self.uris == other.uris
            && self.labels == other.labels
            && self.metadata == other.metadata
    }

    pub fn to_wire(&self) -> SingularityDeploy {
        SingularityDeploy {
            id: self.id.clone(),
            request_id: self.job_id.clone(),
            command: self.command.clone(),
            arguments: self.arguments.clone(),
            container_info: Some(self.container.to_wire()),
            resources: Some(self.resources),
            env: self.env.clone(),
            uris: self.uris.clone(),
            labels: self.labels.clone(),
            metadata: self.metadata.clone(),
            skip_healthchecks_on_deploy: true,
        }
    }

    pub fn from_wire(deploy: &SingularityDeploy) -> Result<Self, DeployError> {
        let container = match &deploy.container_info {
            Some(info) => ContainerSpec::from_wire(info)?,
            None => ContainerSpec::default(),
        };
        Ok(Self {
            id: deploy.id.clone(),
            job_id: deploy.request_id.clone(),
            command: deploy.command.clone(),
            arguments: deploy.arguments.clone(),
            container,
            resources: deploy.resources.unwrap_or_default(),
            env: deploy.env.clone(),
            uris: deploy.uris.clone(),
            labels: deploy.labels.clone(),
            metadata: deploy.metadata.clone(),
        })
    }

    /// Copy of this deployment with its id replaced by the content fingerprint.
    pub fn with_fingerprint_id(&self) -> Result<Self, DeployError> {
        let mut keyed = self.clone();
        keyed.id = fingerprint(&self.to_wire())?;
        Ok(keyed)
    }

    /// Body for `POST /api/deploys`.
    pub fn to_request(&self) -> DeployRequest {
        DeployRequest::new(self.to_wire())
    }
}

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("unsupported container type {0} (only DOCKER is supported)")]
    UnsupportedContainerType(ContainerType),

    #[error("invalid deploy id '{0}' (allowed: letters, digits and '_', at most 50 chars)")]
    InvalidDeployId(String),

    #[error("deployment has no job id")]
    MissingJobId,

    #[error("deployment has no container image")]
    MissingImage,

    #[error("resources.num_ports ({num_ports}) is less than the number of port mappings ({mappings})")]
    NotEnoughPorts { num_ports: u32, mappings: usize },

    #[error("invalid resources: {0}")]
    InvalidResources(String),

    #[error("JCS canonicalization error: {0}")]
    Canonicalization(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
