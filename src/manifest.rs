//! Desired-state manifests
//!
//! A manifest is a TOML file with an optional `[job]` table and an optional
//! `[deployment]` table. Enum values are accepted in any case.
//!
//! ```toml
//! [job]
//! id = "bar"
//! type = "service"
//! instances = 3
//!
//! [deployment]
//! command = "/app/run"
//!
//! [deployment.container]
//! image = "registry/bar:1.4"
//!
//! [deployment.resources]
//! cpus = 0.5
//! memory_mb = 256
//! num_ports = 1
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use singularity_wire::{
    ContainerType, DockerNetwork, PortMappingType, PortProtocol, SlavePlacement, VolumeMode, WireError,
};

use crate::deploy::{new_deployment, Artifact, ContainerSpec, DeployError, Deployment, PortMapping, Resources, Volume};
use crate::job::{create_job, Job, JobError, JobKind};

/// Manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("deployment has no job_id and the manifest has no [job]")]
    MissingJobId,
}

/// Parsed manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub job: Option<Job>,
    pub deployment: Option<Deployment>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    job: Option<RawJob>,
    deployment: Option<RawDeployment>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJob {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    instances: Option<u32>,
    schedule: Option<String>,
    schedule_type: Option<String>,
    num_retries_on_failure: Option<u32>,
    slave_placement: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeployment {
    #[serde(default)]
    id: String,
    job_id: Option<String>,
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    container: RawContainer,
    #[serde(default)]
    resources: Option<RawResources>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    uris: Vec<RawArtifact>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContainer {
    #[serde(rename = "type", default = "default_container_type")]
    container_type: String,
    image: String,
    #[serde(default)]
    force_pull_image: bool,
    network: Option<String>,
    #[serde(default)]
    port_mappings: Vec<RawPortMapping>,
    #[serde(default)]
    volumes: Vec<RawVolume>,
}

fn default_container_type() -> String {
    ContainerType::Docker.as_str().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPortMapping {
    container_port_type: Option<String>,
    container_port: u32,
    host_port_type: Option<String>,
    host_port: u32,
    protocol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVolume {
    host_path: String,
    container_path: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResources {
    cpus: f64,
    memory_mb: f64,
    #[serde(default)]
    num_ports: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtifact {
    uri: String,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    extract: bool,
    #[serde(default)]
    executable: bool,
}

/// Parse an optional enum field, falling back to its default.
fn parse_or_default<T>(value: Option<&str>) -> Result<T, WireError>
where
    T: std::str::FromStr<Err = WireError> + Default,
{
    value.map_or_else(|| Ok(T::default()), str::parse)
}

impl RawJob {
    fn into_job(self) -> Result<Job, ManifestError> {
        let kind: JobKind = self.kind.parse()?;
        let mut job = create_job(kind, &self.id)?;
        if let Some(kind) = &self.schedule_type {
            job = job.set_schedule_kind(kind)?;
        }
        if let Some(schedule) = &self.schedule {
            job = job.set_schedule(schedule)?;
        }
        if let Some(instances) = self.instances {
            job = job.set_instances(instances)?;
        }
        if let Some(retries) = self.num_retries_on_failure {
            job = job.set_retries(retries)?;
        }
        if let Some(placement) = &self.slave_placement {
            job = job.set_slave_placement(placement.parse::<SlavePlacement>()?);
        }
        job.validate()?;
        Ok(job)
    }
}

impl RawContainer {
    fn into_spec(self) -> Result<ContainerSpec, ManifestError> {
        let mut spec = ContainerSpec::docker(self.image)
            .with_force_pull(self.force_pull_image)
            .with_network(parse_or_default::<DockerNetwork>(self.network.as_deref())?);
        spec.container_type = self.container_type.parse()?;
        for mapping in self.port_mappings {
            spec = spec.with_port_mapping(PortMapping {
                container_port_type: parse_or_default::<PortMappingType>(mapping.container_port_type.as_deref())?,
                container_port: mapping.container_port,
                host_port_type: parse_or_default::<PortMappingType>(mapping.host_port_type.as_deref())?,
                host_port: mapping.host_port,
                protocol: parse_or_default::<PortProtocol>(mapping.protocol.as_deref())?,
            });
        }
        for volume in self.volumes {
            spec = spec.with_volume(Volume {
                host_path: volume.host_path,
                container_path: volume.container_path,
                mode: parse_or_default::<VolumeMode>(volume.mode.as_deref())?,
            });
        }
        Ok(spec)
    }
}

impl RawDeployment {
    fn into_deployment(self, fallback_job_id: Option<&str>) -> Result<Deployment, ManifestError> {
        let job_id = self
            .job_id
            .or_else(|| fallback_job_id.map(str::to_string))
            .ok_or(ManifestError::MissingJobId)?;
        let resources = self
            .resources
            .map(|r| Resources {
                cpus: r.cpus,
                memory_mb: r.memory_mb,
                num_ports: r.num_ports,
            })
            .unwrap_or_default();
        let uris = self
            .uris
            .into_iter()
            .map(|a| Artifact {
                uri: a.uri,
                cache: a.cache,
                extract: a.extract,
                executable: a.executable,
            })
            .collect();

        let mut builder = new_deployment(self.id)
            .set_job_id(job_id)
            .set_container_spec(self.container.into_spec()?)?
            .set_resources(resources)
            .set_args(self.args)
            .set_env(self.env)
            .set_uris(uris)
            .set_labels(self.labels)
            .set_metadata(self.metadata);
        if let Some(command) = self.command {
            builder = builder.set_command(command);
        }
        let deployment = builder.build()?;
        deployment.validate()?;
        Ok(deployment)
    }
}

impl Manifest {
    /// Parse manifest text.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(content)?;
        let job = raw.job.map(RawJob::into_job).transpose()?;
        let deployment = raw
            .deployment
            .map(|d| d.into_deployment(job.as_ref().map(|j| j.id.as_str())))
            .transpose()?;
        Ok(Self { job, deployment })
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn is_empty(&self) -> bool {
        self.job.is_none() && self.deployment.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[job]
id = "Bar"
type = "service"
instances = 3
slave_placement = "separate_all_slaves"

[deployment]
command = "/app/run"
args = ["--port", "8080"]
env = { MODE = "prod" }

[deployment.container]
image = "registry/bar:1.4"
network = "host"

[[deployment.container.port_mappings]]
container_port = 8080
host_port = 0
host_port_type = "from_offer"

[[deployment.container.volumes]]
host_path = "/data"
container_path = "/var/data"
mode = "rw"

[deployment.resources]
cpus = 0.5
memory_mb = 256
num_ports = 1

[[deployment.uris]]
uri = "https://example.com/app.tgz"
extract = true
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(FULL).unwrap();
        let job = manifest.job.unwrap();
        assert_eq!(job.id, "bar");
        assert_eq!(job.kind(), JobKind::Service);
        assert_eq!(job.instances(), Some(3));
        assert_eq!(job.slave_placement, SlavePlacement::SeparateAllSlaves);

        let deployment = manifest.deployment.unwrap();
        assert_eq!(deployment.job_id, "bar");
        assert_eq!(deployment.container.network, DockerNetwork::Host);
        assert_eq!(deployment.container.port_mappings.len(), 1);
        let mapping = deployment.container.port_mappings.iter().next().unwrap();
        assert_eq!(mapping.host_port_type, PortMappingType::FromOffer);
        assert_eq!(mapping.protocol, PortProtocol::Tcp);
        let volume = deployment.container.volumes.iter().next().unwrap();
        assert_eq!(volume.mode, VolumeMode::ReadWrite);
        assert_eq!(deployment.uris.len(), 1);
        assert!(deployment.uris[0].extract);
        assert_eq!(deployment.env.get("MODE").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_scheduled_job_only() {
        let manifest = Manifest::parse(
            r#"
[job]
id = "foo"
type = "SCHEDULED"
schedule = "0 7 * * *"
schedule_type = "cron"
num_retries_on_failure = 2
"#,
        )
        .unwrap();
        let job = manifest.job.unwrap();
        assert_eq!(job.schedule(), Some("0 7 * * *"));
        assert_eq!(job.retries(), Some(2));
        assert!(manifest.deployment.is_none());
    }

    #[test]
    fn test_quartz_rejected() {
        let err = Manifest::parse(
            r#"
[job]
id = "foo"
type = "scheduled"
schedule = "0 0 7 * * ?"
schedule_type = "quartz"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Job(JobError::InvalidScheduleKind(_))));
    }

    #[test]
    fn test_not_enough_ports_rejected() {
        let err = Manifest::parse(
            r#"
[deployment]
job_id = "web"

[deployment.container]
image = "nginx"

[[deployment.container.port_mappings]]
container_port = 80
host_port = 0

[[deployment.container.port_mappings]]
container_port = 443
host_port = 1

[deployment.resources]
cpus = 1
memory_mb = 64
num_ports = 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Deploy(DeployError::NotEnoughPorts { .. })));
    }

    #[test]
    fn test_deployment_needs_job_id() {
        let err = Manifest::parse("[deployment.container]\nimage = \"nginx\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::MissingJobId));
    }

    #[test]
    fn test_unknown_enum_value() {
        let err = Manifest::parse("[job]\nid = \"a\"\ntype = \"daemon\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::Job(JobError::InvalidKind(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[job]\nid = \"w\"\ntype = \"worker\"\ninstances = 2\n").unwrap();
        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.job.unwrap().instances(), Some(2));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
