//! Deploy payloads.
//!
//! A deploy is an immutable runtime specification attached to one request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{parse_variant, WireError};

/// Container runtime of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerType {
    #[default]
    Docker,
    Mesos,
}

impl ContainerType {
    const VARIANTS: [(Self, &'static str); 2] = [(Self::Docker, "DOCKER"), (Self::Mesos, "MESOS")];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "DOCKER",
            Self::Mesos => "MESOS",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("container type", s, &Self::VARIANTS)
    }
}

/// Docker network mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DockerNetwork {
    #[default]
    Bridge,
    Host,
    None,
}

impl DockerNetwork {
    const VARIANTS: [(Self, &'static str); 3] = [
        (Self::Bridge, "BRIDGE"),
        (Self::Host, "HOST"),
        (Self::None, "NONE"),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bridge => "BRIDGE",
            Self::Host => "HOST",
            Self::None => "NONE",
        }
    }
}

impl FromStr for DockerNetwork {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("docker network", s, &Self::VARIANTS)
    }
}

/// How a port number in a mapping is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortMappingType {
    /// The number is the port itself.
    #[default]
    Literal,
    /// The number indexes into the ports allocated from the resource offer.
    FromOffer,
}

impl PortMappingType {
    const VARIANTS: [(Self, &'static str); 2] =
        [(Self::Literal, "LITERAL"), (Self::FromOffer, "FROM_OFFER")];
}

impl FromStr for PortMappingType {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("port mapping type", s, &Self::VARIANTS)
    }
}

/// Transport protocol of a port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

impl PortProtocol {
    const VARIANTS: [(Self, &'static str); 2] = [(Self::Tcp, "tcp"), (Self::Udp, "udp")];
}

impl FromStr for PortProtocol {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("port protocol", s, &Self::VARIANTS)
    }
}

/// Access mode of a mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VolumeMode {
    #[default]
    #[serde(rename = "RO")]
    ReadOnly,
    #[serde(rename = "RW")]
    ReadWrite,
}

impl VolumeMode {
    const VARIANTS: [(Self, &'static str); 2] = [(Self::ReadOnly, "RO"), (Self::ReadWrite, "RW")];
}

impl FromStr for VolumeMode {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("volume mode", s, &Self::VARIANTS)
    }
}

/// Docker port mapping. Identity is the full set of fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerPortMapping {
    #[serde(default)]
    pub container_port_type: PortMappingType,
    pub container_port: u32,
    #[serde(default)]
    pub host_port_type: PortMappingType,
    pub host_port: u32,
    #[serde(default)]
    pub protocol: PortProtocol,
}

/// Docker-specific container settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerInfo {
    /// Image reference.
    pub image: String,
    /// Pull the image even when cached on the agent.
    #[serde(default)]
    pub force_pull_image: bool,
    #[serde(default)]
    pub network: DockerNetwork,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<DockerPortMapping>,
}

/// Host directory mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingularityVolume {
    pub host_path: String,
    pub container_path: String,
    #[serde(default)]
    pub mode: VolumeMode,
}

/// Container section of a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "type")]
    pub container_type: ContainerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<SingularityVolume>,
}

/// Resources requested per task.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResources {
    #[serde(default)]
    pub cpus: f64,
    #[serde(default)]
    pub memory_mb: f64,
    #[serde(default)]
    pub num_ports: u32,
}

/// Artifact fetched into the task sandbox before launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesosArtifact {
    pub uri: String,
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub extract: bool,
    #[serde(default)]
    pub executable: bool,
}

/// Deploy payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingularityDeploy {
    /// Deploy id, unique within the owning request.
    pub id: String,
    /// Owning request id.
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_info: Option<ContainerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<DeployResources>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<MesosArtifact>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub skip_healthchecks_on_deploy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_mapping_defaults_on_decode() {
        let pm: DockerPortMapping =
            serde_json::from_value(json!({"containerPort": 8080, "hostPort": 0})).unwrap();
        assert_eq!(pm.protocol, PortProtocol::Tcp);
        assert_eq!(pm.container_port_type, PortMappingType::Literal);
        assert_eq!(pm.host_port_type, PortMappingType::Literal);
    }

    #[test]
    fn test_volume_mode_defaults_to_read_only() {
        let vol: SingularityVolume =
            serde_json::from_value(json!({"hostPath": "/etc/app", "containerPath": "/conf"}))
                .unwrap();
        assert_eq!(vol.mode, VolumeMode::ReadOnly);
        let encoded = serde_json::to_value(&vol).unwrap();
        assert_eq!(encoded["mode"], "RO");
    }

    #[test]
    fn test_deploy_field_names_match_remote_schema() {
        let deploy = SingularityDeploy {
            id: "d1".into(),
            request_id: "web".into(),
            command: Some("/bin/serve".into()),
            arguments: vec!["--port".into(), "8080".into()],
            container_info: Some(ContainerInfo {
                container_type: ContainerType::Docker,
                docker: Some(DockerInfo {
                    image: "nginx:1.25".into(),
                    force_pull_image: true,
                    network: DockerNetwork::Bridge,
                    port_mappings: vec![DockerPortMapping {
                        container_port_type: PortMappingType::Literal,
                        container_port: 80,
                        host_port_type: PortMappingType::FromOffer,
                        host_port: 0,
                        protocol: PortProtocol::Tcp,
                    }],
                }),
                volumes: vec![],
            }),
            resources: Some(DeployResources { cpus: 0.5, memory_mb: 128.0, num_ports: 1 }),
            env: BTreeMap::new(),
            uris: vec![],
            labels: BTreeMap::new(),
            metadata: BTreeMap::new(),
            skip_healthchecks_on_deploy: true,
        };
        let v = serde_json::to_value(&deploy).unwrap();
        assert_eq!(v["requestId"], "web");
        assert_eq!(v["containerInfo"]["type"], "DOCKER");
        assert_eq!(v["containerInfo"]["docker"]["forcePullImage"], true);
        assert_eq!(v["containerInfo"]["docker"]["portMappings"][0]["hostPortType"], "FROM_OFFER");
        assert_eq!(v["containerInfo"]["docker"]["portMappings"][0]["protocol"], "tcp");
        assert_eq!(v["resources"]["memoryMb"], 128.0);
        assert_eq!(v["skipHealthchecksOnDeploy"], true);
        assert!(v.get("env").is_none());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("docker".parse::<ContainerType>().unwrap(), ContainerType::Docker);
        assert_eq!("host".parse::<DockerNetwork>().unwrap(), DockerNetwork::Host);
        assert_eq!("UDP".parse::<PortProtocol>().unwrap(), PortProtocol::Udp);
        assert_eq!("rw".parse::<VolumeMode>().unwrap(), VolumeMode::ReadWrite);
        assert_eq!("from_offer".parse::<PortMappingType>().unwrap(), PortMappingType::FromOffer);
        assert!("sctp".parse::<PortProtocol>().is_err());
    }
}
