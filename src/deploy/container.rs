//! Container specification of a deployment.
//!
//! Port mappings and volumes are sets: order on input does not matter and
//! duplicates (by full-field identity) collapse.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use singularity_wire::{
    ContainerInfo, ContainerType, DockerInfo, DockerNetwork, DockerPortMapping, SingularityVolume,
};

use super::DeployError;

pub type PortMapping = DockerPortMapping;
pub type Volume = SingularityVolume;

/// Container runtime settings. Only `DOCKER` is supported for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub container_type: ContainerType,
    pub image: String,
    pub force_pull_image: bool,
    pub network: DockerNetwork,
    pub port_mappings: BTreeSet<PortMapping>,
    pub volumes: BTreeSet<Volume>,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self::docker("")
    }
}

impl ContainerSpec {
    /// Docker container running `image` on the bridge network.
    pub fn docker(image: impl Into<String>) -> Self {
        Self {
            container_type: ContainerType::Docker,
            image: image.into(),
            force_pull_image: false,
            network: DockerNetwork::Bridge,
            port_mappings: BTreeSet::new(),
            volumes: BTreeSet::new(),
        }
    }

    pub fn with_force_pull(mut self, force: bool) -> Self {
        self.force_pull_image = force;
        self
    }

    pub fn with_network(mut self, network: DockerNetwork) -> Self {
        self.network = network;
        self
    }

    pub fn with_port_mapping(mut self, mapping: PortMapping) -> Self {
        self.port_mappings.insert(mapping);
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.insert(volume);
        self
    }

    pub fn to_wire(&self) -> ContainerInfo {
        ContainerInfo {
            container_type: self.container_type,
            docker: Some(DockerInfo {
                image: self.image.clone(),
                force_pull_image: self.force_pull_image,
                network: self.network,
                port_mappings: self.port_mappings.iter().cloned().collect(),
            }),
            volumes: self.volumes.iter().cloned().collect(),
        }
    }

    pub fn from_wire(info: &ContainerInfo) -> Result<Self, DeployError> {
        if info.container_type != ContainerType::Docker {
            return Err(DeployError::UnsupportedContainerType(info.container_type));
        }
        let docker = info.docker.as_ref();
        Ok(Self {
            container_type: info.container_type,
            image: docker.map(|d| d.image.clone()).unwrap_or_default(),
            force_pull_image: docker.map(|d| d.force_pull_image).unwrap_or(false),
            network: docker.map(|d| d.network).unwrap_or_default(),
            port_mappings: docker
                .map(|d| d.port_mappings.iter().cloned().collect())
                .unwrap_or_default(),
            volumes: info.volumes.iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use singularity_wire::{PortMappingType, PortProtocol, VolumeMode};

    fn mapping(container_port: u32, host_port: u32, protocol: PortProtocol) -> PortMapping {
        PortMapping {
            container_port_type: PortMappingType::Literal,
            container_port,
            host_port_type: PortMappingType::FromOffer,
            host_port,
            protocol,
        }
    }

    fn volume(host: &str, container: &str, mode: VolumeMode) -> Volume {
        Volume {
            host_path: host.into(),
            container_path: container.into(),
            mode,
        }
    }

    #[test]
    fn test_port_mappings_order_independent_and_deduplicated() {
        let a = mapping(80, 0, PortProtocol::Tcp);
        let b = mapping(53, 1, PortProtocol::Udp);

        let first = ContainerSpec::docker("dns")
            .with_port_mapping(a.clone())
            .with_port_mapping(b.clone());
        let second = ContainerSpec::docker("dns")
            .with_port_mapping(b.clone())
            .with_port_mapping(a.clone())
            .with_port_mapping(a.clone());

        assert_eq!(first, second);
        assert_eq!(second.port_mappings.len(), 2);

        let encoded = serde_json::to_string(&second.to_wire()).unwrap();
        let decoded: ContainerInfo = serde_json::from_str(&encoded).unwrap();
        assert_eq!(ContainerSpec::from_wire(&decoded).unwrap(), first);
    }

    #[test]
    fn test_same_ports_different_protocol_are_distinct() {
        let spec = ContainerSpec::docker("dns")
            .with_port_mapping(mapping(53, 0, PortProtocol::Tcp))
            .with_port_mapping(mapping(53, 0, PortProtocol::Udp));
        assert_eq!(spec.port_mappings.len(), 2);
    }

    #[test]
    fn test_volumes_lossless() {
        let spec = ContainerSpec::docker("app")
            .with_volume(volume("/etc/app", "/conf", VolumeMode::ReadOnly))
            .with_volume(volume("/var/data", "/data", VolumeMode::ReadWrite));

        let encoded = serde_json::to_value(spec.to_wire()).unwrap();
        assert_eq!(encoded["volumes"][0]["hostPath"], "/etc/app");
        assert_eq!(encoded["volumes"][1]["mode"], "RW");

        let decoded: ContainerInfo = serde_json::from_value(encoded).unwrap();
        assert_eq!(ContainerSpec::from_wire(&decoded).unwrap().volumes, spec.volumes);
    }

    #[test]
    fn test_from_wire_rejects_mesos() {
        let info = ContainerInfo {
            container_type: ContainerType::Mesos,
            docker: None,
            volumes: vec![],
        };
        assert!(matches!(
            ContainerSpec::from_wire(&info),
            Err(DeployError::UnsupportedContainerType(ContainerType::Mesos))
        ));
    }
}
