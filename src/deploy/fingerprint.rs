//! Content-fingerprint deploy ids.
//!
//! deploy id = first 32 hex chars of SHA-256(JCS(payload with empty id))
//!
//! Identical desired state always yields the same id, so re-applying an
//! unchanged deployment never creates a duplicate version.

use sha2::{Digest, Sha256};

use singularity_wire::SingularityDeploy;

use super::DeployError;

/// Length of a fingerprint id in hex characters.
pub const FINGERPRINT_LEN: usize = 32;

/// Compute the fingerprint of a deploy payload. The payload's own id is ignored.
pub fn fingerprint(deploy: &SingularityDeploy) -> Result<String, DeployError> {
    let mut keyed = deploy.clone();
    keyed.id = String::new();

    let jcs_bytes = serde_json_canonicalizer::to_vec(&keyed)
        .map_err(|e| DeployError::Canonicalization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    Ok(digest)
}
