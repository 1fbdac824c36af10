//! Mock Scheduler State Management
//!
//! Jobs with their deploy state, plus tombstones for recently deleted ids.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use singularity_wire::{
    DeployMarker, RequestDeployState, RequestParent, RequestState, SingularityDeploy, SingularityRequest,
};

/// When a pending deploy becomes active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployActivation {
    /// Promoted on the Nth read of the job after submission (0 = at submission)
    AfterReads(u32),
    /// Stays pending forever
    Never,
}

impl Default for DeployActivation {
    fn default() -> Self {
        DeployActivation::AfterReads(1)
    }
}

/// A job held by the mock scheduler
#[derive(Debug, Clone)]
pub struct MockJob {
    pub request: SingularityRequest,
    pub state: RequestState,
    pub active: Option<(SingularityDeploy, i64)>,
    pub pending: Option<(SingularityDeploy, i64)>,
    /// Reads left before the pending deploy is promoted (None = never)
    pub pending_reads_left: Option<u32>,
}

impl MockJob {
    pub fn new(request: SingularityRequest) -> Self {
        Self {
            request,
            state: RequestState::Active,
            active: None,
            pending: None,
            pending_reads_left: None,
        }
    }

    /// Put `deploy` in the pending slot
    pub fn submit(&mut self, deploy: SingularityDeploy, activation: DeployActivation) {
        self.pending = Some((deploy, Utc::now().timestamp_millis()));
        self.pending_reads_left = match activation {
            DeployActivation::AfterReads(n) => Some(n),
            DeployActivation::Never => None,
        };
        if self.pending_reads_left == Some(0) {
            self.promote();
        }
    }

    /// Count one read, promoting the pending deploy when due
    pub fn observe_read(&mut self) {
        if self.pending.is_none() {
            return;
        }
        if let Some(left) = self.pending_reads_left.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.promote();
            }
        }
    }

    fn promote(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.active = Some(pending);
        }
        self.pending_reads_left = None;
    }

    /// Render the read payload
    pub fn to_parent(&self) -> RequestParent {
        let marker = |slot: &Option<(SingularityDeploy, i64)>| {
            slot.as_ref().map(|(deploy, ts)| DeployMarker {
                request_id: self.request.id.clone(),
                deploy_id: deploy.id.clone(),
                timestamp: Some(*ts),
            })
        };
        let deploy_state = if self.active.is_some() || self.pending.is_some() {
            Some(RequestDeployState {
                request_id: self.request.id.clone(),
                active_deploy: marker(&self.active),
                pending_deploy: marker(&self.pending),
            })
        } else {
            None
        };

        RequestParent {
            request: self.request.clone(),
            state: self.state,
            request_deploy_state: deploy_state,
            active_deploy: self.active.as_ref().map(|(d, _)| d.clone()),
            pending_deploy: self.pending.as_ref().map(|(d, _)| d.clone()),
        }
    }
}

/// State for the mock scheduler
#[derive(Debug, Default)]
pub struct MockState {
    pub jobs: BTreeMap<String, MockJob>,
    /// Create attempts still refused with 409 after a delete, per id
    pub tombstones: HashMap<String, u32>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one tombstone hit for `id`; true if the create must be refused
    pub fn hit_tombstone(&mut self, id: &str) -> bool {
        match self.tombstones.get_mut(id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => {
                self.tombstones.remove(id);
                false
            }
        }
    }
}
