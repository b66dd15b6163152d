//! Deployment state as observed through status polling

use std::fmt;
use std::str::FromStr;

/// Deployment state reported by the deployment service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentState {
    /// Accepted but not yet scheduled
    Created,

    /// Waiting behind other work in the service
    Queued,

    /// Traffic shifting or instance updates under way
    InProgress,

    /// Completed on every target
    Succeeded,

    /// Failed, possibly rolled back by the service
    Failed,

    /// Stopped by an operator or an alarm
    Stopped,
}

impl DeploymentState {
    /// States a deployment passes through before it settles
    pub const IN_FLIGHT: [DeploymentState; 3] = [
        DeploymentState::Created,
        DeploymentState::Queued,
        DeploymentState::InProgress,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Succeeded | DeploymentState::Failed | DeploymentState::Stopped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentState::Created => "Created",
            DeploymentState::Queued => "Queued",
            DeploymentState::InProgress => "InProgress",
            DeploymentState::Succeeded => "Succeeded",
            DeploymentState::Failed => "Failed",
            DeploymentState::Stopped => "Stopped",
        }
    }

    /// Map a raw service status onto a state.
    ///
    /// Anything that is not one of the known terminal states is transient, so
    /// statuses such as `Ready` or `Baking` keep the monitor polling.
    pub fn from_service_status(status: &str) -> Self {
        status.parse().unwrap_or(DeploymentState::InProgress)
    }

    fn rank(&self) -> u8 {
        match self {
            DeploymentState::Created => 0,
            DeploymentState::Queued => 1,
            DeploymentState::InProgress => 2,
            DeploymentState::Succeeded | DeploymentState::Failed | DeploymentState::Stopped => 3,
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(DeploymentState::Created),
            "Queued" => Ok(DeploymentState::Queued),
            "InProgress" | "Ready" | "Baking" => Ok(DeploymentState::InProgress),
            "Succeeded" => Ok(DeploymentState::Succeeded),
            "Failed" => Ok(DeploymentState::Failed),
            "Stopped" => Ok(DeploymentState::Stopped),
            _ => Err(format!("Unknown deployment state: {}", s)),
        }
    }
}

/// Result of feeding one observation into the FSM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First observation or a forward move
    Advanced,

    /// Same state as the previous poll
    Unchanged,

    /// The service reported an earlier transient state than before
    Regressed,

    /// A terminal state was reached
    Settled,
}

/// Tracks what the monitor has seen of one deployment.
///
/// Polling may skip intermediate states, so any forward jump is accepted.
/// Once a terminal state has been observed, the FSM is closed.
#[derive(Debug, Clone, Default)]
pub struct DeploymentFsm {
    current: Option<DeploymentState>,
    observations: u32,
}

impl DeploymentFsm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed state
    pub fn state(&self) -> Option<DeploymentState> {
        self.current
    }

    /// Number of accepted observations
    pub fn observations(&self) -> u32 {
        self.observations
    }

    /// Terminal state, once one has been observed
    pub fn outcome(&self) -> Option<DeploymentState> {
        self.current.filter(DeploymentState::is_terminal)
    }

    /// Record a polled state
    pub fn observe(&mut self, state: DeploymentState) -> Result<Observation, String> {
        let observation = match self.current {
            Some(previous) if previous.is_terminal() => {
                return Err(format!(
                    "Invalid observation: {} after terminal state {}",
                    state, previous
                ));
            }
            _ if state.is_terminal() => Observation::Settled,
            None => Observation::Advanced,
            Some(previous) if previous == state => Observation::Unchanged,
            Some(previous) if state.rank() < previous.rank() => Observation::Regressed,
            Some(_) => Observation::Advanced,
        };

        self.current = Some(state);
        self.observations += 1;
        Ok(observation)
    }
}
