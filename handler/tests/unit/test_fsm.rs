//! FSM unit tests

use deploy_trigger::deploy::fsm::{DeploymentFsm, DeploymentState, Observation};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), None);
    assert_eq!(fsm.outcome(), None);
    assert_eq!(fsm.observations(), 0);
}

#[test]
fn test_fsm_skipped_states() {
    let mut fsm = DeploymentFsm::new();

    // Polling may never see Created or Queued
    assert_eq!(
        fsm.observe(DeploymentState::InProgress),
        Ok(Observation::Advanced)
    );
    assert_eq!(
        fsm.observe(DeploymentState::Succeeded),
        Ok(Observation::Settled)
    );
    assert_eq!(fsm.outcome(), Some(DeploymentState::Succeeded));
}

#[test]
fn test_fsm_failure_flow() {
    let mut fsm = DeploymentFsm::new();

    fsm.observe(DeploymentState::Created).unwrap();
    fsm.observe(DeploymentState::Queued).unwrap();
    fsm.observe(DeploymentState::InProgress).unwrap();
    fsm.observe(DeploymentState::Failed).unwrap();

    assert_eq!(fsm.state(), Some(DeploymentState::Failed));
    assert_eq!(fsm.outcome(), Some(DeploymentState::Failed));
    assert_eq!(fsm.observations(), 4);
}

#[test]
fn test_fsm_invalid_observation() {
    let mut fsm = DeploymentFsm::new();
    fsm.observe(DeploymentState::Succeeded).unwrap();

    // Nothing follows a terminal state
    let result = fsm.observe(DeploymentState::Failed);
    assert!(result.is_err());
    assert_eq!(fsm.outcome(), Some(DeploymentState::Succeeded));
}

#[test]
fn test_terminal_states() {
    for state in DeploymentState::IN_FLIGHT {
        assert!(!state.is_terminal(), "{}", state);
    }
    for state in [
        DeploymentState::Succeeded,
        DeploymentState::Failed,
        DeploymentState::Stopped,
    ] {
        assert!(state.is_terminal(), "{}", state);
    }
}
