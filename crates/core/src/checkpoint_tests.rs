// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_checkpoint_is_valid() {
    let cp = CheckpointRecord::new(
        "cp-1",
        Some(StepId::new("S1")),
        LifecycleNode::Verify,
        "abc123",
        chrono::Utc::now(),
    );
    assert!(cp.valid);
    assert_eq!(cp.schema_version, crate::SCHEMA_VERSION);
    assert_eq!(cp.lifecycle_node, LifecycleNode::Verify);
}

#[test]
fn node_serializes_screaming_snake() {
    assert_eq!(
        serde_json::to_string(&LifecycleNode::Transition).unwrap(),
        "\"TRANSITION\""
    );
    let back: LifecycleNode = serde_json::from_str("\"EXTRACT\"").unwrap();
    assert_eq!(back, LifecycleNode::Extract);
}

#[test]
fn serde_round_trip_without_step() {
    let cp = CheckpointRecord::new("cp-2", None, LifecycleNode::Plan, "h", chrono::Utc::now());
    let json = serde_json::to_string(&cp).unwrap();
    assert!(!json.contains("step_id"));
    let back: CheckpointRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(cp, back);
}
