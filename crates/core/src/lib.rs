// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daokit-core: Persisted contracts for the DAOKit orchestration engine

pub mod checkpoint;
pub mod clock;
pub mod event;
pub mod handoff;
pub mod hash;
pub mod heartbeat;
pub mod id;
pub mod lease;
pub mod reason;
pub mod run;
pub mod state;
pub mod step;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use checkpoint::{CheckpointRecord, LifecycleNode};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{EventDraft, EventRecord, EventType, Severity};
pub use handoff::{HandoffPackage, OpenAcceptanceItem};
pub use hash::{canonical_hash, derived_id, short_hash};
pub use heartbeat::{HeartbeatRecord, HeartbeatState};
pub use id::{CountingTokenGen, TokenGen, UuidTokenGen};
pub use lease::{LeaseStatus, ProcessLease, ThreadId};
pub use run::{RunId, RunKey, TaskId};
pub use state::{
    PipelineState, PipelineStatus, StepEntry, StepState, Succession, SuccessorIdentity,
};
pub use step::{ExpectedOutput, StepContract, StepId};

/// Version stamped into every persisted record of the contract family.
///
/// The `1.0.0` family is additive-only: enum value sets are frozen and new
/// detail may appear only inside open payload objects.
pub const SCHEMA_VERSION: &str = "1.0.0";
