// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease registry: typed lease lifecycle plus succession adoption.
//!
//! Leases are the cross-process coordination primitive; no in-memory lock
//! substitutes for one. Expired leases are transitioned to EXPIRED before
//! any operation evaluates them.

use daokit_core::reason;
use daokit_core::{
    Clock, EventDraft, EventType, LeaseStatus, ProcessLease, RunKey, StepId,
    StepState, SuccessorIdentity, ThreadId,
};
use daokit_core::TokenGen;
use daokit_storage::{Ledger, LedgerError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Lease tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    pub ttl_seconds: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self { ttl_seconds: 600 }
    }
}

/// Errors from lease operations, carrying the stable reason codes.
#[derive(Debug, Error)]
pub enum LeaseOpError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("{}: no lease for {task_id}/{run_id}/{step_id}", reason::NO_ACTIVE_LEASE)]
    NoActiveLease {
        task_id: String,
        run_id: String,
        step_id: String,
    },
    #[error("{}: lease for step {step_id} expired at {expired_at}", reason::LEASE_EXPIRED)]
    Expired {
        step_id: String,
        expired_at: DateTime<Utc>,
    },
    #[error("{}: lease belongs to {actual}, not {requested}", reason::LEASE_OWNERSHIP_MISMATCH)]
    OwnershipMismatch { actual: String, requested: String },
    #[error("an active lease already exists for step {step_id}")]
    AlreadyHeld { step_id: String },
}

impl LeaseOpError {
    /// The stable reason code for CLI output and event payloads.
    pub fn reason_code(&self) -> &'static str {
        match self {
            LeaseOpError::Ledger(_) => reason::E_RUN_FAILED,
            LeaseOpError::NoActiveLease { .. } => reason::NO_ACTIVE_LEASE,
            LeaseOpError::Expired { .. } => reason::LEASE_EXPIRED,
            LeaseOpError::OwnershipMismatch { .. } => reason::LEASE_OWNERSHIP_MISMATCH,
            LeaseOpError::AlreadyHeld { .. } => reason::LEASE_OWNERSHIP_MISMATCH,
        }
    }
}

/// Identity of a succession candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorId {
    pub thread_id: ThreadId,
    pub pid: u32,
}

/// Why succession was invoked, and when that condition was decided.
///
/// `decided_at` anchors to the observation that prompted the takeover (a
/// stale-heartbeat escalation, a lease expiry), not to the instant the
/// adoption executes — the gap between the two is the operator's decision
/// latency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessionTrigger {
    pub reason_code: String,
    pub decided_at: DateTime<Utc>,
}

impl SuccessionTrigger {
    /// Explicit operator takeover with no prior escalation on record.
    pub fn operator(decided_at: DateTime<Utc>) -> Self {
        Self {
            reason_code: "OPERATOR_TAKEOVER".to_string(),
            decided_at,
        }
    }

    /// Takeover prompted by a stale-heartbeat escalation.
    pub fn heartbeat_stale(decided_at: DateTime<Utc>) -> Self {
        Self {
            reason_code: "HEARTBEAT_STALE".to_string(),
            decided_at,
        }
    }

    /// Takeover prompted by the incumbent's lease expiring.
    pub fn lease_expired(decided_at: DateTime<Utc>) -> Self {
        Self {
            reason_code: reason::LEASE_EXPIRED.to_string(),
            decided_at,
        }
    }
}

/// Outcome of a batch takeover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessionResult {
    pub adopted_step_ids: Vec<StepId>,
    pub failed_step_ids: Vec<StepId>,
    pub takeover_at: DateTime<Utc>,
}

/// Typed lease lifecycle over the ledger's lease table.
pub struct LeaseRegistry<C: Clock, G: TokenGen> {
    config: LeaseConfig,
    clock: C,
    tokens: G,
}

impl<C: Clock, G: TokenGen> LeaseRegistry<C, G> {
    pub fn new(config: LeaseConfig, clock: C, tokens: G) -> Self {
        Self {
            config,
            clock,
            tokens,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_seconds as i64)
    }

    /// Register a new ACTIVE lease for `(run, step)`.
    ///
    /// Rejected while another unexpired ACTIVE lease exists for the same
    /// pair — the no-two-active-leases invariant.
    pub fn register(
        &self,
        ledger: &mut Ledger,
        lane: &str,
        key: &RunKey,
        step_id: &StepId,
        holder: &SuccessorId,
    ) -> Result<ProcessLease, LeaseOpError> {
        let now = self.clock.now();
        let mut leases = self.expire_stale(ledger)?;

        if leases
            .iter()
            .any(|l| l.matches(&key.task_id, &key.run_id, step_id) && l.is_transferable(now))
        {
            return Err(LeaseOpError::AlreadyHeld {
                step_id: step_id.to_string(),
            });
        }

        // Dead leases for this pair are superseded, not accumulated
        leases.retain(|l| !l.matches(&key.task_id, &key.run_id, step_id));

        let lease = ProcessLease::new(
            lane,
            key.task_id.clone(),
            key.run_id.clone(),
            step_id.clone(),
            holder.thread_id.clone(),
            holder.pid,
            self.tokens.mint(),
            now + self.ttl(),
        );
        leases.push(lease.clone());
        ledger.save_leases(&leases)?;
        Ok(lease)
    }

    /// Liveness ping from the holder: verifies ownership, refreshes the
    /// heartbeat anchor in the lease's expiry window without extending it.
    pub fn heartbeat(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step_id: &StepId,
        lease_token: &str,
    ) -> Result<ProcessLease, LeaseOpError> {
        self.with_owned_lease(ledger, key, step_id, lease_token, |_lease| {})
    }

    /// Extend the holder's lease by one TTL from now.
    pub fn renew(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step_id: &StepId,
        lease_token: &str,
    ) -> Result<ProcessLease, LeaseOpError> {
        let expiry = self.clock.now() + self.ttl();
        self.with_owned_lease(ledger, key, step_id, lease_token, |lease| {
            lease.expires_at = expiry;
        })
    }

    /// Release the holder's lease.
    pub fn release(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step_id: &StepId,
        lease_token: &str,
    ) -> Result<ProcessLease, LeaseOpError> {
        self.with_owned_lease(ledger, key, step_id, lease_token, |lease| {
            lease.status = LeaseStatus::Released;
        })
    }

    /// Transfer one lease to a successor. Only ACTIVE, unexpired leases are
    /// transferable.
    pub fn takeover(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step_id: &StepId,
        successor: &SuccessorId,
    ) -> Result<ProcessLease, LeaseOpError> {
        let now = self.clock.now();
        let mut leases = self.expire_stale(ledger)?;

        let lease = leases
            .iter_mut()
            .find(|l| l.matches(&key.task_id, &key.run_id, step_id))
            .ok_or_else(|| LeaseOpError::NoActiveLease {
                task_id: key.task_id.to_string(),
                run_id: key.run_id.to_string(),
                step_id: step_id.to_string(),
            })?;

        if lease.status == LeaseStatus::Expired {
            return Err(LeaseOpError::Expired {
                step_id: step_id.to_string(),
                expired_at: lease.expires_at,
            });
        }
        if !lease.is_transferable(now) {
            return Err(LeaseOpError::NoActiveLease {
                task_id: key.task_id.to_string(),
                run_id: key.run_id.to_string(),
                step_id: step_id.to_string(),
            });
        }

        lease.thread_id = successor.thread_id.clone();
        lease.pid = successor.pid;
        lease.expires_at = now + self.ttl();
        let adopted = lease.clone();
        ledger.save_leases(&leases)?;

        ledger.append(
            EventDraft::new(
                EventType::LeaseTakeover,
                key.task_id.clone(),
                key.run_id.clone(),
            )
            .step(step_id.clone())
            .payload(serde_json::json!({
                "thread_id": &successor.thread_id,
                "pid": successor.pid,
            })),
            now,
        )?;
        Ok(adopted)
    }

    /// Succession acceptance for a whole run.
    ///
    /// Adopts every ACTIVE unexpired lease for `(task, run)`; running steps
    /// whose leases cannot be adopted are failed with the
    /// `failed_non_adopted_lease` lifecycle marker. The result is recorded in
    /// the pipeline state's succession sub-record.
    pub fn batch_takeover_run(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        successor: &SuccessorId,
        trigger: &SuccessionTrigger,
    ) -> Result<SuccessionResult, LeaseOpError> {
        let now = self.clock.now();
        let mut leases = self.expire_stale(ledger)?;
        let mut state = ledger.require_state()?;

        let mut adopted_step_ids: Vec<StepId> = Vec::new();
        for lease in leases
            .iter_mut()
            .filter(|l| l.task_id == key.task_id && l.run_id == key.run_id)
        {
            if lease.is_transferable(now) {
                lease.thread_id = successor.thread_id.clone();
                lease.pid = successor.pid;
                lease.expires_at = now + self.ttl();
                adopted_step_ids.push(lease.step_id.clone());
            }
        }
        ledger.save_leases(&leases)?;

        // Running steps not covered by an adopted lease cannot continue
        let failed_step_ids: Vec<StepId> = state
            .running_steps()
            .into_iter()
            .filter(|step| !adopted_step_ids.contains(step))
            .collect();

        for step_id in &adopted_step_ids {
            ledger.append(
                EventDraft::new(
                    EventType::LeaseAdopted,
                    key.task_id.clone(),
                    key.run_id.clone(),
                )
                .step(step_id.clone())
                .payload(serde_json::json!({"thread_id": &successor.thread_id})),
                now,
            )?;
        }
        for step_id in &failed_step_ids {
            ledger.append(
                EventDraft::new(
                    EventType::LeaseNotAdopted,
                    key.task_id.clone(),
                    key.run_id.clone(),
                )
                .step(step_id.clone()),
                now,
            )?;
            ledger.append(
                EventDraft::new(
                    EventType::StepFailed,
                    key.task_id.clone(),
                    key.run_id.clone(),
                )
                .step(step_id.clone())
                .payload(serde_json::json!({"reason_code": reason::FAILED_NON_ADOPTED_LEASE})),
                now,
            )?;
            state.set_step_state(step_id, StepState::Failed);
            state.role_lifecycle.insert(
                format!("step:{step_id}"),
                reason::FAILED_NON_ADOPTED_LEASE.to_string(),
            );
        }

        state.succession.last_takeover_at = Some(now);
        state.succession.successor = Some(SuccessorIdentity {
            thread_id: successor.thread_id.to_string(),
            pid: successor.pid,
        });
        state.updated_at = now;

        let result = SuccessionResult {
            adopted_step_ids: adopted_step_ids.clone(),
            failed_step_ids: failed_step_ids.clone(),
            takeover_at: now,
        };

        ledger.commit_state(
            &state,
            EventDraft::new(
                EventType::SuccessionAccepted,
                key.task_id.clone(),
                key.run_id.clone(),
            )
            .payload(serde_json::json!({
                "adopted_step_ids": &adopted_step_ids,
                "failed_step_ids": &failed_step_ids,
                "takeover_at": now,
                "trigger_reason": &trigger.reason_code,
                "decision_at": trigger.decided_at,
                "successor": {
                    "thread_id": &successor.thread_id,
                    "pid": successor.pid,
                },
            })),
            now,
        )?;

        info!(
            task_id = %key.task_id,
            trigger = %trigger.reason_code,
            adopted = adopted_step_ids.len(),
            failed = failed_step_ids.len(),
            "succession accepted",
        );
        Ok(result)
    }

    /// Transition expired ACTIVE leases to EXPIRED and return the table.
    fn expire_stale(&self, ledger: &mut Ledger) -> Result<Vec<ProcessLease>, LeaseOpError> {
        let now = self.clock.now();
        let mut leases = ledger.leases()?;
        let mut dirty = false;
        for lease in leases.iter_mut() {
            if lease.status == LeaseStatus::Active && lease.is_expired(now) {
                lease.status = LeaseStatus::Expired;
                dirty = true;
            }
        }
        if dirty {
            ledger.save_leases(&leases)?;
        }
        Ok(leases)
    }

    /// Shared verify-then-mutate path for holder operations. Every mutating
    /// operation requires the full `(task_id, run_id, step_id)` match.
    fn with_owned_lease(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step_id: &StepId,
        lease_token: &str,
        mutate: impl FnOnce(&mut ProcessLease),
    ) -> Result<ProcessLease, LeaseOpError> {
        let mut leases = self.expire_stale(ledger)?;

        let lease = leases
            .iter_mut()
            .find(|l| l.matches(&key.task_id, &key.run_id, step_id))
            .ok_or_else(|| LeaseOpError::NoActiveLease {
                task_id: key.task_id.to_string(),
                run_id: key.run_id.to_string(),
                step_id: step_id.to_string(),
            })?;

        if lease.lease_token != lease_token {
            return Err(LeaseOpError::OwnershipMismatch {
                actual: lease.thread_id.to_string(),
                requested: lease_token.to_string(),
            });
        }
        if lease.status == LeaseStatus::Expired {
            return Err(LeaseOpError::Expired {
                step_id: step_id.to_string(),
                expired_at: lease.expires_at,
            });
        }

        mutate(lease);
        let updated = lease.clone();
        ledger.save_leases(&leases)?;
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
