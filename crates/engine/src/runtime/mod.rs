// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lifecycle runtime: a synchronous driver over the node graph
//! `extract → plan → dispatch → verify → transition`, with the rework
//! back-edge and the DRAINING/BLOCKED reliability edges.
//!
//! The driver is single-writer per `(task_id, run_id)`: one logical actor
//! advances a run, and parallel runs live in distinct roots. Blocking points
//! are exactly the dispatch wait, ledger fsync, hook execution, and
//! checkpoint persistence.

pub mod checkpoint;
pub mod guard;

use crate::acceptance::{self, AcceptanceOutcome, ReworkPayload};
use crate::error::RuntimeError;
use crate::handoff;
use crate::heartbeat::HeartbeatService;
use crate::lease::{LeaseRegistry, SuccessorId};
use crate::settings::RunConfig;
use daokit_adapters::{
    ArtifactStore, CallKind, DispatchBackend, DispatchRequest, DispatchResult, DispatchStatus,
};
use daokit_core::reason;
use daokit_core::{
    Clock, EventDraft, EventType, HeartbeatState, LifecycleNode, PipelineState, PipelineStatus,
    ProcessLease, RunKey, StepContract, StepState, ThreadId, UuidTokenGen,
};
use daokit_plan::{Plan, PlanInput};
use daokit_storage::{open_backend, BackendKind, Ledger, RootLayout};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options for one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop cooperatively after the first dispatch completes its artifact
    /// write, leaving the lease ACTIVE (exit 130 convention in tests).
    pub simulate_interruption: bool,
    /// Executor identity for lease registration.
    pub thread_id: Option<ThreadId>,
    pub pid: Option<u32>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Done,
    Interrupted,
    Failed,
}

impl TerminalStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminalStatus::Done => 0,
            TerminalStatus::Interrupted => 130,
            TerminalStatus::Failed => 1,
        }
    }
}

/// Aggregate view for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: Option<PipelineState>,
    pub leases: Vec<ProcessLease>,
    pub heartbeat: Option<daokit_core::HeartbeatRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<PathBuf>,
}

/// Where the verify router sends a failed acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyRoute {
    Rework,
    FailStep,
}

/// Declared predicate table for verify routing. Reasons not listed here
/// abort with a route-guard diagnostic instead of falling through.
fn route_for(reason_code: &str) -> Option<VerifyRoute> {
    match reason_code {
        reason::MISSING_EVIDENCE
        | reason::UNREADABLE_EVIDENCE
        | reason::MISSING_COMMAND_EVIDENCE
        | reason::OUT_OF_SCOPE_CHANGE
        | "DISPATCH_RETRYABLE" => Some(VerifyRoute::Rework),
        reason::INVALID_EVIDENCE_PATH | reason::REWORK_EXHAUSTED | "DISPATCH_FATAL" => {
            Some(VerifyRoute::FailStep)
        }
        _ => None,
    }
}

const KNOWN_ROUTES: &str = "MISSING_EVIDENCE, UNREADABLE_EVIDENCE, MISSING_COMMAND_EVIDENCE, \
     OUT_OF_SCOPE_CHANGE, DISPATCH_RETRYABLE, INVALID_EVIDENCE_PATH, REWORK_EXHAUSTED, \
     DISPATCH_FATAL";

/// The lifecycle runtime for one root.
pub struct Runtime<C: Clock> {
    layout: RootLayout,
    config: RunConfig,
    clock: C,
    dispatch: Box<dyn DispatchBackend>,
    leases: LeaseRegistry<C, UuidTokenGen>,
    heartbeat: HeartbeatService<C>,
}

impl<C: Clock> Runtime<C> {
    pub fn new(
        root: &Path,
        config: RunConfig,
        clock: C,
        dispatch: Box<dyn DispatchBackend>,
    ) -> Self {
        let leases = LeaseRegistry::new(config.lease.clone(), clock.clone(), UuidTokenGen);
        let heartbeat = HeartbeatService::new(config.heartbeat.clone(), clock.clone());
        Self {
            layout: RootLayout::new(root),
            config,
            clock,
            dispatch,
            leases,
            heartbeat,
        }
    }

    pub fn layout(&self) -> &RootLayout {
        &self.layout
    }

    fn open_ledger(&self) -> Result<Ledger, RuntimeError> {
        let backend = open_backend(self.layout.root(), BackendKind::from_env())?;
        Ok(Ledger::open(backend)?)
    }

    fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(self.layout.dispatch_artifacts_dir())
    }

    fn holder(&self, options: &RunOptions) -> SuccessorId {
        let pid = options.pid.unwrap_or_else(std::process::id);
        SuccessorId {
            thread_id: options
                .thread_id
                .clone()
                .unwrap_or_else(|| ThreadId::new(format!("thread-{pid}"))),
            pid,
        }
    }

    /// `run(task_id, run_id, goal, options) → terminal status`.
    ///
    /// A fresh root walks extract → plan and then drives the step loop; a
    /// root already holding this run resumes it instead.
    pub fn run(
        &mut self,
        input: PlanInput,
        options: &RunOptions,
    ) -> Result<TerminalStatus, RuntimeError> {
        let mut ledger = self.open_ledger()?;

        if let Some(state) = ledger.state()? {
            let same = input.task_id.as_deref() == Some(state.task_id.as_str())
                && input.run_id.as_deref() == Some(state.run_id.as_str());
            if !same {
                return Err(RuntimeError::RunNotFound {
                    task_id: input.task_id.unwrap_or_default(),
                    run_id: input.run_id.unwrap_or_default(),
                });
            }
            return self.resume_ledger(ledger, state, options);
        }

        // -- extract node: canonicalise the caller's input --
        let input = extract(input);
        let plan = daokit_plan::compile(&input)?;
        let now = self.clock.now();

        let mut state = PipelineState::new(
            plan.task_id.clone(),
            plan.run_id.clone(),
            &plan.goal,
            &plan.steps,
            now,
        );
        ledger.commit_state(
            &state,
            EventDraft::new(
                EventType::RunStarted,
                state.task_id.clone(),
                state.run_id.clone(),
            )
            .payload(serde_json::json!({"goal": &plan.goal})),
            now,
        )?;
        checkpoint::write_checkpoint(&mut ledger, &self.clock, &state, LifecycleNode::Extract, None)?;
        self.transition(&mut ledger, &mut state, "extract_done", PipelineStatus::Analysis)?;

        // -- plan node: freeze the compiled DAG into the journal --
        guard::check("plan_done", state.status, PipelineStatus::Freeze)?;
        state.status = PipelineStatus::Freeze;
        state.updated_at = self.clock.now();
        ledger.commit_state(
            &state,
            EventDraft::new(
                EventType::LifecycleTransition,
                state.task_id.clone(),
                state.run_id.clone(),
            )
            .payload(serde_json::json!({
                "trigger": "plan_done",
                "from_status": PipelineStatus::Analysis,
                "to_status": PipelineStatus::Freeze,
                "plan": &plan,
                "plan_hash": daokit_core::canonical_hash(&plan),
            })),
            self.clock.now(),
        )?;
        checkpoint::write_checkpoint(&mut ledger, &self.clock, &state, LifecycleNode::Plan, None)?;

        self.drive(&mut ledger, &plan, state, options)
    }

    /// `resume(task_id, run_id) → terminal status`.
    pub fn resume(
        &mut self,
        task_id: &str,
        run_id: &str,
        options: &RunOptions,
    ) -> Result<TerminalStatus, RuntimeError> {
        let ledger = self.open_ledger()?;
        let state = ledger.state()?.ok_or_else(|| RuntimeError::RunNotFound {
            task_id: task_id.to_string(),
            run_id: run_id.to_string(),
        })?;
        if state.task_id != task_id || state.run_id != run_id {
            return Err(RuntimeError::RunNotFound {
                task_id: task_id.to_string(),
                run_id: run_id.to_string(),
            });
        }
        self.resume_ledger(ledger, state, options)
    }

    fn resume_ledger(
        &mut self,
        mut ledger: Ledger,
        mut state: PipelineState,
        options: &RunOptions,
    ) -> Result<TerminalStatus, RuntimeError> {
        if state.status == PipelineStatus::Done {
            return Ok(TerminalStatus::Done);
        }

        // Walk checkpoints to find the newest consistent resume boundary;
        // mismatching records are flagged, never fatal.
        let consistent = checkpoint::latest_consistent(&mut ledger, &state)?;
        info!(
            checkpoint = ?consistent.as_ref().map(|c| c.checkpoint_id.as_str()),
            status = %state.status,
            "resuming run",
        );

        let plan = load_plan(&ledger)?;

        match state.status {
            PipelineStatus::Planning => {
                self.transition(&mut ledger, &mut state, "extract_done", PipelineStatus::Analysis)?;
                self.transition(&mut ledger, &mut state, "plan_done", PipelineStatus::Freeze)?;
            }
            PipelineStatus::Analysis => {
                self.transition(&mut ledger, &mut state, "plan_done", PipelineStatus::Freeze)?;
            }
            PipelineStatus::Blocked => {
                self.transition(&mut ledger, &mut state, "manual_recovery", PipelineStatus::Execute)?;
            }
            PipelineStatus::Draining => {
                self.leave_draining(&mut ledger, &mut state)?;
                if state.status == PipelineStatus::Blocked {
                    return self.fail_run(&mut ledger, &state, reason::E_INTERRUPTED, "no valid lease to adopt");
                }
            }
            _ => {}
        }

        self.drive(&mut ledger, &plan, state, options)
    }

    /// `status(task_id, run_id) → aggregate view`.
    pub fn status(
        &self,
        task_id: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<StatusView, RuntimeError> {
        let ledger = self.open_ledger()?;
        let state = ledger.state()?;

        if let (Some(state), Some(task_id)) = (&state, task_id) {
            if state.task_id != task_id {
                return Err(RuntimeError::RunNotFound {
                    task_id: task_id.to_string(),
                    run_id: run_id.unwrap_or_default().to_string(),
                });
            }
        }
        if let (Some(state), Some(run_id)) = (&state, run_id) {
            if state.run_id != run_id {
                return Err(RuntimeError::RunNotFound {
                    task_id: task_id.unwrap_or_default().to_string(),
                    run_id: run_id.to_string(),
                });
            }
        }

        let handoff = handoff::package_files(&self.layout.handoff_dir())
            .unwrap_or_default()
            .into_iter()
            .next_back();

        Ok(StatusView {
            state,
            leases: ledger.leases()?,
            heartbeat: ledger.heartbeat()?,
            handoff,
        })
    }

    /// The dispatch → verify → transition loop over resumable steps.
    fn drive(
        &mut self,
        ledger: &mut Ledger,
        plan: &Plan,
        mut state: PipelineState,
        options: &RunOptions,
    ) -> Result<TerminalStatus, RuntimeError> {
        let store = self.artifact_store();
        let key = RunKey::new(state.task_id.clone(), state.run_id.clone());
        let holder = self.holder(options);

        for step in &plan.steps {
            let entry_state = state.step_state(&step.id);
            match entry_state {
                Some(StepState::Accepted) => continue,
                Some(_) => {}
                None => continue,
            }

            // Steps that were mid-flight or failed before get a resume-style
            // call; fresh steps get create.
            let mut kind = match entry_state {
                Some(StepState::Running) | Some(StepState::Failed) => CallKind::Resume,
                _ => CallKind::Create,
            };
            if entry_state == Some(StepState::Failed) {
                // Manual recovery grants a fresh rework budget
                state
                    .role_lifecycle
                    .remove(&format!("rework:{}", step.id));
            }
            let mut rework: Option<ReworkPayload> = None;

            loop {
                // -- dispatch node --
                self.ensure_execute(ledger, &mut state)?;
                let lease = self.acquire_lease(ledger, &key, step, &holder)?;

                state.current_step = Some(step.id.clone());
                state.set_step_state(&step.id, StepState::Running);
                state.updated_at = self.clock.now();
                ledger.commit_state(
                    &state,
                    EventDraft::new(
                        EventType::StepStarted,
                        key.task_id.clone(),
                        key.run_id.clone(),
                    )
                    .step(step.id.clone())
                    .payload(serde_json::json!({"kind": kind})),
                    self.clock.now(),
                )?;
                self.heartbeat.beat(ledger)?;

                let result = self.dispatch_call(plan, step, kind, rework.take(), &store)?;

                ledger.append(
                    EventDraft::new(
                        EventType::DispatchCompleted,
                        key.task_id.clone(),
                        key.run_id.clone(),
                    )
                    .step(step.id.clone())
                    .payload(serde_json::json!({
                        "status": result.status,
                        "message": &result.message,
                        "call_dir": &result.artifacts.call_dir,
                    })),
                    self.clock.now(),
                )?;
                checkpoint::write_checkpoint(
                    ledger,
                    &self.clock,
                    &state,
                    LifecycleNode::Dispatch,
                    Some(step.id.clone()),
                )?;

                if options.simulate_interruption {
                    info!(step_id = %step.id, "cooperative interruption at node boundary");
                    return Ok(TerminalStatus::Interrupted);
                }

                // Reliability edge: a stale heartbeat (or an external
                // succession) drains the run before verification.
                let beat = self
                    .heartbeat
                    .tick(ledger, &self.layout.dispatch_artifacts_dir())?;
                if beat.status == HeartbeatState::Stale {
                    self.transition(ledger, &mut state, "stale_or_succession", PipelineStatus::Draining)?;
                    self.leave_draining(ledger, &mut state)?;
                    if state.status == PipelineStatus::Blocked {
                        return self.fail_run(ledger, &state, reason::E_INTERRUPTED, "no valid lease to adopt");
                    }
                }

                // -- verify node --
                self.transition(ledger, &mut state, "verify", PipelineStatus::Accept)?;
                let outcome = self.verify(step, &result);

                match outcome {
                    AcceptanceOutcome::Passed { proof } => {
                        ledger.append(
                            EventDraft::new(
                                EventType::AcceptancePassed,
                                key.task_id.clone(),
                                key.run_id.clone(),
                            )
                            .step(step.id.clone())
                            .payload(serde_json::json!({"proof": proof})),
                            self.clock.now(),
                        )?;

                        if let Err(e) =
                            self.leases
                                .release(ledger, &key, &step.id, &lease.lease_token)
                        {
                            warn!(step_id = %step.id, error = %e, "lease release failed");
                        }

                        state.set_step_state(&step.id, StepState::Accepted);
                        state.updated_at = self.clock.now();
                        ledger.commit_state(
                            &state,
                            EventDraft::new(
                                EventType::StepCompleted,
                                key.task_id.clone(),
                                key.run_id.clone(),
                            )
                            .step(step.id.clone()),
                            self.clock.now(),
                        )?;
                        checkpoint::write_checkpoint(
                            ledger,
                            &self.clock,
                            &state,
                            LifecycleNode::Verify,
                            Some(step.id.clone()),
                        )?;
                        break;
                    }
                    AcceptanceOutcome::Failed {
                        reason_code,
                        rework: payload,
                    } => {
                        ledger.append(
                            EventDraft::new(
                                EventType::AcceptanceFailed,
                                key.task_id.clone(),
                                key.run_id.clone(),
                            )
                            .step(step.id.clone())
                            .payload(serde_json::json!({
                                "reason_code": &reason_code,
                                "rework": &payload,
                            })),
                            self.clock.now(),
                        )?;

                        let route = route_for(&reason_code).ok_or_else(|| {
                            RuntimeError::RouteGuard {
                                reason_code: reason_code.clone(),
                                known: KNOWN_ROUTES.to_string(),
                            }
                        })?;

                        let attempts = rework_attempts(&state, &step.id);
                        let exhausted = attempts >= self.config.acceptance.rework_bound;

                        if route == VerifyRoute::FailStep || exhausted {
                            let final_reason = if exhausted && route == VerifyRoute::Rework {
                                reason::REWORK_EXHAUSTED
                            } else {
                                reason_code.as_str()
                            };
                            return self.fail_step(ledger, &mut state, &key, step, &lease, final_reason);
                        }

                        // -- rework back-edge --
                        set_rework_attempts(&mut state, &step.id, attempts + 1);
                        state.updated_at = self.clock.now();
                        ledger.commit_state(
                            &state,
                            EventDraft::new(
                                EventType::ReworkEmitted,
                                key.task_id.clone(),
                                key.run_id.clone(),
                            )
                            .step(step.id.clone())
                            .payload(serde_json::json!({
                                "attempt": attempts + 1,
                                "rework": &payload,
                            })),
                            self.clock.now(),
                        )?;
                        checkpoint::write_checkpoint(
                            ledger,
                            &self.clock,
                            &state,
                            LifecycleNode::Verify,
                            Some(step.id.clone()),
                        )?;

                        kind = CallKind::Rework;
                        rework = Some(payload);
                        if let Err(e) =
                            self.leases
                                .release(ledger, &key, &step.id, &lease.lease_token)
                        {
                            warn!(step_id = %step.id, error = %e, "lease release failed");
                        }
                        continue;
                    }
                }
            }

            // -- transition node --
            checkpoint::write_checkpoint(
                ledger,
                &self.clock,
                &state,
                LifecycleNode::Transition,
                Some(step.id.clone()),
            )?;
        }

        // All steps accepted: ACCEPT --done→ terminal.
        guard::check("done", state.status, PipelineStatus::Done)?;
        state.status = PipelineStatus::Done;
        state.current_step = None;
        state.updated_at = self.clock.now();
        ledger.commit_state(
            &state,
            EventDraft::new(EventType::RunDone, key.task_id.clone(), key.run_id.clone()),
            self.clock.now(),
        )?;
        checkpoint::write_checkpoint(ledger, &self.clock, &state, LifecycleNode::Transition, None)?;
        info!(task_id = %key.task_id, run_id = %key.run_id, "run done");
        Ok(TerminalStatus::Done)
    }

    /// Register a lease, adopting a live one left behind by a predecessor.
    fn acquire_lease(
        &self,
        ledger: &mut Ledger,
        key: &RunKey,
        step: &StepContract,
        holder: &SuccessorId,
    ) -> Result<ProcessLease, RuntimeError> {
        match self.leases.register(ledger, "dispatch", key, &step.id, holder) {
            Ok(lease) => Ok(lease),
            Err(crate::lease::LeaseOpError::AlreadyHeld { .. }) => {
                Ok(self.leases.takeover(ledger, key, &step.id, holder)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn dispatch_call(
        &self,
        plan: &Plan,
        step: &StepContract,
        kind: CallKind,
        rework: Option<ReworkPayload>,
        store: &ArtifactStore,
    ) -> Result<DispatchResult, RuntimeError> {
        let mut payload = plan.dispatch_payload(step);
        if let Some(rework) = rework {
            payload["rework"] = serde_json::to_value(&rework)
                .unwrap_or(serde_json::Value::Null);
        }

        let request = DispatchRequest {
            task_id: plan.task_id.clone(),
            run_id: plan.run_id.clone(),
            step_id: step.id.clone(),
            thread_id: None,
            kind,
            payload,
            evidence_root: self.layout.root().to_path_buf(),
        };

        Ok(match kind {
            CallKind::Create => self.dispatch.create(&request, store)?,
            CallKind::Resume => self.dispatch.resume(&request, store)?,
            CallKind::Rework => self.dispatch.rework(&request, store)?,
        })
    }

    /// The verify node's evaluation: dispatch failures surface here as
    /// routed reasons, acceptance runs over the persisted artifacts.
    fn verify(&self, step: &StepContract, result: &DispatchResult) -> AcceptanceOutcome {
        match result.status {
            DispatchStatus::Success => acceptance::evaluate(
                step,
                self.layout.root(),
                &result.changed_files,
                &self.config.acceptance,
            ),
            DispatchStatus::Retryable => AcceptanceOutcome::Failed {
                reason_code: "DISPATCH_RETRYABLE".to_string(),
                rework: ReworkPayload {
                    step_id: step.id.clone(),
                    reason_code: "DISPATCH_RETRYABLE".to_string(),
                    failed_criteria: step.acceptance_criteria.clone(),
                    artifact_delta: vec![result.message.clone()],
                },
            },
            DispatchStatus::Fatal => AcceptanceOutcome::Failed {
                reason_code: "DISPATCH_FATAL".to_string(),
                rework: ReworkPayload {
                    step_id: step.id.clone(),
                    reason_code: "DISPATCH_FATAL".to_string(),
                    failed_criteria: step.acceptance_criteria.clone(),
                    artifact_delta: vec![result.message.clone()],
                },
            },
        }
    }

    fn ensure_execute(
        &self,
        ledger: &mut Ledger,
        state: &mut PipelineState,
    ) -> Result<(), RuntimeError> {
        if state.status != PipelineStatus::Execute {
            let trigger = match state.status {
                PipelineStatus::Freeze => "dispatch",
                PipelineStatus::Accept => "next_step",
                _ => "dispatch",
            };
            self.transition(ledger, state, trigger, PipelineStatus::Execute)?;
        }
        Ok(())
    }

    /// `DRAINING --successor_accepted_and_lease_adopted→ dispatch`, else
    /// `DRAINING --no_valid_lease→ BLOCKED`.
    fn leave_draining(
        &self,
        ledger: &mut Ledger,
        state: &mut PipelineState,
    ) -> Result<(), RuntimeError> {
        let now = self.clock.now();
        let adoptable = ledger.leases()?.iter().any(|l| {
            l.task_id == state.task_id && l.run_id == state.run_id && l.is_transferable(now)
        });
        if adoptable {
            self.transition(
                ledger,
                state,
                "successor_accepted_and_lease_adopted",
                PipelineStatus::Execute,
            )?;
        } else {
            self.transition(ledger, state, "no_valid_lease", PipelineStatus::Blocked)?;
        }
        Ok(())
    }

    fn fail_step(
        &self,
        ledger: &mut Ledger,
        state: &mut PipelineState,
        key: &RunKey,
        step: &StepContract,
        lease: &ProcessLease,
        reason_code: &str,
    ) -> Result<TerminalStatus, RuntimeError> {
        if let Err(e) = self
            .leases
            .release(ledger, key, &step.id, &lease.lease_token)
        {
            warn!(step_id = %step.id, error = %e, "lease release failed");
        }

        state.set_step_state(&step.id, StepState::Failed);
        state
            .role_lifecycle
            .insert(format!("step:{}", step.id), reason_code.to_string());
        state.updated_at = self.clock.now();
        ledger.commit_state(
            state,
            EventDraft::new(
                EventType::StepFailed,
                key.task_id.clone(),
                key.run_id.clone(),
            )
            .step(step.id.clone())
            .payload(serde_json::json!({"reason_code": reason_code})),
            self.clock.now(),
        )?;
        self.fail_run(ledger, state, reason::E_RUN_FAILED, reason_code)
    }

    fn fail_run(
        &self,
        ledger: &mut Ledger,
        state: &PipelineState,
        code: &str,
        detail: &str,
    ) -> Result<TerminalStatus, RuntimeError> {
        ledger.append(
            EventDraft::new(
                EventType::RunFailed,
                state.task_id.clone(),
                state.run_id.clone(),
            )
            .payload(serde_json::json!({"reason_code": code, "detail": detail})),
            self.clock.now(),
        )?;
        Ok(TerminalStatus::Failed)
    }

    fn transition(
        &self,
        ledger: &mut Ledger,
        state: &mut PipelineState,
        trigger: &str,
        to: PipelineStatus,
    ) -> Result<(), RuntimeError> {
        guard::check(trigger, state.status, to)?;
        let from = state.status;
        state.status = to;
        state.updated_at = self.clock.now();
        ledger.commit_state(
            state,
            EventDraft::new(
                EventType::LifecycleTransition,
                state.task_id.clone(),
                state.run_id.clone(),
            )
            .payload(serde_json::json!({
                "trigger": trigger,
                "from_status": from,
                "to_status": to,
            })),
            self.clock.now(),
        )?;
        Ok(())
    }
}

/// The extract node: canonicalise the caller's input.
fn extract(mut input: PlanInput) -> PlanInput {
    input.goal = input.goal.trim().to_string();
    input.constraints = input
        .constraints
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    input
}

/// The compiled plan is recorded in the journal at the FREEZE transition;
/// resume reads the newest copy back.
pub fn load_plan(ledger: &Ledger) -> Result<Plan, RuntimeError> {
    for event in ledger.events()?.into_iter().rev() {
        if event.event_type != EventType::LifecycleTransition {
            continue;
        }
        if let Some(plan_value) = event.payload.get("plan") {
            let plan: Plan = serde_json::from_value(plan_value.clone())
                .map_err(|_| RuntimeError::PlanNotRecorded)?;
            return Ok(plan);
        }
    }
    Err(RuntimeError::PlanNotRecorded)
}

fn rework_attempts(state: &PipelineState, step_id: &daokit_core::StepId) -> u32 {
    state
        .role_lifecycle
        .get(&format!("rework:{step_id}"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn set_rework_attempts(state: &mut PipelineState, step_id: &daokit_core::StepId, attempts: u32) {
    state
        .role_lifecycle
        .insert(format!("rework:{step_id}"), attempts.to_string());
}

#[cfg(test)]
#[path = "../runtime_tests.rs"]
mod tests;
