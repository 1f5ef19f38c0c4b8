//! # State Machines Executor
//!
//! Single background worker advancing every active machine once per block.
//!
//! ## Tick
//!
//! ```text
//! wait_for_next_block ──▶ current_height ──▶ "New Block: <h>"
//!        │
//!        ▼
//! registering cycle new? ──▶ "New Cycle: <start>", create Start records if absent
//!        │
//!        ▼
//! for cycle in cycles_overlapping(h) + expired cycles with open machines:
//!     for record in store.list_entries(cycle):
//!         corrupt? log and skip
//!         outcome = machine.update(state, h)
//!         store.save(outcome.state)           (always, last write wins)
//!         tolerance policy on the outcome
//! ```
//!
//! A cycle stays visited after it leaves the overlap window until every
//! machine in it is terminal, so a broadcast payment is still followed to
//! `Success`. The first tick scans the store for such cycles left by a
//! previous run.
//!
//! A tick error other than cancellation is logged and the tick is retried
//! after the backoff delay. Cancellation is checked while waiting for a
//! block, between machines, and during backoff.

use crate::config::ExecutorConfig;
use crate::domain::{ExecutorError, MachineKey, PhaseTolerance, TickReport, ToleranceVerdict};
use crate::ports::BlockSource;
use crate::shutdown::ShutdownSignal;
use shared_types::{BlockHash, CycleGenerator, Height, Role};
use std::collections::BTreeSet;
use std::sync::Arc;
use tc_01_cycle_store::CycleStateStore;
use tc_02_payment_machine::{MachineState, Phase, PaymentStateMachine, StepOutcome};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Drives per-cycle state machines in lockstep with the ledger.
pub struct StateMachinesExecutor {
    config: ExecutorConfig,
    roles: Vec<Role>,
    cycles: CycleGenerator,
    machine: PaymentStateMachine,
    store: CycleStateStore,
    blocks: Arc<dyn BlockSource>,
    tolerance: PhaseTolerance,
    last_block: BlockHash,
    last_cycle: Option<Height>,
    open_cycles: BTreeSet<Height>,
    recovered: bool,
}

impl StateMachinesExecutor {
    /// Create an executor running a machine for each of `roles` in every
    /// cycle.
    pub fn new(
        config: ExecutorConfig,
        roles: Vec<Role>,
        machine: PaymentStateMachine,
        store: CycleStateStore,
        blocks: Arc<dyn BlockSource>,
    ) -> Self {
        let cycles = machine.context().cycles.clone();
        let roles: Vec<Role> = roles
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            tolerance: PhaseTolerance::new(config.invalid_phase_threshold),
            config,
            roles,
            cycles,
            machine,
            store,
            blocks,
            last_block: BlockHash::zero(),
            last_cycle: None,
            open_cycles: BTreeSet::new(),
            recovered: false,
        }
    }

    /// Roles run in every cycle.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Phase mismatch counters.
    pub fn tolerance(&self) -> &PhaseTolerance {
        &self.tolerance
    }

    /// Cycles holding at least one non-terminal machine at their last visit.
    pub fn open_cycles(&self) -> &BTreeSet<Height> {
        &self.open_cycles
    }

    /// Hash of the last block processed.
    pub fn last_block(&self) -> BlockHash {
        self.last_block
    }

    /// Spawn the loop on the current runtime.
    pub fn start(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until shutdown is requested.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        info!("[tc-03] State machines started");
        let mut consecutive_failures: u32 = 0;

        loop {
            match self.next_tick(&mut shutdown).await {
                Ok(report) => {
                    consecutive_failures = 0;
                    debug!(
                        height = report.height,
                        updated = report.machines_updated,
                        advanced = report.advanced,
                        "[tc-03] Tick complete"
                    );
                }
                Err(ExecutorError::Cancelled) => break,
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    error!("[tc-03] StateMachineExecutor Error: {}", e);
                    let delay = self.config.backoff.delay(consecutive_failures);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        info!("[tc-03] Mixer stopped");
    }

    /// Wait for a new block and run one tick at the resulting height.
    ///
    /// The block is only marked as processed once its tick succeeds, so a
    /// failed tick is retried against the same block.
    pub async fn next_tick(&mut self, shutdown: &mut ShutdownSignal) -> Result<TickReport, ExecutorError> {
        let block = self
            .blocks
            .wait_for_next_block(self.last_block, shutdown)
            .await?;
        let height = self.blocks.current_height().await?;
        let report = self.tick(height, shutdown).await?;
        self.last_block = block;
        Ok(report)
    }

    /// Run one tick at `height`.
    pub async fn tick(&mut self, height: Height, shutdown: &ShutdownSignal) -> Result<TickReport, ExecutorError> {
        info!("[tc-03] New Block: {}", height);
        let mut report = TickReport {
            height,
            ..TickReport::default()
        };

        if let Some(created) = self.ensure_cycle(height)? {
            report.cycles_created.push(created);
        }
        self.advance_cycles(height, shutdown, &mut report).await?;
        Ok(report)
    }

    /// Create the Start records of the cycle registering at `height`, if
    /// absent. Returns the cycle start if any record was created.
    pub fn ensure_cycle(&mut self, height: Height) -> Result<Option<Height>, ExecutorError> {
        let cycle = match self.cycles.registering_cycle(height) {
            Ok(cycle) => cycle,
            Err(_) => return Ok(None),
        };

        if self.last_cycle != Some(cycle.start) {
            info!("[tc-03] New Cycle: {}", cycle.start);
            self.last_cycle = Some(cycle.start);
        }

        let mut created = false;
        for role in &self.roles {
            let state = self.machine.create(cycle.start, *role);
            if self
                .store
                .create_if_absent(cycle.start, role.record_key(), &state)?
            {
                debug!(cycle = cycle.start, role = %role, "[tc-03] Machine created");
                created = true;
            }
        }
        Ok(created.then_some(cycle.start))
    }

    /// Update and persist every machine of every cycle overlapping `height`,
    /// and of every expired cycle still holding a non-terminal machine.
    async fn advance_cycles(
        &mut self,
        height: Height,
        shutdown: &ShutdownSignal,
        report: &mut TickReport,
    ) -> Result<(), ExecutorError> {
        if !self.recovered {
            self.open_cycles.extend(self.store.cycle_starts()?);
            self.recovered = true;
        }

        let mut visit: BTreeSet<Height> = self
            .cycles
            .cycles_overlapping(height)
            .iter()
            .map(|c| c.start)
            .collect();
        visit.extend(self.open_cycles.iter().copied());

        for &cycle in &visit {
            let entries = self.store.list_entries::<MachineState>(cycle)?;
            let mut open = false;
            for (key, entry) in entries {
                if shutdown.is_shutdown() {
                    return Err(ExecutorError::Cancelled);
                }
                let state = match entry {
                    Ok(state) => state,
                    Err(e) => {
                        report.corrupt += 1;
                        error!(cycle, key = %key, "[tc-03] Skipping unreadable machine: {}", e);
                        continue;
                    }
                };
                let outcome = self.machine.update(state, height).await;
                if !self.apply(outcome, report)?.is_terminal() {
                    open = true;
                }
            }
            if open {
                self.open_cycles.insert(cycle);
            } else if self.open_cycles.remove(&cycle) {
                debug!(cycle, "[tc-03] Cycle closed");
            }
        }

        self.tolerance.retain_cycles(|start| visit.contains(&start));
        Ok(())
    }

    /// Persist the step result and apply the tolerance policy. Returns the
    /// persisted phase.
    fn apply(&mut self, outcome: StepOutcome, report: &mut TickReport) -> Result<Phase, ExecutorError> {
        report.machines_updated += 1;
        let key: MachineKey = (outcome.state().cycle_start, outcome.state().role);

        match &outcome {
            StepOutcome::Advanced(state) => {
                report.advanced += 1;
                self.tolerance.record_success(key);
                if state.phase.is_terminal() {
                    info!(cycle = key.0, role = %key.1, "[tc-03] Machine finished: {}", state.phase);
                }
            }
            StepOutcome::NoOp(_) => {
                report.no_op += 1;
                self.tolerance.record_success(key);
            }
            StepOutcome::TransientPhaseMismatch { error, .. } => {
                match self.tolerance.record_transient(key) {
                    ToleranceVerdict::Tolerated { count } => {
                        report.transient += 1;
                        debug!(cycle = key.0, role = %key.1, count, "[tc-03] Phase mismatch tolerated: {}", error);
                    }
                    ToleranceVerdict::Escalated { count } => {
                        report.escalated += 1;
                        error!(cycle = key.0, role = %key.1, count, "[tc-03] Phase mismatch persists: {}", error);
                    }
                }
            }
            StepOutcome::Fatal { error, .. } => {
                report.fatal += 1;
                self.tolerance.record_fatal(key);
                error!(cycle = key.0, role = %key.1, "[tc-03] Machine update failed: {}", error);
            }
        }

        let state = outcome.into_state();
        let phase = state.phase;
        self.store
            .save(state.cycle_start, state.record_key(), state)?;
        Ok(phase)
    }
}
