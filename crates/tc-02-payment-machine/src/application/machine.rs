//! # Payment State Machine
//!
//! One update step of a per-cycle machine. The machine is stateless; the
//! state value is passed in and a [`StepOutcome`] carrying the state to
//! persist is returned.
//!
//! ## Step
//!
//! 1. Terminal phase → `NoOp`.
//! 2. Look up the `(role, phase)` row of the transition table.
//! 3. Window not open yet → `NoOp`; window closed → `Advanced` to `Abandoned`.
//! 4. Run the row's action. An unmet on-ledger precondition is a `NoOp`,
//!    never an error.

use crate::application::context::MachineContext;
use crate::domain::{
    transition_for, Action, MachineError, MachineState, OpenedPromise, Phase, StepOutcome,
    Transition, WindowStatus,
};
use crate::ports::{PromiseBundle, TumblerTransport};
use shared_crypto::MaskingKey;
use shared_types::{Height, Role, TxId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives per-cycle payer and payee machines.
#[derive(Clone)]
pub struct PaymentStateMachine {
    context: Arc<MachineContext>,
}

impl PaymentStateMachine {
    /// Create a machine driver over a context.
    pub fn new(context: Arc<MachineContext>) -> Self {
        Self { context }
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<MachineContext> {
        &self.context
    }

    /// Initial state for `role` in the cycle starting at `cycle_start`.
    pub fn create(&self, cycle_start: Height, role: Role) -> MachineState {
        MachineState::new(cycle_start, role)
    }

    /// Advance `state` by at most one phase, given the ledger is at `height`.
    ///
    /// Safe to call repeatedly: with no precondition met the state is
    /// returned unchanged.
    pub async fn update(&self, state: MachineState, height: Height) -> StepOutcome {
        if state.phase.is_terminal() {
            return StepOutcome::NoOp(state);
        }

        let Some(transition) = transition_for(state.role, state.phase) else {
            return StepOutcome::NoOp(state);
        };

        let cycle = match self.context.cycles.cycle_at(state.cycle_start) {
            Ok(cycle) => cycle,
            Err(e) => return StepOutcome::Fatal { state, error: e.into() },
        };

        match transition.window.status(&cycle, height) {
            WindowStatus::NotOpen => StepOutcome::NoOp(state),
            WindowStatus::Closed => {
                warn!(
                    cycle = state.cycle_start,
                    role = %state.role,
                    phase = %state.phase,
                    height,
                    "[tc-02] Window for {:?} closed, abandoning",
                    transition.action
                );
                StepOutcome::Advanced(state.with_phase(Phase::Abandoned))
            }
            WindowStatus::Open => match self.perform(transition, state.clone()).await {
                Ok(Some(next)) => {
                    info!(
                        cycle = next.cycle_start,
                        role = %next.role,
                        height,
                        "[tc-02] {} -> {}",
                        state.phase,
                        next.phase
                    );
                    StepOutcome::Advanced(next)
                }
                Ok(None) => StepOutcome::NoOp(state),
                Err(error) => StepOutcome::failed(state, error),
            },
        }
    }

    /// Run the action of `transition`. `Ok(None)` means the precondition does
    /// not hold yet.
    async fn perform(
        &self,
        transition: &Transition,
        mut state: MachineState,
    ) -> Result<Option<MachineState>, MachineError> {
        let cycle_start = state.cycle_start;
        match transition.action {
            Action::Register => {
                let voucher = self.transport(&state).register(cycle_start).await?;
                state.artifacts.voucher = Some(voucher);
            }
            Action::OpenChannel => {
                let voucher = require(&state.artifacts.voucher, "voucher")?;
                let escrow = self
                    .transport(&state)
                    .open_channel(cycle_start, voucher)
                    .await?;
                state.artifacts.escrow = Some(escrow);
            }
            Action::ExchangePromise => {
                let (promise, key) = self.exchange_promise(&state).await?;
                state.artifacts.masking_key = Some(key);
                state.artifacts.promise = Some(promise);
            }
            Action::AwaitEscrow => {
                let escrow = require(&state.artifacts.escrow, "escrow")?;
                if !self
                    .is_confirmed(escrow, self.context.config.escrow_confirmations)
                    .await?
                {
                    return Ok(None);
                }
            }
            Action::SolvePuzzle => {
                let solution = self.context.solver.solve(&state).await?;
                state.artifacts.puzzle_solution = Some(solution);
            }
            Action::ReleasePayment => {
                let escrow = require(&state.artifacts.escrow, "escrow")?;
                let solution = require(&state.artifacts.puzzle_solution, "puzzle solution")?;
                let payment = self
                    .transport(&state)
                    .release_payment(cycle_start, escrow, solution)
                    .await?;
                state.artifacts.payment = Some(payment);
            }
            Action::CashOut => {
                let promise = require(&state.artifacts.promise, "promise")?;
                let solution = require(&state.artifacts.puzzle_solution, "puzzle solution")?;
                let destination = match &state.artifacts.destination {
                    Some(destination) => destination.clone(),
                    None => self.context.wallet.next_destination(cycle_start).await?,
                };
                let payment = self
                    .transport(&state)
                    .cash_out(
                        cycle_start,
                        promise,
                        solution,
                        &destination,
                        self.context.config.cooperative,
                    )
                    .await?;
                state.artifacts.destination = Some(destination);
                state.artifacts.payment = Some(payment);
            }
            Action::AwaitPayment => {
                let payment = require(&state.artifacts.payment, "payment")?;
                if !self
                    .is_confirmed(payment, self.context.config.payment_confirmations)
                    .await?
                {
                    return Ok(None);
                }
            }
        }
        Ok(Some(state.with_phase(transition.to)))
    }

    /// Receive the masked promises and open the one named as real with the
    /// key obtained from the puzzle sub-protocol.
    async fn exchange_promise(
        &self,
        state: &MachineState,
    ) -> Result<(OpenedPromise, MaskingKey), MachineError> {
        let voucher = require(&state.artifacts.voucher, "voucher")?;

        let bundle = self
            .transport(state)
            .request_promises(state.cycle_start, voucher)
            .await?;
        self.check_bundle(&bundle)?;

        let slot = self
            .context
            .solver
            .real_slot(state.cycle_start, &bundle)
            .await?;
        let candidate = bundle.candidates.get(slot).ok_or_else(|| {
            MachineError::InvalidPromiseBundle(format!(
                "real slot {} out of {} candidates",
                slot,
                bundle.candidates.len()
            ))
        })?;

        let key = self.context.solver.promise_key(state, slot).await?;
        let plaintext = key.mask(candidate);
        if !self
            .context
            .solver
            .verify_promise(state.cycle_start, &plaintext)
            .await
        {
            debug!(cycle = state.cycle_start, slot, "[tc-02] Promise did not open");
            return Err(MachineError::PromiseNotOpenable { slot });
        }

        Ok((
            OpenedPromise {
                slot,
                signature: plaintext,
            },
            key,
        ))
    }

    fn check_bundle(&self, bundle: &PromiseBundle) -> Result<(), MachineError> {
        let count = bundle.candidates.len();
        if count == 0 {
            return Err(MachineError::InvalidPromiseBundle("no candidates".to_string()));
        }
        if count > self.context.config.max_promise_candidates {
            return Err(MachineError::InvalidPromiseBundle(format!(
                "{} candidates exceeds limit {}",
                count, self.context.config.max_promise_candidates
            )));
        }
        let len = bundle.candidates[0].len();
        if bundle.candidates.iter().any(|c| c.len() != len) {
            return Err(MachineError::InvalidPromiseBundle(
                "candidates differ in length".to_string(),
            ));
        }
        Ok(())
    }

    async fn is_confirmed(&self, txid: &TxId, depth: u32) -> Result<bool, MachineError> {
        let confirmations = self.context.explorer.confirmations(txid).await?;
        Ok(confirmations.is_some_and(|c| c >= depth))
    }

    fn transport(&self, state: &MachineState) -> Arc<dyn TumblerTransport> {
        self.context
            .transports
            .create(state.cycle_start, Some(state.role.identity()))
    }
}

fn require<'a, T>(artifact: &'a Option<T>, name: &'static str) -> Result<&'a T, MachineError> {
    artifact.as_ref().ok_or(MachineError::MissingArtifact(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::ports::{
        mock_promise_key, mock_txid, MockConfirmationSource, MockPuzzleSolver, MockTransport, MockTransportFactory,
        MockWallet,
    };
    use shared_types::{CycleGenerator, CycleParameters, Identity};

    // Cycle 100: registration [100,110), client channel [110,115),
    // tumbler channel [115,120), payment [120,125), tumbler cash-out
    // [125,130), client cash-out [130,140).
    fn generator() -> CycleGenerator {
        CycleGenerator::new(
            CycleParameters {
                start: 100,
                registration_duration: 10,
                client_channel_establishment_duration: 5,
                tumbler_channel_establishment_duration: 5,
                payment_phase_duration: 5,
                tumbler_cashout_duration: 5,
                client_cashout_duration: 10,
            },
            1,
        )
    }

    struct Harness {
        machine: PaymentStateMachine,
        transport: Arc<MockTransport>,
        factory: Arc<MockTransportFactory>,
        explorer: Arc<MockConfirmationSource>,
    }

    fn harness_with(transport: MockTransport, solver: MockPuzzleSolver) -> Harness {
        harness_with_config(MachineConfig::for_testing(), transport, solver)
    }

    fn harness_with_config(
        config: MachineConfig,
        transport: MockTransport,
        solver: MockPuzzleSolver,
    ) -> Harness {
        let transport = Arc::new(transport);
        let factory = Arc::new(MockTransportFactory::new(transport.clone()));
        let explorer = Arc::new(MockConfirmationSource::new());
        let context = MachineContext {
            config,
            cycles: generator(),
            explorer: explorer.clone(),
            transports: factory.clone(),
            solver: Arc::new(solver),
            wallet: Arc::new(MockWallet::default()),
        };
        Harness {
            machine: PaymentStateMachine::new(Arc::new(context)),
            transport,
            factory,
            explorer,
        }
    }

    fn harness() -> Harness {
        harness_with(MockTransport::new(), MockPuzzleSolver::default())
    }

    fn advanced(outcome: StepOutcome) -> MachineState {
        match outcome {
            StepOutcome::Advanced(state) => state,
            other => panic!("expected Advanced, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_starts_empty() {
        let h = harness();
        let state = h.machine.create(100, Role::Payer);
        assert_eq!(state, MachineState::new(100, Role::Payer));
    }

    #[tokio::test]
    async fn test_registration_before_window_is_noop() {
        let h = harness();
        let state = h.machine.create(100, Role::Payer);
        let outcome = h.machine.update(state.clone(), 99).await;
        assert_eq!(outcome, StepOutcome::NoOp(state));
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_payee_registers_as_bob() {
        let h = harness();
        let state = advanced(h.machine.update(h.machine.create(100, Role::Payee), 100).await);
        assert_eq!(state.phase, Phase::Registration);
        assert!(state.artifacts.voucher.is_some());
        assert!(state.artifacts.masking_key.is_none());
        assert_eq!(h.factory.requested(), vec![(100, Some(Identity::Bob))]);
    }

    #[tokio::test]
    async fn test_payer_registers_as_alice() {
        let h = harness();
        let state = advanced(h.machine.update(h.machine.create(100, Role::Payer), 105).await);
        assert!(state.artifacts.masking_key.is_none());
        assert_eq!(h.factory.requested(), vec![(100, Some(Identity::Alice))]);
    }

    #[tokio::test]
    async fn test_escrow_waits_for_confirmations() {
        let h = harness();
        let mut state = h.machine.create(100, Role::Payer);
        state = advanced(h.machine.update(state, 100).await);
        state = advanced(h.machine.update(state, 110).await);
        assert_eq!(state.phase, Phase::ChannelOpened);

        let outcome = h.machine.update(state.clone(), 111).await;
        assert_eq!(outcome, StepOutcome::NoOp(state.clone()));

        h.explorer.set_confirmations(mock_txid("escrow", 100), 1);
        let state = advanced(h.machine.update(state, 112).await);
        assert_eq!(state.phase, Phase::EscrowConfirmed);
    }

    #[tokio::test]
    async fn test_closed_window_abandons() {
        let h = harness();
        let state = h.machine.create(100, Role::Payer);
        let state = advanced(h.machine.update(state, 110).await);
        assert_eq!(state.phase, Phase::Abandoned);

        let again = h.machine.update(state.clone(), 111).await;
        assert_eq!(again, StepOutcome::NoOp(state));
    }

    #[tokio::test]
    async fn test_remote_phase_mismatch_is_transient() {
        let h = harness();
        h.transport
            .fail_next(MachineError::tumbler("invalid-phase", "cycle not registering"));
        let state = h.machine.create(100, Role::Payer);
        let outcome = h.machine.update(state.clone(), 100).await;
        assert!(matches!(
            outcome,
            StepOutcome::TransientPhaseMismatch { state: ref s, .. } if *s == state
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let h = harness();
        h.transport
            .fail_next(MachineError::Transport("connection refused".to_string()));
        let outcome = h.machine.update(h.machine.create(100, Role::Payer), 100).await;
        assert!(matches!(outcome, StepOutcome::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_fatal() {
        let h = harness();
        let state = MachineState::new(100, Role::Payer).with_phase(Phase::Registration);
        let outcome = h.machine.update(state, 110).await;
        assert!(matches!(
            outcome,
            StepOutcome::Fatal {
                error: MachineError::MissingArtifact("voucher"),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_cycle_is_fatal() {
        let h = harness();
        let outcome = h.machine.update(MachineState::new(101, Role::Payer), 101).await;
        assert!(matches!(
            outcome,
            StepOutcome::Fatal {
                error: MachineError::Cycle(_),
                ..
            }
        ));
    }

    async fn payee_at_channel_opened(h: &Harness) -> MachineState {
        let mut state = h.machine.create(100, Role::Payee);
        state = advanced(h.machine.update(state, 100).await);
        advanced(h.machine.update(state, 110).await)
    }

    #[tokio::test]
    async fn test_promise_opens_at_real_slot() {
        let h = harness_with(
            MockTransport {
                real_slot: 3,
                ..MockTransport::default()
            },
            MockPuzzleSolver {
                real_slot: 3,
                ..MockPuzzleSolver::default()
            },
        );
        let state = payee_at_channel_opened(&h).await;
        let state = advanced(h.machine.update(state, 115).await);

        assert_eq!(state.phase, Phase::PromiseExchanged);
        let promise = state.artifacts.promise.unwrap();
        assert_eq!(promise.slot, 3);
        assert_eq!(promise.signature, crate::ports::MOCK_PROMISE_SIGNATURE);
        assert_eq!(state.artifacts.masking_key, Some(mock_promise_key(100)));
    }

    #[tokio::test]
    async fn test_promise_request_carries_only_cycle_and_voucher() {
        let h = harness();
        let state = payee_at_channel_opened(&h).await;
        let voucher = state.artifacts.voucher.clone().unwrap();
        let state = advanced(h.machine.update(state, 115).await);

        assert_eq!(state.phase, Phase::PromiseExchanged);
        assert_eq!(h.transport.promise_requests(), vec![(100, voucher)]);
    }

    #[tokio::test]
    async fn test_key_held_by_client_cannot_shape_the_bundle() {
        // The Tumbler masks under its own key; a key the client made up opens
        // nothing.
        let h = harness_with(
            MockTransport::new(),
            MockPuzzleSolver {
                promise_key: Some(MaskingKey::generate()),
                ..MockPuzzleSolver::default()
            },
        );
        let state = payee_at_channel_opened(&h).await;
        let outcome = h.machine.update(state, 115).await;
        assert!(matches!(
            outcome,
            StepOutcome::TransientPhaseMismatch {
                error: MachineError::PromiseNotOpenable { slot: 0 },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_slot_is_transient() {
        let h = harness_with(
            MockTransport {
                real_slot: 1,
                ..MockTransport::default()
            },
            MockPuzzleSolver::default(),
        );
        let state = payee_at_channel_opened(&h).await;
        let outcome = h.machine.update(state, 116).await;
        assert!(matches!(
            outcome,
            StepOutcome::TransientPhaseMismatch {
                error: MachineError::PromiseNotOpenable { slot: 0 },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_bundle_is_fatal() {
        let h = harness_with(
            MockTransport {
                candidate_count: 17,
                ..MockTransport::default()
            },
            MockPuzzleSolver::default(),
        );
        let state = payee_at_channel_opened(&h).await;
        let outcome = h.machine.update(state, 115).await;
        assert!(matches!(
            outcome,
            StepOutcome::Fatal {
                error: MachineError::InvalidPromiseBundle(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_slot_out_of_range_is_fatal() {
        let h = harness_with(
            MockTransport::new(),
            MockPuzzleSolver {
                real_slot: 9,
                ..MockPuzzleSolver::default()
            },
        );
        let state = payee_at_channel_opened(&h).await;
        let outcome = h.machine.update(state, 115).await;
        assert!(matches!(
            outcome,
            StepOutcome::Fatal {
                error: MachineError::InvalidPromiseBundle(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_payer_runs_to_success() {
        let h = harness();
        h.explorer.set_confirmations(mock_txid("escrow", 100), 1);

        let mut state = h.machine.create(100, Role::Payer);
        for height in [100, 110, 111, 120, 121] {
            state = advanced(h.machine.update(state, height).await);
        }
        assert_eq!(state.phase, Phase::PaymentBroadcast);
        assert_eq!(state.artifacts.payment, Some(mock_txid("payment", 100)));

        let outcome = h.machine.update(state.clone(), 122).await;
        assert_eq!(outcome, StepOutcome::NoOp(state.clone()));

        h.explorer.set_confirmations(mock_txid("payment", 100), 1);
        let state = advanced(h.machine.update(state, 123).await);
        assert_eq!(state.phase, Phase::Success);
        assert_eq!(
            h.machine.update(state.clone(), 124).await,
            StepOutcome::NoOp(state)
        );
    }

    #[tokio::test]
    async fn test_payee_runs_to_success() {
        let h = harness();
        h.explorer.set_confirmations(mock_txid("escrow", 100), 1);
        h.explorer.set_confirmations(mock_txid("cashout", 100), 2);

        let mut state = h.machine.create(100, Role::Payee);
        let expected = [
            (100, Phase::Registration),
            (110, Phase::ChannelOpened),
            (115, Phase::PromiseExchanged),
            (116, Phase::EscrowConfirmed),
            (120, Phase::PuzzleSolved),
            (130, Phase::PaymentBroadcast),
            (131, Phase::Success),
        ];
        for (height, phase) in expected {
            state = advanced(h.machine.update(state, height).await);
            assert_eq!(state.phase, phase, "at height {}", height);
        }
        assert_eq!(state.artifacts.destination.as_deref(), Some("dest-100-1"));
    }

    #[tokio::test]
    async fn test_non_cooperative_cash_out() {
        let h = harness_with_config(
            MachineConfig {
                cooperative: false,
                ..MachineConfig::for_testing()
            },
            MockTransport::new(),
            MockPuzzleSolver::default(),
        );
        h.explorer.set_confirmations(mock_txid("escrow", 100), 1);

        let mut state = h.machine.create(100, Role::Payee);
        for height in [100, 110, 115, 116, 120, 130] {
            state = advanced(h.machine.update(state, height).await);
        }
        assert_eq!(state.phase, Phase::PaymentBroadcast);
        assert_eq!(state.artifacts.payment, Some(mock_txid("fulfill", 100)));
    }
}
