//! # Outbound Ports
//!
//! Traits for external dependencies: block explorer, Tumbler transport,
//! puzzle sub-protocol and destination wallet. Every call may block on the
//! network; none is cancellable mid-call.

use crate::domain::{MachineError, MachineState, OpenedPromise};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::{decoy, sha256, MaskingKey, KEY_SIZE};
use shared_types::{Height, Identity, TumblerParameters, TxId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Candidate masked promises returned by the Tumbler.
///
/// Exactly one candidate opens under the Tumbler's promise key, which the
/// payee only learns through the puzzle sub-protocol. The others are decoys of
/// the same length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromiseBundle {
    /// Masked candidates.
    pub candidates: Vec<Vec<u8>>,
}

/// Block explorer - outbound port.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    /// Confirmation depth of a transaction; `None` if unknown to the explorer.
    async fn confirmations(&self, txid: &TxId) -> Result<Option<u32>, MachineError>;
}

/// Request/response transport to the Tumbler - outbound port.
///
/// A remote phase mismatch must surface as
/// `MachineError::Tumbler { code: InvalidPhase, .. }`; every other failure is
/// reported as a generic error.
#[async_trait]
pub trait TumblerTransport: Send + Sync {
    /// Download the Tumbler's published parameters.
    async fn get_parameters(&self) -> Result<TumblerParameters, MachineError>;

    /// Register for a cycle; returns a voucher.
    async fn register(&self, cycle_start: Height) -> Result<Vec<u8>, MachineError>;

    /// Open the escrow channel for a cycle; returns the escrow transaction.
    async fn open_channel(&self, cycle_start: Height, voucher: &[u8]) -> Result<TxId, MachineError>;

    /// Request the masked promises for a cycle.
    async fn request_promises(
        &self,
        cycle_start: Height,
        voucher: &[u8],
    ) -> Result<PromiseBundle, MachineError>;

    /// Release the payment against the escrow; returns the payment transaction.
    async fn release_payment(
        &self,
        cycle_start: Height,
        escrow: &TxId,
        solution: &[u8],
    ) -> Result<TxId, MachineError>;

    /// Cash out the Tumbler's escrow to `destination`; returns the cash-out
    /// transaction. Non-cooperative cash-out claims the escrow without the
    /// Tumbler's signature.
    async fn cash_out(
        &self,
        cycle_start: Height,
        promise: &OpenedPromise,
        solution: &[u8],
        destination: &str,
        cooperative: bool,
    ) -> Result<TxId, MachineError>;
}

/// Creates transports scoped to a cycle and identity.
pub trait TransportFactory: Send + Sync {
    /// Transport for `cycle_start`. `None` picks a random identity.
    fn create(&self, cycle_start: Height, identity: Option<Identity>) -> Arc<dyn TumblerTransport>;
}

/// Complementary puzzle sub-protocol - outbound port.
#[async_trait]
pub trait PuzzleSolver: Send + Sync {
    /// Index of the real candidate, from the cut-and-choose step.
    async fn real_slot(&self, cycle_start: Height, bundle: &PromiseBundle) -> Result<usize, MachineError>;

    /// Key opening the real candidate of `state`'s bundle.
    ///
    /// Scoped to one machine; the key never leaves the client.
    async fn promise_key(&self, state: &MachineState, slot: usize) -> Result<MaskingKey, MachineError>;

    /// True if `plaintext` is a valid Tumbler signature for this cycle.
    async fn verify_promise(&self, cycle_start: Height, plaintext: &[u8]) -> bool;

    /// Solve the puzzle for `state`.
    async fn solve(&self, state: &MachineState) -> Result<Vec<u8>, MachineError>;
}

/// Destination wallet - outbound port.
#[async_trait]
pub trait DestinationWallet: Send + Sync {
    /// Fresh destination address for a cash-out.
    async fn next_destination(&self, cycle_start: Height) -> Result<String, MachineError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Signature the mock Tumbler promises.
pub const MOCK_PROMISE_SIGNATURE: &[u8] = b"mock tumbler promise signature";

/// Mock block explorer with settable confirmation depths.
#[derive(Default)]
pub struct MockConfirmationSource {
    confirmations: RwLock<HashMap<TxId, u32>>,
    failure: RwLock<Option<MachineError>>,
}

impl MockConfirmationSource {
    /// Create an explorer that knows no transactions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the depth reported for `txid`.
    pub fn set_confirmations(&self, txid: TxId, depth: u32) {
        self.confirmations.write().insert(txid, depth);
    }

    /// Make every query fail with `error`, or clear the failure.
    pub fn set_failure(&self, error: Option<MachineError>) {
        *self.failure.write() = error;
    }
}

#[async_trait]
impl ConfirmationSource for MockConfirmationSource {
    async fn confirmations(&self, txid: &TxId) -> Result<Option<u32>, MachineError> {
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }
        Ok(self.confirmations.read().get(txid).copied())
    }
}

/// Deterministic transaction id for mock transports.
pub fn mock_txid(kind: &str, cycle_start: Height) -> TxId {
    TxId(sha256(format!("{}:{}", kind, cycle_start).as_bytes()))
}

/// Promise key the mock Tumbler masks the real candidate of `cycle_start`
/// under.
pub fn mock_promise_key(cycle_start: Height) -> MaskingKey {
    let seed = sha256(format!("promise-key:{}", cycle_start).as_bytes());
    let mut bytes = [0u8; KEY_SIZE];
    for chunk in bytes.chunks_mut(seed.len()) {
        chunk.copy_from_slice(&seed[..chunk.len()]);
    }
    MaskingKey::from_array(bytes)
}

/// Scripted Tumbler transport.
///
/// Transactions are derived with [`mock_txid`]: `"escrow"`, `"payment"`,
/// `"cashout"` (cooperative) and `"fulfill"` (unilateral). Queued failures
/// are returned by the next calls, in order.
pub struct MockTransport {
    /// Published parameters.
    pub parameters: RwLock<Option<TumblerParameters>>,
    /// Slot of the real promise in bundles.
    pub real_slot: usize,
    /// Number of candidates per bundle.
    pub candidate_count: usize,
    pub(crate) failures: RwLock<VecDeque<MachineError>>,
    pub(crate) calls: RwLock<Vec<String>>,
    pub(crate) promise_requests: RwLock<Vec<(Height, Vec<u8>)>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            parameters: RwLock::new(None),
            real_slot: 0,
            candidate_count: 4,
            failures: RwLock::new(VecDeque::new()),
            calls: RwLock::new(Vec::new()),
            promise_requests: RwLock::new(Vec::new()),
        }
    }
}

impl MockTransport {
    /// Create a transport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `parameters` from `get_parameters`.
    pub fn with_parameters(parameters: TumblerParameters) -> Self {
        Self {
            parameters: RwLock::new(Some(parameters)),
            ..Self::default()
        }
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: MachineError) {
        self.failures.write().push_back(error);
    }

    /// Names of the calls received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }

    /// Arguments of every `request_promises` call: `(cycle, voucher)`.
    pub fn promise_requests(&self) -> Vec<(Height, Vec<u8>)> {
        self.promise_requests.read().clone()
    }

    fn enter(&self, call: &str) -> Result<(), MachineError> {
        self.calls.write().push(call.to_string());
        match self.failures.write().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TumblerTransport for MockTransport {
    async fn get_parameters(&self) -> Result<TumblerParameters, MachineError> {
        self.enter("get_parameters")?;
        self.parameters
            .read()
            .clone()
            .ok_or_else(|| MachineError::Transport("no parameters published".to_string()))
    }

    async fn register(&self, cycle_start: Height) -> Result<Vec<u8>, MachineError> {
        self.enter("register")?;
        Ok(format!("voucher:{}", cycle_start).into_bytes())
    }

    async fn open_channel(&self, cycle_start: Height, _voucher: &[u8]) -> Result<TxId, MachineError> {
        self.enter("open_channel")?;
        Ok(mock_txid("escrow", cycle_start))
    }

    async fn request_promises(
        &self,
        cycle_start: Height,
        voucher: &[u8],
    ) -> Result<PromiseBundle, MachineError> {
        self.enter("request_promises")?;
        self.promise_requests
            .write()
            .push((cycle_start, voucher.to_vec()));
        let key = mock_promise_key(cycle_start);
        let candidates = (0..self.candidate_count)
            .map(|slot| {
                if slot == self.real_slot {
                    key.mask(MOCK_PROMISE_SIGNATURE)
                } else {
                    decoy(MOCK_PROMISE_SIGNATURE.len())
                }
            })
            .collect();
        Ok(PromiseBundle { candidates })
    }

    async fn release_payment(
        &self,
        cycle_start: Height,
        _escrow: &TxId,
        _solution: &[u8],
    ) -> Result<TxId, MachineError> {
        self.enter("release_payment")?;
        Ok(mock_txid("payment", cycle_start))
    }

    async fn cash_out(
        &self,
        cycle_start: Height,
        _promise: &OpenedPromise,
        _solution: &[u8],
        _destination: &str,
        cooperative: bool,
    ) -> Result<TxId, MachineError> {
        self.enter("cash_out")?;
        let kind = if cooperative { "cashout" } else { "fulfill" };
        Ok(mock_txid(kind, cycle_start))
    }
}

/// Factory handing out one shared [`MockTransport`].
pub struct MockTransportFactory {
    /// Transport returned for every request.
    pub transport: Arc<MockTransport>,
    requested: RwLock<Vec<(Height, Option<Identity>)>>,
}

impl MockTransportFactory {
    /// Wrap a transport.
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            requested: RwLock::new(Vec::new()),
        }
    }

    /// `(cycle, identity)` pairs requested so far.
    pub fn requested(&self) -> Vec<(Height, Option<Identity>)> {
        self.requested.read().clone()
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(&self, cycle_start: Height, identity: Option<Identity>) -> Arc<dyn TumblerTransport> {
        self.requested.write().push((cycle_start, identity));
        self.transport.clone()
    }
}

/// Puzzle solver that names a fixed slot, hands out [`mock_promise_key`]
/// and accepts [`MOCK_PROMISE_SIGNATURE`].
#[derive(Default)]
pub struct MockPuzzleSolver {
    /// Slot named as real.
    pub real_slot: usize,
    /// Key handed out instead of [`mock_promise_key`], if set.
    pub promise_key: Option<MaskingKey>,
    /// Error returned by `solve`, if set.
    pub solve_failure: Option<MachineError>,
}

#[async_trait]
impl PuzzleSolver for MockPuzzleSolver {
    async fn real_slot(&self, _cycle_start: Height, _bundle: &PromiseBundle) -> Result<usize, MachineError> {
        Ok(self.real_slot)
    }

    async fn promise_key(&self, state: &MachineState, _slot: usize) -> Result<MaskingKey, MachineError> {
        Ok(self
            .promise_key
            .clone()
            .unwrap_or_else(|| mock_promise_key(state.cycle_start)))
    }

    async fn verify_promise(&self, _cycle_start: Height, plaintext: &[u8]) -> bool {
        plaintext == MOCK_PROMISE_SIGNATURE
    }

    async fn solve(&self, state: &MachineState) -> Result<Vec<u8>, MachineError> {
        if let Some(error) = &self.solve_failure {
            return Err(error.clone());
        }
        Ok(format!("solution:{}", state.cycle_start).into_bytes())
    }
}

/// Wallet producing numbered addresses.
#[derive(Default)]
pub struct MockWallet {
    issued: RwLock<u32>,
}

#[async_trait]
impl DestinationWallet for MockWallet {
    async fn next_destination(&self, cycle_start: Height) -> Result<String, MachineError> {
        let mut issued = self.issued.write();
        *issued += 1;
        Ok(format!("dest-{}-{}", cycle_start, *issued))
    }
}
