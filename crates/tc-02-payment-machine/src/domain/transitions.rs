//! # Transition Table
//!
//! Phase-specific behavior is selected from a table keyed on `(role, phase)`.
//! Each row names the next phase, the cycle periods during which the step may
//! run, and the action that establishes its precondition.
//!
//! ```text
//! both  Start            → Registration      [registration]
//! both  Registration     → ChannelOpened     [client channel]
//! payee ChannelOpened    → PromiseExchanged  [tumbler channel]
//! payer ChannelOpened    → EscrowConfirmed   [client channel .. tumbler channel]
//! payee PromiseExchanged → EscrowConfirmed   [tumbler channel .. payment]
//! both  EscrowConfirmed  → PuzzleSolved      [payment]
//! payer PuzzleSolved     → PaymentBroadcast  [payment .. tumbler cash-out]
//! payee PuzzleSolved     → PaymentBroadcast  [client cash-out]
//! both  PaymentBroadcast → Success           [never closes]
//! ```

use crate::domain::phase::Phase;
use shared_types::{CycleParameters, CyclePhase, Height, Role};

/// Work performed by a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Register with the Tumbler and obtain a voucher.
    Register,
    /// Open the escrow channel.
    OpenChannel,
    /// Receive masked promises and open the real one.
    ExchangePromise,
    /// Wait for escrow confirmations.
    AwaitEscrow,
    /// Obtain the puzzle solution.
    SolvePuzzle,
    /// Release the payment to the Tumbler (payer).
    ReleasePayment,
    /// Cash out the Tumbler's escrow (payee).
    CashOut,
    /// Wait for payment confirmations.
    AwaitPayment,
}

/// Where `height` lies relative to a step window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowStatus {
    /// The window has not opened yet.
    NotOpen,
    /// The step may run.
    Open,
    /// The window has closed.
    Closed,
}

/// Range of cycle periods during which a step may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Period in which the window opens.
    pub opens: CyclePhase,
    /// Last period of the window; `None` never closes.
    pub closes: Option<CyclePhase>,
}

impl Window {
    const fn during(phase: CyclePhase) -> Self {
        Self {
            opens: phase,
            closes: Some(phase),
        }
    }

    const fn spanning(opens: CyclePhase, closes: CyclePhase) -> Self {
        Self {
            opens,
            closes: Some(closes),
        }
    }

    const fn open_ended(opens: CyclePhase) -> Self {
        Self {
            opens,
            closes: None,
        }
    }

    /// Position of `height` relative to this window in `cycle`.
    pub fn status(&self, cycle: &CycleParameters, height: Height) -> WindowStatus {
        let periods = cycle.periods();
        if periods.get(self.opens).is_before(height) {
            return WindowStatus::NotOpen;
        }
        match self.closes {
            Some(closes) if periods.get(closes).is_after(height) => WindowStatus::Closed,
            _ => WindowStatus::Open,
        }
    }
}

/// One row of the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Role the row applies to; `None` for both.
    pub role: Option<Role>,
    /// Phase the machine must be in.
    pub from: Phase,
    /// Phase reached when the action succeeds.
    pub to: Phase,
    /// When the step may run.
    pub window: Window,
    /// What the step does.
    pub action: Action,
}

const fn row(role: Option<Role>, from: Phase, to: Phase, window: Window, action: Action) -> Transition {
    Transition {
        role,
        from,
        to,
        window,
        action,
    }
}

/// The transition table.
pub const TRANSITIONS: &[Transition] = &[
    row(
        None,
        Phase::Start,
        Phase::Registration,
        Window::during(CyclePhase::Registration),
        Action::Register,
    ),
    row(
        None,
        Phase::Registration,
        Phase::ChannelOpened,
        Window::during(CyclePhase::ClientChannelEstablishment),
        Action::OpenChannel,
    ),
    row(
        Some(Role::Payee),
        Phase::ChannelOpened,
        Phase::PromiseExchanged,
        Window::during(CyclePhase::TumblerChannelEstablishment),
        Action::ExchangePromise,
    ),
    row(
        Some(Role::Payer),
        Phase::ChannelOpened,
        Phase::EscrowConfirmed,
        Window::spanning(
            CyclePhase::ClientChannelEstablishment,
            CyclePhase::TumblerChannelEstablishment,
        ),
        Action::AwaitEscrow,
    ),
    row(
        Some(Role::Payee),
        Phase::PromiseExchanged,
        Phase::EscrowConfirmed,
        Window::spanning(CyclePhase::TumblerChannelEstablishment, CyclePhase::PaymentPhase),
        Action::AwaitEscrow,
    ),
    row(
        None,
        Phase::EscrowConfirmed,
        Phase::PuzzleSolved,
        Window::during(CyclePhase::PaymentPhase),
        Action::SolvePuzzle,
    ),
    row(
        Some(Role::Payer),
        Phase::PuzzleSolved,
        Phase::PaymentBroadcast,
        Window::spanning(CyclePhase::PaymentPhase, CyclePhase::TumblerCashout),
        Action::ReleasePayment,
    ),
    row(
        Some(Role::Payee),
        Phase::PuzzleSolved,
        Phase::PaymentBroadcast,
        Window::during(CyclePhase::ClientCashout),
        Action::CashOut,
    ),
    row(
        None,
        Phase::PaymentBroadcast,
        Phase::Success,
        Window::open_ended(CyclePhase::PaymentPhase),
        Action::AwaitPayment,
    ),
];

/// Row for a machine of `role` currently in `phase`.
///
/// Terminal phases have no row.
pub fn transition_for(role: Role, phase: Phase) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == phase && t.role.map_or(true, |r| r == role))
}
