//! # Cycles
//!
//! A cycle is a fixed ledger-height window in which one round of the tumbling
//! protocol runs to completion. It is identified by its start height and split
//! into consecutive periods:
//!
//! ```text
//! start
//!   │ registration │ client channel │ tumbler channel │ payment │ tumbler cash-out │ client cash-out │
//!                     ("opening")      ("escrow")                                                  end
//! ```
//!
//! Cycles overlap: a new cycle opens its registration period every
//! `registration_duration - registration_overlap` blocks, so several cycles
//! are active at any height.

use crate::entities::Height;
use crate::errors::CycleError;
use serde::{Deserialize, Serialize};

/// Half-open ledger-height interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// First height inside the period.
    pub start: Height,
    /// First height after the period.
    pub end: Height,
}

impl Period {
    /// Create a period from its bounds.
    pub fn new(start: Height, end: Height) -> Self {
        Self { start, end }
    }

    /// True if `height` lies inside the period.
    pub fn contains(&self, height: Height) -> bool {
        self.start <= height && height < self.end
    }

    /// True if the period has not opened yet at `height`.
    pub fn is_before(&self, height: Height) -> bool {
        height < self.start
    }

    /// True if the period has closed at `height`.
    pub fn is_after(&self, height: Height) -> bool {
        height >= self.end
    }

    /// Number of blocks in the period.
    pub fn len(&self) -> Height {
        self.end.saturating_sub(self.start)
    }

    /// True for a zero-length period.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named sub-window of a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CyclePhase {
    /// Clients register with the Tumbler.
    Registration,
    /// Payers open their escrow channel to the Tumbler.
    ClientChannelEstablishment,
    /// The Tumbler opens its escrow channel to payees.
    TumblerChannelEstablishment,
    /// Puzzles are solved and promises released.
    PaymentPhase,
    /// The Tumbler claims the payers' escrows.
    TumblerCashout,
    /// Payees claim the Tumbler's escrows.
    ClientCashout,
}

/// Absolute periods of one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CyclePeriods {
    /// Registration window.
    pub registration: Period,
    /// Client channel establishment window.
    pub client_channel_establishment: Period,
    /// Tumbler channel establishment window.
    pub tumbler_channel_establishment: Period,
    /// Payment window.
    pub payment: Period,
    /// Tumbler cash-out window.
    pub tumbler_cashout: Period,
    /// Client cash-out window.
    pub client_cashout: Period,
    /// Whole cycle.
    pub total: Period,
}

impl CyclePeriods {
    /// Period for a named phase.
    pub fn get(&self, phase: CyclePhase) -> Period {
        match phase {
            CyclePhase::Registration => self.registration,
            CyclePhase::ClientChannelEstablishment => self.client_channel_establishment,
            CyclePhase::TumblerChannelEstablishment => self.tumbler_channel_establishment,
            CyclePhase::PaymentPhase => self.payment,
            CyclePhase::TumblerCashout => self.tumbler_cashout,
            CyclePhase::ClientCashout => self.client_cashout,
        }
    }
}

/// Parameters of a single cycle. Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleParameters {
    /// Start height; also the cycle identifier.
    pub start: Height,
    /// Registration period length.
    pub registration_duration: Height,
    /// Client channel establishment period length.
    pub client_channel_establishment_duration: Height,
    /// Tumbler channel establishment period length.
    pub tumbler_channel_establishment_duration: Height,
    /// Payment period length.
    pub payment_phase_duration: Height,
    /// Tumbler cash-out period length.
    pub tumbler_cashout_duration: Height,
    /// Client cash-out period length.
    pub client_cashout_duration: Height,
}

impl CycleParameters {
    /// Total cycle length in blocks.
    pub fn length(&self) -> Height {
        self.registration_duration
            + self.client_channel_establishment_duration
            + self.tumbler_channel_establishment_duration
            + self.payment_phase_duration
            + self.tumbler_cashout_duration
            + self.client_cashout_duration
    }

    /// Compute the absolute periods of this cycle.
    pub fn periods(&self) -> CyclePeriods {
        let mut cursor = self.start;
        let mut next = |duration: Height| {
            let period = Period::new(cursor, cursor + duration);
            cursor += duration;
            period
        };

        let registration = next(self.registration_duration);
        let client_channel_establishment = next(self.client_channel_establishment_duration);
        let tumbler_channel_establishment = next(self.tumbler_channel_establishment_duration);
        let payment = next(self.payment_phase_duration);
        let tumbler_cashout = next(self.tumbler_cashout_duration);
        let client_cashout = next(self.client_cashout_duration);

        CyclePeriods {
            registration,
            client_channel_establishment,
            tumbler_channel_establishment,
            payment,
            tumbler_cashout,
            client_cashout,
            total: Period::new(self.start, client_cashout.end),
        }
    }

    /// True if `height` falls inside the given phase of this cycle.
    pub fn is_in_phase(&self, phase: CyclePhase, height: Height) -> bool {
        self.periods().get(phase).contains(height)
    }

    /// Same parameters, shifted to another start height.
    fn with_start(&self, start: Height) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }
}

/// Generates overlapping cycles from the first published cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleGenerator {
    /// Template and start of cycle zero.
    pub first_cycle: CycleParameters,
    /// Blocks shared by the registration periods of consecutive cycles.
    pub registration_overlap: Height,
}

impl CycleGenerator {
    /// Create a generator.
    pub fn new(first_cycle: CycleParameters, registration_overlap: Height) -> Self {
        Self {
            first_cycle,
            registration_overlap,
        }
    }

    /// Check the schedule is well formed.
    pub fn validate(&self) -> Result<(), CycleError> {
        if self.first_cycle.registration_duration <= self.registration_overlap {
            return Err(CycleError::InvalidParameters(format!(
                "registration duration {} must exceed overlap {}",
                self.first_cycle.registration_duration, self.registration_overlap
            )));
        }
        let durations = [
            self.first_cycle.client_channel_establishment_duration,
            self.first_cycle.tumbler_channel_establishment_duration,
            self.first_cycle.payment_phase_duration,
            self.first_cycle.tumbler_cashout_duration,
            self.first_cycle.client_cashout_duration,
        ];
        if durations.iter().any(|d| *d == 0) {
            return Err(CycleError::InvalidParameters(
                "every period must last at least one block".to_string(),
            ));
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive cycles.
    pub fn spacing(&self) -> Height {
        self.first_cycle
            .registration_duration
            .saturating_sub(self.registration_overlap)
            .max(1)
    }

    /// The cycle starting exactly at `start`.
    pub fn cycle_at(&self, start: Height) -> Result<CycleParameters, CycleError> {
        let first = self.first_cycle.start;
        if start < first || (start - first) % self.spacing() != 0 {
            return Err(CycleError::NotACycleStart { start });
        }
        Ok(self.first_cycle.with_start(start))
    }

    /// Every cycle whose total interval contains `height`, oldest first.
    pub fn cycles_overlapping(&self, height: Height) -> Vec<CycleParameters> {
        let first = self.first_cycle.start;
        if height < first {
            return Vec::new();
        }

        let spacing = self.spacing();
        let length = self.first_cycle.length();
        let newest = (height - first) / spacing;

        let mut cycles = Vec::new();
        let mut index = newest;
        loop {
            let start = first + index * spacing;
            if start + length <= height {
                break;
            }
            cycles.push(self.first_cycle.with_start(start));
            if index == 0 {
                break;
            }
            index -= 1;
        }
        cycles.reverse();
        cycles
    }

    /// The oldest cycle whose registration period contains `height`.
    pub fn registering_cycle(&self, height: Height) -> Result<CycleParameters, CycleError> {
        self.cycles_overlapping(height)
            .into_iter()
            .find(|c| c.is_in_phase(CyclePhase::Registration, height))
            .ok_or(CycleError::NoRegisteringCycle { height })
    }
}
