//! Shared fixtures for the runtime integration tests.

#![allow(dead_code)]

use client_runtime::{ClientConfig, ExternalServices};
use shared_types::{CycleGenerator, CycleParameters, TumblerParameters};
use std::sync::Arc;
use tc_02_payment_machine::{
    MockConfirmationSource, MockPuzzleSolver, MockTransport, MockTransportFactory, MockWallet,
};
use tc_03_cycle_executor::MockBlockSource;

/// Cycle 100: registration [100,120), client channel [120,160),
/// tumbler channel [160,180), payment [180,190), tumbler cash-out [190,200),
/// client cash-out [200,220). A new cycle starts every 19 blocks.
pub fn parameters() -> TumblerParameters {
    TumblerParameters {
        network: "regtest".to_string(),
        denomination: 100_000_000,
        fee: 1_000_000,
        cycle_generator: CycleGenerator::new(
            CycleParameters {
                start: 100,
                registration_duration: 20,
                client_channel_establishment_duration: 40,
                tumbler_channel_establishment_duration: 20,
                payment_phase_duration: 10,
                tumbler_cashout_duration: 10,
                client_cashout_duration: 20,
            },
            1,
        ),
        real_puzzle_count: 15,
        fake_puzzle_count: 285,
        server_key: "02ab".to_string(),
    }
}

pub fn server_url(parameters: &TumblerParameters) -> String {
    format!("http://tumbler.example:5000/api/v1/tumblers/{}", parameters.hash())
}

pub struct Mocks {
    pub transport: Arc<MockTransport>,
    pub factory: Arc<MockTransportFactory>,
    pub explorer: Arc<MockConfirmationSource>,
    pub blocks: Arc<MockBlockSource>,
    pub services: ExternalServices,
}

pub fn mocks(served: Option<TumblerParameters>, height: u32) -> Mocks {
    let transport = Arc::new(match served {
        Some(parameters) => MockTransport::with_parameters(parameters),
        None => MockTransport::new(),
    });
    let factory = Arc::new(MockTransportFactory::new(transport.clone()));
    let explorer = Arc::new(MockConfirmationSource::new());
    let blocks = Arc::new(MockBlockSource::new(height));
    let services = ExternalServices {
        blocks: blocks.clone(),
        explorer: explorer.clone(),
        transports: factory.clone(),
        solver: Arc::new(MockPuzzleSolver::default()),
        wallet: Arc::new(MockWallet::default()),
    };
    Mocks {
        transport,
        factory,
        explorer,
        blocks,
        services,
    }
}

pub fn config(parameters: &TumblerParameters) -> ClientConfig {
    ClientConfig::for_testing(server_url(parameters))
}
