//! Parameter download, caching and verification at bootstrap.

mod common;

use async_trait::async_trait;
use client_runtime::{
    AcceptAllInteraction, ClientInteraction, ClientRuntime, RuntimeError, StoreBackend,
    PARAMETER_DOWNLOAD_ATTEMPTS,
};
use common::{config, mocks, parameters, server_url};
use shared_types::TumblerParameters;
use std::sync::Arc;
use tc_01_cycle_store::{InMemoryKvStore, Repository, CONFIGURATION_PARTITION};
use tc_02_payment_machine::MachineError;
use tc_03_cycle_executor::shutdown_channel;

struct RefuseAll;

#[async_trait]
impl ClientInteraction for RefuseAll {
    async fn confirm_parameters(&self, _parameters: &TumblerParameters) -> Result<(), RuntimeError> {
        Err(RuntimeError::ParametersRefused)
    }
}

fn repository() -> Arc<Repository> {
    Arc::new(Repository::new(Arc::new(InMemoryKvStore::new())))
}

#[tokio::test]
async fn test_parameters_are_downloaded_and_cached() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let repository = repository();

    let runtime = ClientRuntime::bootstrap(
        config(&params),
        m.services.clone(),
        repository.clone(),
        &AcceptAllInteraction,
    )
    .await
    .unwrap();

    assert_eq!(runtime.parameters(), Some(&params));
    let cached: Option<TumblerParameters> = repository
        .get(CONFIGURATION_PARTITION, &server_url(&params))
        .unwrap();
    assert_eq!(cached, Some(params.clone()));
    assert_eq!(m.transport.calls(), vec!["get_parameters"]);

    // A second bootstrap over the same repository reuses the cached copy.
    let again = ClientRuntime::bootstrap(config(&params), m.services, repository, &AcceptAllInteraction)
        .await
        .unwrap();
    assert_eq!(again.parameters(), Some(&params));
    assert_eq!(m.transport.calls().len(), 1);
}

#[tokio::test]
async fn test_download_uses_random_identity_outside_any_cycle() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);

    ClientRuntime::bootstrap(config(&params), m.services, repository(), &AcceptAllInteraction)
        .await
        .unwrap();

    let requested = m.factory.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].0, 0);
    assert!(requested[0].1.is_some());
}

#[tokio::test]
async fn test_stale_cache_is_replaced() {
    let params = parameters();
    let mut stale = params.clone();
    stale.fee += 1;

    let m = mocks(Some(params.clone()), 100);
    let repository = repository();
    repository
        .update_or_insert(CONFIGURATION_PARTITION, &server_url(&params), stale, |_, n| n)
        .unwrap();

    let runtime = ClientRuntime::bootstrap(
        config(&params),
        m.services,
        repository.clone(),
        &AcceptAllInteraction,
    )
    .await
    .unwrap();

    assert_eq!(runtime.parameters(), Some(&params));
    assert_eq!(m.transport.calls(), vec!["get_parameters"]);
    let cached: Option<TumblerParameters> = repository
        .get(CONFIGURATION_PARTITION, &server_url(&params))
        .unwrap();
    assert_eq!(cached, Some(params));
}

#[tokio::test]
async fn test_parameters_not_matching_url_are_rejected() {
    let pinned = parameters();
    let mut served = pinned.clone();
    served.denomination *= 2;
    let m = mocks(Some(served.clone()), 100);

    let result =
        ClientRuntime::bootstrap(config(&pinned), m.services, repository(), &AcceptAllInteraction)
            .await;

    match result {
        Err(RuntimeError::ParameterHashMismatch { expected, actual }) => {
            assert_eq!(expected, pinned.hash());
            assert_eq!(actual, served.hash());
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("mismatched parameters accepted"),
    }
}

#[tokio::test]
async fn test_download_retries_then_reports_every_failure() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    for i in 0..PARAMETER_DOWNLOAD_ATTEMPTS {
        m.transport
            .fail_next(MachineError::Transport(format!("attempt {}", i)));
    }

    let result =
        ClientRuntime::bootstrap(config(&params), m.services, repository(), &AcceptAllInteraction)
            .await;

    match result {
        Err(RuntimeError::ParameterDownload { errors }) => {
            assert_eq!(errors.len(), PARAMETER_DOWNLOAD_ATTEMPTS);
            assert_eq!(errors[2], MachineError::Transport("attempt 2".to_string()));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("bootstrap succeeded without parameters"),
    }
}

#[tokio::test]
async fn test_download_succeeds_on_last_attempt() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    m.transport.fail_next(MachineError::Transport("timeout".into()));
    m.transport.fail_next(MachineError::Transport("timeout".into()));

    let runtime =
        ClientRuntime::bootstrap(config(&params), m.services, repository(), &AcceptAllInteraction)
            .await
            .unwrap();

    assert_eq!(runtime.parameters(), Some(&params));
    assert_eq!(m.transport.calls().len(), 3);
}

#[tokio::test]
async fn test_refused_parameters_abort_bootstrap() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let repository = repository();

    let result =
        ClientRuntime::bootstrap(config(&params), m.services, repository.clone(), &RefuseAll).await;

    assert!(matches!(result, Err(RuntimeError::ParametersRefused)));
    let cached: Option<TumblerParameters> = repository
        .get(CONFIGURATION_PARTITION, &server_url(&params))
        .unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_monitor_only_skips_download_and_executor() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let mut config = config(&params);
    config.only_monitor = true;

    let runtime = ClientRuntime::bootstrap(config, m.services, repository(), &AcceptAllInteraction)
        .await
        .unwrap();

    assert!(runtime.parameters().is_none());
    assert!(m.transport.calls().is_empty());
    assert!(matches!(
        runtime.machine_context(),
        Err(RuntimeError::MissingParameters)
    ));

    let (_handle, signal) = shutdown_channel();
    assert!(runtime.start(signal).unwrap().is_none());
}

#[tokio::test]
async fn test_missing_roles_rejected() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let mut config = config(&params);
    config.roles.clear();

    let result = ClientRuntime::bootstrap(config, m.services, repository(), &AcceptAllInteraction).await;
    assert!(matches!(result, Err(RuntimeError::Config(_))));
}

#[tokio::test]
async fn test_from_config_with_memory_store() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);

    let runtime = ClientRuntime::from_config(config(&params), m.services, &AcceptAllInteraction)
        .await
        .unwrap();

    assert_eq!(runtime.config().store_backend, StoreBackend::Memory);
    assert!(runtime.machine_context().is_ok());
}

#[cfg(not(feature = "rocksdb"))]
#[tokio::test]
async fn test_rocksdb_backend_requires_feature() {
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let mut config = config(&params);
    config.store_backend = StoreBackend::RocksDb;

    let result = ClientRuntime::from_config(config, m.services, &AcceptAllInteraction).await;
    assert!(matches!(result, Err(RuntimeError::Config(_))));
}

#[cfg(feature = "rocksdb")]
#[tokio::test]
async fn test_rocksdb_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let params = parameters();
    let m = mocks(Some(params.clone()), 100);
    let mut config = config(&params);
    config.store_backend = StoreBackend::RocksDb;
    config.data_dir = dir.path().to_path_buf();

    let first = ClientRuntime::from_config(config.clone(), m.services.clone(), &AcceptAllInteraction)
        .await
        .unwrap();
    drop(first);

    let second = ClientRuntime::from_config(config, m.services, &AcceptAllInteraction)
        .await
        .unwrap();
    assert_eq!(second.parameters(), Some(&params));
    assert_eq!(m.transport.calls().len(), 1);
}
