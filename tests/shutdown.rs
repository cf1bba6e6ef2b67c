//! End-to-end shutdown sequence tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lifecycle_probe::config::{LifecycleConfig, ShutdownTimeout, SignalName};
use lifecycle_probe::lifecycle::{
    HandlerError, Lifecycle, LifecycleError, TerminationReason, FORCED_EXIT_CODE,
};

mod common;

#[tokio::test]
async fn test_handlers_run_in_order_despite_failures() {
    let (lifecycle, terminator) =
        common::start_lifecycle(Vec::new(), ShutdownTimeout::from_millis(5_000)).await;
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = order.clone();
    lifecycle
        .register_shutdown_handler(move || async move {
            o.lock().unwrap().push("stop accepting work");
            Ok(())
        })
        .unwrap();
    let o = order.clone();
    lifecycle
        .register_shutdown_handler(move || async move {
            o.lock().unwrap().push("flush buffers");
            Err::<(), HandlerError>("broker unreachable".into())
        })
        .unwrap();
    let o = order.clone();
    lifecycle
        .register_shutdown_handler(move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            o.lock().unwrap().push("close database pool");
            Ok(())
        })
        .unwrap();

    lifecycle.shutdown().await;

    assert_eq!(
        *order.lock().unwrap(),
        vec!["stop accepting work", "flush buffers", "close database pool"]
    );
    assert_eq!(terminator.timeouts(), 0);
}

#[tokio::test]
async fn test_shutdown_twice_runs_teardown_once() {
    let (lifecycle, _) = common::start_lifecycle(Vec::new(), ShutdownTimeout::Infinite).await;
    let runs = Arc::new(AtomicUsize::new(0));

    let r = runs.clone();
    lifecycle
        .register_shutdown_handler(move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let a = lifecycle.clone();
    let b = lifecycle.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.shutdown().await }),
        tokio::spawn(async move { b.shutdown().await }),
    );
    first.unwrap();
    second.unwrap();
    lifecycle.wait_for_shutdown().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(lifecycle.is_server_shutting_down());
}

#[tokio::test]
async fn test_hanging_handler_forces_exit() {
    let (lifecycle, terminator) =
        common::start_lifecycle(Vec::new(), ShutdownTimeout::from_millis(50)).await;
    let port = lifecycle.local_addr().port();
    let reached = Arc::new(AtomicUsize::new(0));

    lifecycle
        .register_shutdown_handler(|| std::future::pending())
        .unwrap();
    let r = reached.clone();
    lifecycle
        .register_shutdown_handler(move || async move {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let started = Instant::now();
    lifecycle.shutdown().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(50), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "fired late: {elapsed:?}");
    assert_eq!(
        terminator.calls(),
        vec![(TerminationReason::ShutdownTimeout, FORCED_EXIT_CODE)]
    );
    assert_eq!(reached.load(Ordering::SeqCst), 0);

    // Transport close never ran.
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok());
}

#[tokio::test]
async fn test_infinite_timeout_never_forces_exit() {
    let (lifecycle, terminator) =
        common::start_lifecycle(Vec::new(), ShutdownTimeout::Infinite).await;
    let port = lifecycle.local_addr().port();

    for delay in [150, 100, 50] {
        lifecycle
            .register_shutdown_handler(move || async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(())
            })
            .unwrap();
    }

    lifecycle.shutdown().await;

    assert_eq!(terminator.timeouts(), 0);
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

#[tokio::test]
async fn test_ready_calls_ignored_after_shutdown() {
    let (lifecycle, _) = common::start_lifecycle(Vec::new(), ShutdownTimeout::Infinite).await;

    lifecycle.signal_ready();
    lifecycle.signal_not_ready();
    lifecycle.signal_ready();
    assert!(lifecycle.is_server_ready());

    lifecycle.shutdown().await;

    lifecycle.signal_ready();
    assert!(!lifecycle.is_server_ready());
    assert!(lifecycle.is_server_shutting_down());

    let late = lifecycle.register_shutdown_handler(|| async { Ok(()) });
    assert!(matches!(late, Err(LifecycleError::ShutdownInProgress)));
}

#[tokio::test]
async fn test_wait_for_shutdown_and_first_ready() {
    let (lifecycle, _) = common::start_lifecycle(Vec::new(), ShutdownTimeout::Infinite).await;

    let waiter = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle.when_first_ready().await;
            lifecycle.wait_for_shutdown().await;
        })
    };

    lifecycle.signal_ready();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    lifecycle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should finish after shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = LifecycleConfig {
        port: 0,
        signals: vec![SignalName::Sigterm, SignalName::Sigterm],
        timeout: ShutdownTimeout::from_millis(0),
    };

    match Lifecycle::start(config).await {
        Err(LifecycleError::InvalidConfig(errors)) => assert_eq!(errors.len(), 2),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("invalid configuration was accepted"),
    }
}

#[tokio::test]
async fn test_port_in_use() {
    let (first, _) = common::start_lifecycle(Vec::new(), ShutdownTimeout::Infinite).await;
    let port = first.local_addr().port();

    let config = LifecycleConfig {
        port,
        signals: Vec::new(),
        ..Default::default()
    };

    match Lifecycle::start(config).await {
        Err(LifecycleError::Bind { port: p, .. }) => assert_eq!(p, port),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("second server bound the same port"),
    }
}
