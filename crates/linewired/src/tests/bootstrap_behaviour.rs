//! Behavioural tests for the server bootstrap sequence.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::bootstrap::{BootstrapError, ConfigLoader, Server, bootstrap_with};

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader,
};

struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Server, BootstrapError>>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    fn server(&self) -> &Server {
        match self.outcome.as_ref() {
            Some(Ok(server)) => server,
            other => panic!("expected a bootstrapped server, got {other:?}"),
        }
    }

    fn error(&self) -> &BootstrapError {
        match self.outcome.as_ref() {
            Some(Err(error)) => error,
            other => panic!("expected a bootstrap error, got {other:?}"),
        }
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(TestConfigLoader);
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(FailingConfigLoader);
}

#[when("the server bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    let outcome = bootstrap_with(&*world.loader, world.reporter.clone());
    world.outcome = Some(outcome);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let _ = world.server();
    assert!(
        world
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded)
    );
}

#[then("the server is bound but not serving")]
fn then_bound_not_serving(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let server = world.server();
    assert!(server.local_addr().is_some());
    assert!(!server.engine().is_running());
}

#[then("bootstrap fails with a configuration error")]
fn then_configuration_error(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.error(), BootstrapError::Configuration { .. }),
        "unexpected error: {}",
        world.error()
    );
}

#[then("a bootstrap failure was reported")]
fn then_failure_reported(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_))),
        "events: {events:?}"
    );
}

#[scenario(path = "tests/features/server_bootstrap.feature")]
fn server_bootstrap(#[from(world)] world: RefCell<BootstrapWorld>) {
    drop(world);
}
