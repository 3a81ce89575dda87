//! Behavioural tests covering the daemon run loop and shutdown.

use std::cell::RefCell;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::bootstrap::ConfigLoader;
use crate::health::HealthReporter;
use crate::process::LaunchError;
use crate::process::launch::{LaunchPlan, run_daemon_with};
use crate::process::shutdown::{ShutdownError, ShutdownSignal};
use crate::tests::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<ProcessTestWorld> {
    RefCell::new(ProcessTestWorld::new())
}

#[given("the registry is invalid")]
fn given_invalid_registry(world: &RefCell<ProcessTestWorld>) {
    world.borrow_mut().invalid_registry = true;
}

#[given("the registry declares a slow command")]
fn given_slow_command(world: &RefCell<ProcessTestWorld>) {
    let mut world = world.borrow_mut();
    let pidfile = world.loader.dir().join("slow.pid");
    let commands = json!({
        "slow": {
            "description": "Runs well past the drain period",
            "executable": [
                "sh",
                "-c",
                format!("echo $$ > {}; exec sleep 30", pidfile.display())
            ],
            "timeout": 60
        }
    });
    world.loader = world.loader.clone().with_commands(&commands.to_string());
    world.pidfile = Some(pidfile);
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow_mut().start_background()?;
    world.borrow().wait_for_ready()
}

#[when("the daemon runs")]
fn when_daemon_runs(world: &RefCell<ProcessTestWorld>) {
    world.borrow_mut().run_foreground();
}

#[when("a client starts the slow command")]
fn when_client_starts_slow_command(world: &RefCell<ProcessTestWorld>) {
    let socket = world.borrow().socket_path();
    world.borrow_mut().client = Some(thread::spawn(move || {
        let mut stream = UnixStream::connect(socket).map_err(|error| error.to_string())?;
        stream
            .set_read_timeout(Some(Duration::from_secs(15)))
            .map_err(|error| error.to_string())?;
        stream
            .write_all(br#"{"command": "slow"}"#)
            .map_err(|error| error.to_string())?;
        let mut reply = String::new();
        stream
            .read_to_string(&mut reply)
            .map_err(|error| error.to_string())?;
        serde_json::from_str(reply.trim_end()).map_err(|error| error.to_string())
    }));
}

#[when("the slow command is running")]
fn when_slow_command_running(world: &RefCell<ProcessTestWorld>) -> StepResult {
    let pid = world.borrow().wait_for_slow_pid()?;
    world.borrow_mut().slow_pid = Some(pid);
    Ok(())
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ProcessTestWorld>) {
    world.borrow().shutdown.trigger();
}

#[when("the daemon run completes")]
fn when_daemon_completes(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow_mut().join_background()
}

#[then("the daemon answers a ping")]
fn then_daemon_answers_ping(world: &RefCell<ProcessTestWorld>) {
    let mut stream =
        UnixStream::connect(world.borrow().socket_path()).expect("connect to daemon socket");
    stream
        .set_read_timeout(Some(WAIT_TIMEOUT))
        .expect("set read timeout");
    stream
        .write_all(b"{\"command\": \"__ping__\"}\n")
        .expect("write ping");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read pong");
    let response: Value = serde_json::from_str(reply.trim_end()).expect("pong should be json");
    assert_eq!(response["message"], Value::from("pong"));
}

#[then("the daemon run succeeds")]
fn then_daemon_succeeds(world: &RefCell<ProcessTestWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("expected a recorded daemon result");
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

#[then("the daemon run fails during bootstrap")]
fn then_daemon_fails(world: &RefCell<ProcessTestWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("expected a recorded daemon result");
    assert!(
        matches!(result, Err(LaunchError::Bootstrap { .. })),
        "expected bootstrap failure, got {result:?}"
    );
    assert!(
        !world
            .reporter
            .events()
            .contains(&HealthEvent::ListenerReady),
        "listener must not start after a failed bootstrap"
    );
}

#[then("the slow command was killed")]
fn then_slow_command_killed(world: &RefCell<ProcessTestWorld>) {
    let pid = Pid::from_raw(world.borrow().slow_pid.expect("slow command pid recorded"));
    let deadline = Instant::now() + Duration::from_secs(2);
    while kill(pid, None) != Err(Errno::ESRCH) && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    assert_eq!(kill(pid, None), Err(Errno::ESRCH), "slow command outlived the daemon");
}

#[then("the client received a failure response")]
fn then_client_received_failure(world: &RefCell<ProcessTestWorld>) {
    let client = world
        .borrow_mut()
        .client
        .take()
        .expect("client thread started");
    let response = client
        .join()
        .expect("client thread panicked")
        .expect("client received a response");
    assert_eq!(response["success"], Value::from(false));
    assert_eq!(response["command"], Value::from("slow"));
}

#[then("the socket file is removed")]
fn then_socket_removed(world: &RefCell<ProcessTestWorld>) {
    let path = world.borrow().socket_path();
    assert!(!path.exists(), "socket {} should be removed", path.display());
}

#[then("the health reporter saw the full lifecycle")]
fn then_full_lifecycle(world: &RefCell<ProcessTestWorld>) {
    assert_eq!(
        world.borrow().reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::BootstrapSucceeded,
            HealthEvent::ListenerReady,
            HealthEvent::ShutdownCompleted,
        ]
    );
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "The daemon serves until shutdown"
)]
fn daemon_serves_until_shutdown(#[from(world)] world: RefCell<ProcessTestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "An invalid registry stops the daemon before it listens"
)]
fn invalid_registry_stops_daemon(#[from(world)] world: RefCell<ProcessTestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "A long-running command is killed at shutdown"
)]
fn long_running_command_killed_at_shutdown(#[from(world)] world: RefCell<ProcessTestWorld>) {
    drop(world);
}

struct ProcessTestWorld {
    loader: TestConfigLoader,
    invalid_registry: bool,
    reporter: Arc<RecordingHealthReporter>,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    pidfile: Option<PathBuf>,
    slow_pid: Option<i32>,
    client: Option<thread::JoinHandle<Result<Value, String>>>,
}

impl ProcessTestWorld {
    fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            invalid_registry: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
            pidfile: None,
            slow_pid: None,
            client: None,
        }
    }

    fn socket_path(&self) -> PathBuf {
        self.loader.socket_path()
    }

    fn plan<L: ConfigLoader>(&self, loader: L) -> LaunchPlan<L, TestShutdownSignal> {
        LaunchPlan {
            loader,
            reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
            shutdown: self.shutdown.clone(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    fn start_background(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err(String::from("daemon already running"));
        }
        let plan = self.plan(self.loader.clone());
        self.handle = Some(thread::spawn(move || run_daemon_with(plan)));
        Ok(())
    }

    fn run_foreground(&mut self) {
        self.shutdown.trigger();
        self.result = Some(if self.invalid_registry {
            run_daemon_with(self.plan(FailingConfigLoader))
        } else {
            run_daemon_with(self.plan(self.loader.clone()))
        });
    }

    fn wait_for_ready(&self) -> StepResult {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if self
                .reporter
                .events()
                .contains(&HealthEvent::ListenerReady)
            {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(String::from("daemon did not report a ready listener"))
    }

    fn wait_for_slow_pid(&self) -> Result<i32, String> {
        let pidfile = self
            .pidfile
            .as_ref()
            .ok_or_else(|| String::from("no slow command declared"))?;
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(contents) = fs::read_to_string(pidfile)
                && let Ok(pid) = contents.trim().parse()
            {
                return Ok(pid);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(String::from("slow command never started"))
    }

    fn join_background(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| String::from("daemon not running"))?;
        match handle.join() {
            Ok(result) => {
                self.result = Some(result);
                Ok(())
            }
            Err(_) => Err(String::from("daemon thread panicked")),
        }
    }
}

impl Drop for ProcessTestWorld {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
        if let Some(client) = self.client.take() {
            drop(client.join());
        }
    }
}

#[derive(Clone)]
struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*triggered {
            triggered = cvar.wait(triggered).unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }
}
