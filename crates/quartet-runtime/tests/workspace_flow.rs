//! End-to-end flows through the assembled workspace.

use quartet_event::{Board, EventBus};
use quartet_runtime::capability::CapabilityError;
use quartet_runtime::command::Payload;
use quartet_runtime::config::QuartetConfig;
use quartet_runtime::engine::{agent_fn, AgentError, SharedAgent};
use quartet_runtime::session::TranscriptKind;
use quartet_runtime::task::{TaskArgs, TaskRunnerError, TaskStatus};
use quartet_runtime::workspace::{CommandSurface, WorkspaceLoop, WorkspaceRuntime};
use quartet_types::Mode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    runtime: Arc<WorkspaceRuntime>,
    surface: CommandSurface,
    board: Board,
}

fn fixture(config: &QuartetConfig) -> Fixture {
    let bus = Arc::new(EventBus::new());
    let board = Board::attach_with_capacity(&bus, "*", 4096).expect("valid pattern");
    let runtime = Arc::new(
        WorkspaceRuntime::builder()
            .with_config(config)
            .with_bus(bus)
            .build()
            .expect("runtime"),
    );
    let surface = CommandSurface::new(Arc::clone(&runtime));
    Fixture {
        runtime,
        surface,
        board,
    }
}

fn config(mode: Mode, simulate_crash: bool) -> QuartetConfig {
    let mut config = QuartetConfig::default();
    config.runtime.initial_mode = mode;
    config.process.simulate_crash = simulate_crash;
    config
}

fn structured(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

// ─── Routing ───────────────────────────────────────────────────────

#[test]
fn text_mode_switch_round_trip() {
    let f = fixture(&QuartetConfig::default());

    let result = f.surface.submit("please enter insight mode", Payload::new(), None);
    assert_eq!(result, json!({"status": "ok", "mode": "insight"}));
    assert_eq!(f.runtime.modes().mode(), Mode::Insight);
    assert_eq!(f.runtime.state().current_mode(), Mode::Insight);
    assert_eq!(f.board.count("mode.changed"), 1);

    // Same mode again: routed, but nothing changes.
    f.surface.submit("please enter insight mode", Payload::new(), None);
    assert_eq!(f.board.count("mode.changed"), 1);
}

#[test]
fn smart_mode_denies_gated_families() {
    let f = fixture(&QuartetConfig::default());
    for capability in ["debug.debug_last_error", "automation.run_workflow", "insight.analyze"] {
        let result = f
            .surface
            .submit(structured(json!({"capability": capability})), Payload::new(), None);
        assert_eq!(result["status"], json!("denied"), "{capability}");
    }
    assert_eq!(f.board.count("router.denied"), 3);
    assert!(f.runtime.task_records().is_empty());
}

#[test]
fn unknown_text_is_reported_not_routed() {
    let f = fixture(&QuartetConfig::default());
    let result = f.surface.submit("what's the weather", Payload::new(), None);
    assert_eq!(result, json!({"status": "unknown", "raw": "what's the weather"}));
    assert_eq!(f.board.count("command.unknown"), 1);
    assert_eq!(f.board.count("capability.dispatch"), 0);
}

#[test]
fn unregistered_capability_falls_back_to_process_monitor() {
    let f = fixture(&QuartetConfig::default());
    let result = f
        .surface
        .submit(structured(json!({"capability": "ghost.cap"})), Payload::new(), None);
    assert_eq!(result["task"], json!("monitor_process"));
    let dispatch = f
        .board
        .all()
        .into_iter()
        .find(|e| e.name == "capability.dispatch")
        .expect("dispatched");
    assert_eq!(dispatch.payload["reason"], json!("fallback_process_monitor"));
    assert!(f.runtime.wait_for_tasks(WAIT));
    assert_eq!(f.runtime.health().snapshot().capability_errors, 0);
}

// ─── Tasks ─────────────────────────────────────────────────────────

#[test]
fn ghost_task_is_rejected_without_record() {
    let f = fixture(&QuartetConfig::default());
    let err = f
        .runtime
        .tasks()
        .run_task("ghost_task", TaskArgs::default())
        .expect_err("not registered");
    assert!(matches!(err, TaskRunnerError::NotRegistered { ref name } if name == "ghost_task"));
    assert!(f.runtime.task_records().is_empty());
    assert_eq!(f.board.count("task.started"), 0);
}

#[test]
fn insight_analysis_stores_result() {
    let f = fixture(&config(Mode::Insight, false));
    let result = f.surface.submit(
        structured(json!({"capability": "insight.analyze", "payload": {"text": "error pattern in logs"}})),
        Payload::new(),
        None,
    );
    assert_eq!(result["task"], json!("insight_analyze"));
    assert!(f.runtime.wait_for_tasks(WAIT));

    let insights = f.runtime.state().insight_results();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0]["summary"], json!("Insight summary of the supplied input."));
    assert_eq!(f.board.count("insight.result"), 1);
    assert!(f.runtime.state().active_tasks().is_empty());
}

#[test]
fn workflow_completes_without_crash() {
    let f = fixture(&config(Mode::Automation, false));
    let workflow = json!({
        "name": "nightly",
        "tasks": [
            {"name": "build", "action": "launch_process", "parameters": {"argv": ["make"]}},
            {"name": "notify", "action": "noop"}
        ]
    });
    f.surface.submit(
        structured(json!({"capability": "automation.run_workflow", "payload": {"workflow": workflow}})),
        Payload::new(),
        None,
    );
    assert!(f.runtime.wait_for_tasks(WAIT));

    let record = &f.runtime.task_records()[0];
    assert_eq!(record.status, TaskStatus::Ok);
    let result = record.result.clone().expect("result");
    assert_eq!(result["status"], json!("completed"));
    assert_eq!(result["workflow"], json!("nightly"));
    assert_eq!(result["completed"], json!(["build", "notify"]));
    assert_eq!(f.board.count("automation.result"), 1);
}

#[test]
fn crashing_workflow_carries_debug_result() {
    let f = fixture(&config(Mode::Automation, true));
    let workflow = json!({
        "name": "deploy",
        "tasks": [{"name": "server", "action": "launch_process"}]
    });
    f.surface.submit(
        structured(json!({"capability": "automation.run_workflow", "payload": {"workflow": workflow}})),
        Payload::new(),
        None,
    );
    assert!(f.runtime.wait_for_tasks(WAIT));

    let result = f.runtime.task_records()[0].result.clone().expect("result");
    assert_eq!(result["status"], json!("failed"));
    assert_eq!(result["failed_task"], json!("server"));
    assert_eq!(result["debug_result"]["status"], json!("heuristic"));
    assert_eq!(f.board.count("automation.workflow_failed"), 1);
}

#[test]
fn crash_is_diagnosed_by_agent_in_debug_mode() {
    let f = fixture(&config(Mode::Debug, true));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let agent: SharedAgent = agent_fn(move |prompt| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.user.contains("SimulatedCrash"));
        Ok("restart the worker".to_string())
    });

    f.surface.submit(
        structured(json!({"capability": "process.monitor", "payload": {"name": "worker"}})),
        Payload::new(),
        None,
    );
    assert!(f.runtime.wait_for_tasks(WAIT));
    assert_eq!(f.board.count("process.crash"), 1);

    f.surface.submit(
        structured(json!({"capability": "debug.debug_last_error"})),
        Payload::new(),
        Some(&agent),
    );
    assert!(f.runtime.wait_for_tasks(WAIT));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let history = f.runtime.state().debugging_history();
    assert_eq!(history[0]["status"], json!("agent"));
    assert_eq!(history[0]["agent_output"], json!("restart the worker"));
}

#[test]
fn failing_agent_falls_back_to_heuristics() {
    let f = fixture(&config(Mode::Debug, true));
    let agent: SharedAgent = agent_fn(|_| Err(AgentError::Failed("offline".into())));

    f.surface.submit(
        structured(json!({"capability": "process.monitor"})),
        Payload::new(),
        None,
    );
    assert!(f.runtime.wait_for_tasks(WAIT));
    f.surface.submit(
        structured(json!({"capability": "debug.debug_last_error"})),
        Payload::new(),
        Some(&agent),
    );
    assert!(f.runtime.wait_for_tasks(WAIT));

    let history = f.runtime.state().debugging_history();
    assert_eq!(history[0]["status"], json!("heuristic"));
    assert_eq!(f.board.count("debug.agent_failed"), 1);
}

#[test]
fn debug_without_error_reports_no_error() {
    let f = fixture(&config(Mode::Debug, false));
    f.surface.submit(
        structured(json!({"capability": "debug.debug_last_error"})),
        Payload::new(),
        None,
    );
    assert!(f.runtime.wait_for_tasks(WAIT));
    let result = f.runtime.task_records()[0].result.clone().expect("result");
    assert_eq!(result, json!({"status": "no_error"}));
    assert!(f.runtime.state().debugging_history().is_empty());
}

// ─── Events ────────────────────────────────────────────────────────

#[test]
fn once_subscription_sees_first_dispatch_only() {
    let f = fixture(&QuartetConfig::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    f.runtime
        .bus()
        .subscribe_once("command.dispatch", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("valid pattern");

    f.surface.submit("help", Payload::new(), None);
    f.surface.submit("switch to smart mode", Payload::new(), None);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(f.board.count("command.dispatch"), 2);
}

#[test]
fn transcript_records_each_dispatch() {
    let f = fixture(&QuartetConfig::default());
    f.surface.submit("", Payload::new(), None);
    f.surface.submit("nonsense", Payload::new(), None);
    f.surface.submit("switch to debug mode", Payload::new(), None);

    let transcript = f.runtime.transcript();
    assert_eq!(transcript.count(TranscriptKind::Command), 3);
    assert_eq!(transcript.count(TranscriptKind::Result), 2);
    assert_eq!(transcript.count(TranscriptKind::Error), 1);
    assert_eq!(transcript.count(TranscriptKind::Mode), 1);
}

#[test]
fn failing_capability_is_reported_at_every_boundary() {
    let f = fixture(&QuartetConfig::default());
    f.runtime.capabilities().register_fn(
        "process.restart",
        |_, _, _| Err(CapabilityError::Failed("restart refused".into())),
        "Always fails",
    );

    let result = f.surface.submit(
        structured(json!({"capability": "process.restart", "payload": {"name": "db"}})),
        Payload::new(),
        None,
    );

    assert_eq!(result["status"], json!("error"));
    let error = result["error"].as_str().expect("error text");
    assert!(error.contains("process.restart"), "{error}");
    assert!(error.contains("restart refused"), "{error}");

    assert_eq!(f.runtime.health().snapshot().capability_errors, 1);

    let last_error = f.runtime.state().last_error().expect("last error recorded");
    assert_eq!(last_error["capability"], json!("process.restart"));
    assert!(last_error["message"]
        .as_str()
        .is_some_and(|m| m.contains("restart refused")));

    let transcript = f.runtime.transcript();
    assert_eq!(transcript.count(TranscriptKind::Command), 1);
    assert_eq!(transcript.count(TranscriptKind::Result), 0);
    let entry = transcript
        .all()
        .into_iter()
        .find(|e| e.kind == TranscriptKind::Error)
        .expect("error entry");
    assert_eq!(entry.data["capability"], json!("process.restart"));

    assert_eq!(f.board.count("command.error"), 1);
    assert_eq!(f.board.count("command.result"), 0);
    assert_eq!(f.board.count("health.capability_error"), 1);
}

// ─── Loop ──────────────────────────────────────────────────────────

#[tokio::test]
async fn loop_drives_process_monitor_from_other_thread() {
    let f = fixture(&QuartetConfig::default());
    let mut workspace = WorkspaceLoop::new(Arc::clone(&f.runtime));
    let handle = workspace.handle();

    std::thread::spawn(move || {
        handle
            .enqueue_command(
                structured(json!({"capability": "process.monitor", "payload": {"name": "db"}})),
                Payload::new(),
            )
            .expect("queued");
    })
    .join()
    .expect("producer");

    let result = workspace
        .process_next(WAIT)
        .await
        .expect("processed");
    assert_eq!(result["status"], json!("ok"));
    assert!(f.runtime.wait_for_tasks(WAIT));
    assert_eq!(f.board.count("process.state"), 1);
    assert_eq!(f.board.count("loop.processed"), 1);
}
