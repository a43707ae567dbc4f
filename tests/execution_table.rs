// tests/execution_table.rs

use std::path::PathBuf;

use tokio::sync::oneshot;

use playctl::engine::{
    ExecutionEvent, ExecutionId, ExecutionPhase, ExecutionRecord, ExecutionTable, LaunchRequest,
};
use playctl::errors::PlayctlError;
use playctl::exec::CommandLine;
use playctl::types::{ExecutionStatus, OutputStream};

fn record(name: &str) -> ExecutionRecord {
    let command_line = CommandLine {
        program: "ansible-playbook".to_string(),
        args: vec![format!("/p/{name}")],
        working_dir: PathBuf::from("/p"),
    };
    ExecutionRecord::new(ExecutionId::generate(), LaunchRequest::new(name), command_line)
}

fn output(text: &str) -> ExecutionEvent {
    ExecutionEvent::Output {
        stream: OutputStream::Stdout,
        text: text.to_string(),
    }
}

/// Insert and start a record; the receiver stands in for the worker.
fn running(table: &mut ExecutionTable, name: &str) -> (ExecutionId, oneshot::Receiver<()>) {
    let id = table.insert(record(name));
    let (tx, rx) = oneshot::channel();
    assert!(table.mark_running(id.as_str(), tx));
    (id, rx)
}

#[test]
fn record_phase_rejects_invalid_transitions() {
    let mut rec = record("site.yml");
    assert_eq!(rec.status(), ExecutionStatus::Pending);
    assert!(!rec.complete(0), "pending cannot complete");
    assert!(!rec.cancel(), "pending cannot be cancelled");

    assert!(rec.mark_running());
    assert!(!rec.mark_running());
    assert!(rec.complete(0));
    assert!(matches!(rec.phase(), ExecutionPhase::Succeeded { .. }));

    assert!(!rec.complete(1));
    assert!(!rec.fail("late"));
    assert!(!rec.cancel());
    assert_eq!(rec.status(), ExecutionStatus::Success);
    assert_eq!(rec.phase().return_code(), Some(0));
}

#[test]
fn fail_appends_error_to_existing_stderr() {
    let mut rec = record("site.yml");
    rec.append(OutputStream::Stderr, "partial");
    assert!(rec.fail("boom"));
    assert_eq!(rec.stderr(), "partial\nboom");
    assert_eq!(rec.phase().return_code(), None);
    assert!(rec.phase().finished_at().is_some());
}

#[test]
fn events_drive_a_record_to_completion() {
    let mut table = ExecutionTable::new(None);
    let (id, _rx) = running(&mut table, "site.yml");

    table.apply(id.as_str(), output("line 1\n"));
    table.apply(id.as_str(), output("line 2\n"));
    table.apply(id.as_str(), ExecutionEvent::Exited { return_code: 4 });

    let snap = table.get(id.as_str()).expect("record exists");
    assert_eq!(snap.status, ExecutionStatus::Failed);
    assert_eq!(snap.return_code, Some(4));
    assert_eq!(snap.stdout, "line 1\nline 2\n");
}

#[test]
fn cancel_wins_over_a_later_exit_report() {
    let mut table = ExecutionTable::new(None);
    let (id, mut rx) = running(&mut table, "site.yml");

    table.cancel(id.as_str()).expect("running record is cancellable");
    assert_eq!(rx.try_recv(), Ok(()));
    assert_eq!(table.status(id.as_str()), Some(ExecutionStatus::Cancelled));

    // Output drained after the cancel is still appended.
    table.apply(id.as_str(), output("tail\n"));
    table.apply(id.as_str(), ExecutionEvent::Exited { return_code: 143 });
    table.apply(id.as_str(), ExecutionEvent::Cancelled { forced: false });

    let snap = table.get(id.as_str()).expect("record exists");
    assert_eq!(snap.status, ExecutionStatus::Cancelled);
    assert_eq!(snap.return_code, None);
    assert_eq!(snap.stdout, "tail\n");
}

#[test]
fn cancel_loses_once_the_worker_stopped_listening() {
    let mut table = ExecutionTable::new(None);
    let (id, rx) = running(&mut table, "site.yml");

    // The worker closes its receiver as soon as the process has exited.
    drop(rx);

    let result = table.cancel(id.as_str());
    assert!(matches!(result, Err(PlayctlError::NotCancellable(_))), "{result:?}");
    assert_eq!(table.status(id.as_str()), Some(ExecutionStatus::Running));

    table.apply(id.as_str(), ExecutionEvent::Exited { return_code: 0 });
    assert_eq!(table.status(id.as_str()), Some(ExecutionStatus::Success));
}

#[test]
fn cancel_rejects_pending_terminal_and_unknown_records() {
    let mut table = ExecutionTable::new(None);

    let pending = table.insert(record("a.yml"));
    assert!(matches!(
        table.cancel(pending.as_str()),
        Err(PlayctlError::NotCancellable(_))
    ));

    let (done, _rx) = running(&mut table, "b.yml");
    table.apply(done.as_str(), ExecutionEvent::Exited { return_code: 0 });
    assert!(matches!(
        table.cancel(done.as_str()),
        Err(PlayctlError::NotCancellable(_))
    ));

    assert!(matches!(table.cancel("missing"), Err(PlayctlError::NotFound(_))));
}

#[test]
fn failure_after_terminal_state_is_ignored() {
    let mut table = ExecutionTable::new(None);
    let (id, _rx) = running(&mut table, "site.yml");

    table.apply(id.as_str(), ExecutionEvent::Exited { return_code: 0 });
    table.apply(
        id.as_str(),
        ExecutionEvent::Failed {
            error: "worker ended".to_string(),
        },
    );

    let snap = table.get(id.as_str()).expect("record exists");
    assert_eq!(snap.status, ExecutionStatus::Success);
    assert_eq!(snap.stderr, "");
}

#[test]
fn events_for_unknown_records_are_dropped() {
    let mut table = ExecutionTable::new(None);
    table.apply("ghost", output("nobody listens\n"));
    assert!(table.is_empty());
}

#[test]
fn list_keeps_insertion_order() {
    let mut table = ExecutionTable::new(None);
    let ids: Vec<ExecutionId> = ["a.yml", "b.yml", "c.yml"]
        .into_iter()
        .map(|name| table.insert(record(name)))
        .collect();

    let listed: Vec<ExecutionId> = table.list().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, ids);
    let names: Vec<String> = table.list().into_iter().map(|s| s.playbook).collect();
    assert_eq!(names, vec!["a.yml", "b.yml", "c.yml"]);
}

#[test]
fn eviction_only_removes_finished_records() {
    let mut table = ExecutionTable::new(Some(2));

    let (a, _rx_a) = running(&mut table, "a.yml");
    table.apply(a.as_str(), ExecutionEvent::Exited { return_code: 0 });
    let (b, _rx_b) = running(&mut table, "b.yml");

    // Over the bound: the finished record goes.
    let c = table.insert(record("c.yml"));
    assert_eq!(table.len(), 2);
    assert!(table.get(a.as_str()).is_none());

    // Nothing finished left to evict; the table grows past the bound.
    let d = table.insert(record("d.yml"));
    assert_eq!(table.len(), 3);

    let listed: Vec<ExecutionId> = table.list().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![b, c, d]);
}

#[test]
fn subscribers_see_status_changes() {
    let mut table = ExecutionTable::new(None);
    let id = table.insert(record("site.yml"));
    let rx = table.subscribe(id.as_str()).expect("record exists");
    assert_eq!(*rx.borrow(), ExecutionStatus::Pending);

    let (tx, _worker) = oneshot::channel();
    table.mark_running(id.as_str(), tx);
    assert_eq!(*rx.borrow(), ExecutionStatus::Running);

    table.fail(id.as_str(), "relay broke");
    assert_eq!(*rx.borrow(), ExecutionStatus::Failed);
    assert!(table.subscribe("missing").is_none());
}
