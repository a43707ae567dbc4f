// tests/output_relay.rs

use std::error::Error;
use std::sync::Arc;

use playctl::engine::{ExecutionId, LaunchRequest};
use playctl::errors::PlayctlError;
use playctl::exec::relay::{decode_line, STDERR_MARKER};
use playctl::exec::OutputObserver;
use playctl::types::{ExecutionStatus, OutputStream};
use playctl_test_utils::builders::TestProject;
use playctl_test_utils::observer::{FailingObserver, RecordingObserver};
use playctl_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn observer_sees_stdout_lines_in_order_then_stderr_block() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo a; echo warn1 >&2; echo b; echo warn2 >&2; echo c");
    let observer = Arc::new(RecordingObserver::new());

    let id = engine.launch(LaunchRequest::new("site.yml"), Some(observer.clone()))?;
    with_timeout(engine.wait(&id)).await?;

    assert_eq!(
        observer.calls(),
        vec![
            (OutputStream::Stdout, "a".to_string()),
            (OutputStream::Stdout, "b".to_string()),
            (OutputStream::Stdout, "c".to_string()),
            (OutputStream::Stderr, "warn1\nwarn2\n".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn no_stderr_means_no_stderr_callback() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo only-stdout");
    let observer = Arc::new(RecordingObserver::new());

    let id = engine.launch(LaunchRequest::new("site.yml"), Some(observer.clone()))?;
    with_timeout(engine.wait(&id)).await?;

    assert_eq!(observer.stdout_lines(), vec!["only-stdout"]);
    assert_eq!(observer.stderr_text(), "");

    let log = engine.read_log(&id)?;
    assert_eq!(log, "only-stdout\n");
    assert!(!log.contains(STDERR_MARKER));
    Ok(())
}

#[tokio::test]
async fn log_file_holds_stdout_then_marked_stderr() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo first; echo broken >&2; echo second; exit 2");

    let id = engine.launch(LaunchRequest::new("site.yml"), None)?;
    let snap = with_timeout(engine.wait(&id)).await?;
    assert_eq!(snap.status, ExecutionStatus::Failed);

    let log_path = project.logs_dir().join(format!("{id}.log"));
    assert_eq!(engine.log_path(&id), log_path);
    assert!(log_path.is_file());

    let log = std::fs::read_to_string(&log_path)?;
    assert_eq!(log, format!("first\nsecond\n\n{STDERR_MARKER}\nbroken\n"));
    assert_eq!(engine.read_log(&id)?, log);
    Ok(())
}

#[tokio::test]
async fn read_log_of_unknown_execution_is_not_found() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    let engine = project.engine_with_script("true");

    let result = engine.read_log(&ExecutionId::from("ghost"));
    assert!(matches!(result, Err(PlayctlError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn failing_observer_does_not_disturb_the_run() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo one; echo two; echo problem >&2");
    let observer = Arc::new(FailingObserver::erroring());

    let id = engine.launch(LaunchRequest::new("site.yml"), Some(observer.clone()))?;
    let snap = with_timeout(engine.wait(&id)).await?;

    assert_eq!(snap.status, ExecutionStatus::Success);
    assert_eq!(snap.stdout, "one\ntwo\n");
    assert_eq!(snap.stderr, "problem\n");
    assert_eq!(observer.call_count(), 3);
    assert!(engine.read_log(&id)?.starts_with("one\ntwo\n"));
    Ok(())
}

#[tokio::test]
async fn panicking_observer_does_not_disturb_the_run() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo one; echo two");
    let observer = Arc::new(FailingObserver::panicking());

    let id = engine.launch(LaunchRequest::new("site.yml"), Some(observer.clone()))?;
    let snap = with_timeout(engine.wait(&id)).await?;

    assert_eq!(snap.status, ExecutionStatus::Success);
    assert_eq!(snap.stdout, "one\ntwo\n");
    assert_eq!(observer.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn closures_work_as_observers() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("echo x; echo y");

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: Arc<dyn OutputObserver> = Arc::new(move |_stream: OutputStream, text: &str| {
        sink.lock().unwrap().push(text.to_uppercase());
        Ok::<(), anyhow::Error>(())
    });

    let id = engine.launch(LaunchRequest::new("site.yml"), Some(observer))?;
    with_timeout(engine.wait(&id)).await?;

    assert_eq!(*seen.lock().unwrap(), vec!["X", "Y"]);
    Ok(())
}

#[tokio::test]
async fn invalid_utf8_and_crlf_are_normalised() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script(r"printf 'bad \377 byte\n'; printf 'windows\r\n'");

    let id = engine.launch(LaunchRequest::new("site.yml"), None)?;
    let snap = with_timeout(engine.wait(&id)).await?;

    assert_eq!(snap.status, ExecutionStatus::Success);
    assert_eq!(snap.stdout, "bad \u{FFFD} byte\nwindows\n");
    Ok(())
}

#[tokio::test]
async fn final_line_without_newline_is_kept() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine = project.engine_with_script("printf 'line\\nno-newline'");

    let id = engine.launch(LaunchRequest::new("site.yml"), None)?;
    let snap = with_timeout(engine.wait(&id)).await?;

    assert_eq!(snap.stdout, "line\nno-newline\n");
    Ok(())
}

#[test]
fn decode_line_strips_terminators_only() {
    assert_eq!(decode_line(b"plain\n"), "plain");
    assert_eq!(decode_line(b"dos\r\n"), "dos");
    assert_eq!(decode_line(b"no terminator"), "no terminator");
    assert_eq!(decode_line(b"  padded  \n"), "  padded  ");
    assert_eq!(decode_line(b"\xffx\n"), "\u{FFFD}x");
}
