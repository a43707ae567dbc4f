#![allow(dead_code)]

use std::sync::Mutex;

use playctl::exec::OutputObserver;
use playctl::types::OutputStream;

/// Observer that remembers every call, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<(OutputStream, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(OutputStream, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(stream, _)| *stream == OutputStream::Stdout)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn stderr_text(&self) -> String {
        self.calls()
            .into_iter()
            .filter(|(stream, _)| *stream == OutputStream::Stderr)
            .map(|(_, text)| text)
            .collect()
    }
}

impl OutputObserver for RecordingObserver {
    fn on_output(&self, stream: OutputStream, text: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((stream, text.to_string()));
        Ok(())
    }
}

/// Observer that fails on every call, or panics when asked to.
#[derive(Debug, Default)]
pub struct FailingObserver {
    pub panic: bool,
    calls: Mutex<usize>,
}

impl FailingObserver {
    pub fn erroring() -> Self {
        Self::default()
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl OutputObserver for FailingObserver {
    fn on_output(&self, _stream: OutputStream, text: &str) -> anyhow::Result<()> {
        *self.calls.lock().unwrap() += 1;
        if self.panic {
            panic!("observer blew up on {text:?}");
        }
        anyhow::bail!("observer rejected {text:?}")
    }
}
