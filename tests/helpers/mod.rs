use cmdguard::exec::{Capture, CommandRunner, ExecResult, ExecutionGateway, RawOutput};
use std::sync::{Arc, Mutex};

/// Command lines seen by a [`RecordingRunner`], in call order
pub type Calls = Arc<Mutex<Vec<String>>>;

/// Stands in for the shell: records each command line and replays canned output
pub struct RecordingRunner {
    calls: Calls,
    output: String,
    exit_code: Option<i32>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command_line: &str, _capture: Capture) -> ExecResult<RawOutput> {
        self.calls.lock().unwrap().push(command_line.to_string());
        Ok(RawOutput {
            output: self.output.clone(),
            exit_code: self.exit_code,
        })
    }
}

/// Gateway backed by a [`RecordingRunner`] that always prints `output`
#[allow(dead_code)]
pub fn recording_gateway(output: &str, exit_code: Option<i32>) -> (ExecutionGateway, Calls) {
    let calls = Calls::default();
    let runner = RecordingRunner {
        calls: Arc::clone(&calls),
        output: output.to_string(),
        exit_code,
    };
    (ExecutionGateway::with_runner(Box::new(runner)), calls)
}
