use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::RuntimeError;
use std::sync::Mutex;

enum Reply {
    Exit { code: i32, output: String },
    SpawnError(String),
}

struct Rule {
    pattern: String,
    reply: Reply,
}

/// Scripted command runner for tests.
///
/// Each call is recorded. The first rule whose pattern is a substring of the
/// command line decides the reply; unmatched commands exit with the default
/// code and no output.
pub struct MockRunner {
    rules: Vec<Rule>,
    default_code: i32,
    calls: Mutex<Vec<CommandSpec>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_code: 0,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRunner {
    /// A runner on which every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner on which every unmatched command exits with status 1.
    pub fn failing() -> Self {
        Self {
            default_code: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on(mut self, pattern: &str, code: i32, output: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_owned(),
            reply: Reply::Exit {
                code,
                output: output.to_owned(),
            },
        });
        self
    }

    #[must_use]
    pub fn on_spawn_error(mut self, pattern: &str, message: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_owned(),
            reply: Reply::SpawnError(message.to_owned()),
        });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RuntimeError> {
        self.calls
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?
            .push(spec.clone());

        let line = spec.command_line();
        match self.rules.iter().find(|r| line.contains(&r.pattern)) {
            Some(Rule {
                reply: Reply::Exit { code, output },
                ..
            }) => Ok(CommandOutput {
                code: Some(*code),
                output: output.clone(),
            }),
            Some(Rule {
                reply: Reply::SpawnError(message),
                ..
            }) => Err(RuntimeError::ExecFailed(message.clone())),
            None => Ok(CommandOutput {
                code: Some(self.default_code),
                output: String::new(),
            }),
        }
    }
}
