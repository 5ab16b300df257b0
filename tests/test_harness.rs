//! Test harness for provider tests.
//!
//! Replays canned scheduler output instead of spawning processes and records
//! every argument vector it was asked to run.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use grid_bridge::cmd::{CommandResult, Execute};
use grid_bridge::config::{BridgeConfig, EngineKind};
use grid_bridge::error::Result;
use grid_bridge::provider::GridProvider;

/// Executor that answers each call with the next scripted result.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    responses: Arc<Mutex<VecDeque<CommandResult>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next call.
    pub fn respond(&self, exit_code: i32, stdout: &[&str], stderr: &[&str]) -> &Self {
        self.responses.lock().unwrap().push_back(CommandResult::new(
            exit_code,
            stdout.iter().copied(),
            stderr.iter().copied(),
        ));
        self
    }

    /// Argument vectors executed so far, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Execute for ScriptedExecutor {
    async fn execute(&self, argv: &[String]) -> Result<CommandResult> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| panic!("no scripted result for {:?}", argv)))
    }
}

/// Provider for `engine` wired to `executor`, with job logs under `shared`.
pub fn test_provider(
    engine: EngineKind,
    executor: &ScriptedExecutor,
    shared: &Path,
) -> GridProvider<ScriptedExecutor> {
    let config = BridgeConfig::new(engine)
        .with_shared_folder(shared)
        .with_log_dir("logs");
    GridProvider::with_executor(&config, executor.clone()).unwrap()
}

/// Whether `argv` contains `arg` as a whole token.
#[allow(dead_code)]
pub fn has_arg(argv: &[String], arg: &str) -> bool {
    argv.iter().any(|a| a == arg)
}
