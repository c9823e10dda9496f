//! Orchestration run states.

use serde::{Deserialize, Serialize};

/// Lifecycle of one orchestration run. Transitions only move forward by one
/// step; `OutputWritten` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    ComponentsResolving,
    ComponentsReady,
    MainDeployed,
    MainInitialized,
    OutputWritten,
}

impl RunState {
    /// The only state reachable from `self`, if any.
    pub fn next(&self) -> Option<RunState> {
        match self {
            RunState::Init => Some(RunState::ComponentsResolving),
            RunState::ComponentsResolving => Some(RunState::ComponentsReady),
            RunState::ComponentsReady => Some(RunState::MainDeployed),
            RunState::MainDeployed => Some(RunState::MainInitialized),
            RunState::MainInitialized => Some(RunState::OutputWritten),
            RunState::OutputWritten => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::ComponentsResolving => "components_resolving",
            RunState::ComponentsReady => "components_ready",
            RunState::MainDeployed => "main_deployed",
            RunState::MainInitialized => "main_initialized",
            RunState::OutputWritten => "output_written",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
