//! Agent loop state and iteration control.

use std::fmt;

/// Default cap on model calls within one agent turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Phase of the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Waiting for the model stream to open or produce its first item.
    AwaitingModel,
    /// Forwarding text fragments to the caller.
    TextStreaming,
    /// The model turn ended with tool calls.
    ToolCallsPending,
    /// Running the requested tools.
    ExecutingTools,
    /// The turn is over.
    Done,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingModel => "awaiting-model",
            Self::TextStreaming => "text-streaming",
            Self::ToolCallsPending => "tool-calls-pending",
            Self::ExecutingTools => "executing-tools",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Agent runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum model calls per turn
    pub max_iterations: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Per-turn loop state.
#[derive(Debug)]
pub struct LoopState {
    config: RuntimeConfig,
    iteration: u32,
    phase: LoopPhase,
    hit_cap: bool,
}

impl LoopState {
    /// Fresh state for one turn.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            iteration: 0,
            phase: LoopPhase::AwaitingModel,
            hit_cap: false,
        }
    }

    /// Start the next model call. Returns `false`, and ends the turn, when
    /// the iteration cap has already been used up.
    pub fn begin_iteration(&mut self) -> bool {
        if self.iteration >= self.config.max_iterations {
            self.hit_cap = true;
            self.phase = LoopPhase::Done;
            return false;
        }
        self.iteration += 1;
        self.phase = LoopPhase::AwaitingModel;
        true
    }

    /// Whether another model call fits under the cap.
    pub fn has_next(&self) -> bool {
        self.iteration < self.config.max_iterations
    }

    /// End the turn at the cap. Pending tool calls are not run.
    pub fn stop_at_cap(&mut self) {
        self.hit_cap = true;
        self.phase = LoopPhase::Done;
    }

    /// Move to `phase`, ignoring moves out of `Done`.
    pub fn transition(&mut self, phase: LoopPhase) {
        if self.phase != LoopPhase::Done {
            self.phase = phase;
        }
    }

    /// End the turn normally.
    pub fn finish(&mut self) {
        self.phase = LoopPhase::Done;
    }

    /// Model calls made so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Current phase.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Whether the turn ended because of the iteration cap.
    pub fn hit_cap(&self) -> bool {
        self.hit_cap
    }
}
