//! Operations log.
//!
//! Every mutating request records exactly one structured entry: command
//! name, outcome, duration, and a free-form argument bag. The entry goes
//! through `tracing`, so subscribers decide where it lands.

use std::time::Instant;

use serde_json::Value;

/// Outcome recorded for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    /// Everything applied.
    Ok,
    /// Some items failed, the rest applied.
    Partial,
    /// A pre-flight check refused the operation.
    Blocked,
    /// The operation failed.
    Error,
}

impl OpOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Blocked => "blocked",
            Self::Error => "error",
        }
    }
}

impl From<skillshare_core::engine::OpStatus> for OpOutcome {
    fn from(status: skillshare_core::engine::OpStatus) -> Self {
        match status {
            skillshare_core::engine::OpStatus::Ok => Self::Ok,
            skillshare_core::engine::OpStatus::Partial => Self::Partial,
            skillshare_core::engine::OpStatus::Error => Self::Error,
        }
    }
}

/// Timer handed to a mutating handler at entry; finished exactly once.
#[derive(Debug)]
pub struct OpTimer {
    command: &'static str,
    args: Value,
    started: Instant,
}

/// Starts timing a mutating command.
pub fn start(command: &'static str, args: Value) -> OpTimer {
    OpTimer {
        command,
        args,
        started: Instant::now(),
    }
}

impl OpTimer {
    /// Writes the single log entry for this command.
    pub fn finish(self, outcome: OpOutcome) {
        tracing::info!(
            command = self.command,
            status = outcome.as_str(),
            duration_ms = self.started.elapsed().as_millis() as u64,
            args = %self.args,
            "operation"
        );
    }
}
