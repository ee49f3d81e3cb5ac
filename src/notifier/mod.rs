// src/notifier/mod.rs

//! Change notifier: debounced re-runs of watched tasks.
//!
//! Each watch binding runs its own state machine:
//!
//! ```text
//! Idle --change--> Debouncing --quiet window--> Firing --done--> Idle
//!                    ^   |                        |
//!                    +---+ change (re-arm)        | change: pending,
//!                                                 v re-arm after done
//! ```
//!
//! The pure state machine lives in [`core`]; the async shell that owns the
//! channels and timers is [`runtime`]; [`executor`] runs the tasks.

use std::time::Duration;

use crate::types::TaskName;

pub mod core;
pub mod executor;
pub mod runtime;

pub use self::core::{BindingState, NotifierCore, NotifierStep};
pub use executor::{RealTaskExecutor, TaskExecutor};
pub use runtime::Notifier;

/// Events flowing into the notifier from the watcher, timers and executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// A watched path of this binding changed.
    Changed { task: TaskName },
    /// A debounce timer fired. Stale generations are ignored.
    DebounceElapsed { task: TaskName, generation: u64 },
    /// A run of the task finished (successfully or with per-file failures).
    TaskFinished { task: TaskName },
    /// A run hit an error that must stop the process.
    TaskFailedFatally { task: TaskName, message: String },
    /// Graceful shutdown requested.
    ShutdownRequested,
}

/// What the shell should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCommand {
    /// Deliver `DebounceElapsed { task, generation }` after `delay`.
    ArmTimer {
        task: TaskName,
        generation: u64,
        delay: Duration,
    },
    /// Start a run of the task.
    RunTask { task: TaskName },
    /// Stop the loop, with an error message if a run failed fatally.
    Exit { error: Option<String> },
}
