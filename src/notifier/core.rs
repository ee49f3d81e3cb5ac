// src/notifier/core.rs

//! Pure debounce state machine.
//!
//! Consumes [`NotifierEvent`]s and returns the [`NotifierCommand`]s the IO
//! shell must carry out. No Tokio, no channels, no filesystem: everything
//! here can be driven step by step from tests.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::notifier::{NotifierCommand, NotifierEvent};
use crate::types::TaskName;

/// State of one watch binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Idle,
    /// Waiting for the quiet window of timer `generation` to elapse.
    Debouncing { generation: u64 },
    /// A run is in flight; `pending` records changes seen meanwhile.
    Firing { pending: bool },
}

#[derive(Debug)]
struct Slot {
    state: BindingState,
    generation: u64,
}

/// Result of one step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotifierStep {
    pub commands: Vec<NotifierCommand>,
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct NotifierCore {
    slots: BTreeMap<TaskName, Slot>,
    debounce: Duration,
    shutting_down: bool,
}

impl NotifierCore {
    pub fn new(tasks: impl IntoIterator<Item = TaskName>, debounce: Duration) -> Self {
        let slots = tasks
            .into_iter()
            .map(|t| {
                (
                    t,
                    Slot {
                        state: BindingState::Idle,
                        generation: 0,
                    },
                )
            })
            .collect();
        Self {
            slots,
            debounce,
            shutting_down: false,
        }
    }

    pub fn state(&self, task: &str) -> Option<BindingState> {
        self.slots.get(task).map(|s| s.state)
    }

    /// No binding has a run in flight.
    pub fn is_quiescent(&self) -> bool {
        !self
            .slots
            .values()
            .any(|s| matches!(s.state, BindingState::Firing { .. }))
    }

    pub fn step(&mut self, event: NotifierEvent) -> NotifierStep {
        let mut commands = Vec::new();

        match event {
            NotifierEvent::Changed { task } => self.on_changed(task, &mut commands),
            NotifierEvent::DebounceElapsed { task, generation } => {
                self.on_elapsed(task, generation, &mut commands)
            }
            NotifierEvent::TaskFinished { task } => self.on_finished(task, &mut commands),
            NotifierEvent::TaskFailedFatally { task, message } => {
                info!(task = %task, "fatal task failure; stopping change notifier");
                commands.push(NotifierCommand::Exit {
                    error: Some(format!("task '{task}' failed: {message}")),
                });
                return NotifierStep {
                    commands,
                    keep_running: false,
                };
            }
            NotifierEvent::ShutdownRequested => {
                self.shutting_down = true;
                for slot in self.slots.values_mut() {
                    if matches!(slot.state, BindingState::Debouncing { .. }) {
                        slot.state = BindingState::Idle;
                    }
                }
            }
        }

        let keep_running = !(self.shutting_down && self.is_quiescent());
        if !keep_running {
            commands.push(NotifierCommand::Exit { error: None });
        }
        NotifierStep {
            commands,
            keep_running,
        }
    }

    fn on_changed(&mut self, task: TaskName, commands: &mut Vec<NotifierCommand>) {
        if self.shutting_down {
            return;
        }
        let debounce = self.debounce;
        let Some(slot) = self.slots.get_mut(&task) else {
            debug!(task = %task, "change for unbound task ignored");
            return;
        };

        match slot.state {
            BindingState::Idle | BindingState::Debouncing { .. } => {
                slot.generation += 1;
                slot.state = BindingState::Debouncing {
                    generation: slot.generation,
                };
                commands.push(NotifierCommand::ArmTimer {
                    task,
                    generation: slot.generation,
                    delay: debounce,
                });
            }
            BindingState::Firing { .. } => {
                slot.state = BindingState::Firing { pending: true };
            }
        }
    }

    fn on_elapsed(&mut self, task: TaskName, generation: u64, commands: &mut Vec<NotifierCommand>) {
        let Some(slot) = self.slots.get_mut(&task) else {
            return;
        };
        match slot.state {
            BindingState::Debouncing { generation: current } if current == generation => {
                slot.state = BindingState::Firing { pending: false };
                commands.push(NotifierCommand::RunTask { task });
            }
            _ => debug!(task = %task, generation, "stale debounce timer ignored"),
        }
    }

    fn on_finished(&mut self, task: TaskName, commands: &mut Vec<NotifierCommand>) {
        let debounce = self.debounce;
        let shutting_down = self.shutting_down;
        let Some(slot) = self.slots.get_mut(&task) else {
            return;
        };

        slot.state = match slot.state {
            BindingState::Firing { pending: true } if !shutting_down => {
                slot.generation += 1;
                commands.push(NotifierCommand::ArmTimer {
                    task,
                    generation: slot.generation,
                    delay: debounce,
                });
                BindingState::Debouncing {
                    generation: slot.generation,
                }
            }
            _ => BindingState::Idle,
        };
    }
}
