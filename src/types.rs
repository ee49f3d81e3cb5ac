use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Where source maps produced by the `js` and `sass` chains end up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Write `<output>.map` next to the output and link it with a
    /// `sourceMappingURL` comment.
    #[default]
    File,
    /// Embed the map as a base64 data URL in the output itself.
    Inline,
}

/// Outcome of a single task run, as seen by the notifier and the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task ran but some files failed; the count is the number of failures.
    PartialFailure(usize),
}
