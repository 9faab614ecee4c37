use std::fmt;

/// Progress of a single [`crate::BatchRunner::verify`] call.
///
/// `Completed`, `TimedOut` and `Failed` are terminal; the next call starts over from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerState {
    #[default]
    Idle,
    Submitted,
    Completed,
    TimedOut,
    Failed,
}

impl RunnerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunnerState::Completed | RunnerState::TimedOut | RunnerState::Failed
        )
    }

    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Submitted => "submitted",
            RunnerState::Completed => "completed",
            RunnerState::TimedOut => "timed_out",
            RunnerState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
