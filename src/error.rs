//! Process exit codes.

/// Exit codes reported by the `dupehunt` binary.
///
/// - 0: the run completed (finding nothing is still success)
/// - 1: configuration error or fatal runtime error
/// - 130: interrupted by Ctrl+C (128 + SIGINT)
///
/// Per-file I/O errors are logged and never change the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// The run completed normally.
    Success = 0,
    /// Invalid configuration or a fatal runtime failure.
    Error = 1,
    /// The run was interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// The numeric process exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
