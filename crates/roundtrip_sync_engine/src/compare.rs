//! External comparison tool and pager.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from running the comparison tool or the pager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComparisonToolError {
    /// The tool exited with a status that signals trouble (2 or more for diff).
    #[error("Diff command failed: {stderr}")]
    Failed {
        /// What the tool wrote to stderr.
        stderr: String,
    },

    /// The tool ran past its deadline and was killed.
    #[error("Diff command timed out")]
    TimedOut,

    /// The program is not installed.
    #[error("Command not found: {program}")]
    NotFound {
        /// Program name.
        program: String,
    },

    /// Any other failure to run the tool.
    #[error("Error running diff: {0}")]
    Other(String),
}

/// Outcome of a successful comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Whether the inputs differ.
    pub has_differences: bool,
    /// The tool's report (empty when identical).
    pub output: String,
}

/// Compares two files or directory trees.
pub trait ComparisonTool: Send + Sync {
    /// Compares `left` against `right`.
    fn compare(&self, left: &Path, right: &Path) -> Result<Comparison, ComparisonToolError>;
}

/// Maps a diff-style exit status to a comparison outcome.
///
/// 0 means identical, 1 means different, anything else (including death by
/// signal) is a failure.
pub fn classify_exit(
    code: Option<i32>,
    stdout: String,
    stderr: String,
) -> Result<Comparison, ComparisonToolError> {
    match code {
        Some(0) => Ok(Comparison {
            has_differences: false,
            output: stdout,
        }),
        Some(1) => Ok(Comparison {
            has_differences: true,
            output: stdout,
        }),
        _ => Err(ComparisonToolError::Failed { stderr }),
    }
}

/// Runs an external program as `<program> <args...> <left> <right>`.
#[derive(Debug, Clone)]
pub struct DiffCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl DiffCommand {
    /// Creates a command with explicit arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Recursive colored unified diff of two mirror trees, ignoring metadata.
    pub fn trees(timeout: Duration) -> Self {
        Self::new(
            "diff",
            ["-urN", "--color=always", "--exclude=*.json"],
            timeout,
        )
    }

    /// Colored unified diff of two files.
    pub fn files(timeout: Duration) -> Self {
        Self::new("diff", ["-u", "--color=always"], timeout)
    }

    async fn run(&self, left: &Path, right: &Path) -> Result<Comparison, ComparisonToolError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(left)
            .arg(right)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(ComparisonToolError::TimedOut),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ComparisonToolError::NotFound {
                    program: self.program.clone(),
                })
            }
            Ok(Err(e)) => return Err(ComparisonToolError::Other(e.to_string())),
            Ok(Ok(output)) => output,
        };

        debug!(program = %self.program, status = ?output.status, "comparison finished");
        classify_exit(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    }
}

impl ComparisonTool for DiffCommand {
    fn compare(&self, left: &Path, right: &Path) -> Result<Comparison, ComparisonToolError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ComparisonToolError::Other(e.to_string()))?;
        runtime.block_on(self.run(left, right))
    }
}

/// Displays long text to the user.
pub trait Pager: Send + Sync {
    /// Shows `text`. Fails if the pager cannot start or exits non-zero.
    fn page(&self, text: &str) -> Result<(), ComparisonToolError>;
}

/// Pipes text into an external pager such as `less -R`.
#[derive(Debug, Clone)]
pub struct PagerCommand {
    argv: Vec<String>,
}

impl PagerCommand {
    /// Default pager when `$PAGER` is unset.
    pub const DEFAULT: &'static str = "less -R";

    /// Parses a command line, splitting on whitespace.
    pub fn new(command: &str) -> Self {
        Self {
            argv: command.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Uses `$PAGER`, falling back to [`DEFAULT`](Self::DEFAULT).
    pub fn from_env() -> Self {
        let command = std::env::var("PAGER")
            .ok()
            .filter(|pager| !pager.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT.to_string());
        Self::new(&command)
    }

    /// Returns the program and its arguments.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl Pager for PagerCommand {
    fn page(&self, text: &str) -> Result<(), ComparisonToolError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| ComparisonToolError::Other("empty pager command".into()))?;

        let mut child = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ComparisonToolError::NotFound {
                    program: program.clone(),
                },
                _ => ComparisonToolError::Other(e.to_string()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The pager may quit before reading everything.
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(ComparisonToolError::Other(e.to_string()));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| ComparisonToolError::Other(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ComparisonToolError::Failed {
                stderr: format!("pager exited with {status}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let same = classify_exit(Some(0), String::new(), String::new()).unwrap();
        assert!(!same.has_differences);

        let differ = classify_exit(Some(1), "+x\n".into(), String::new()).unwrap();
        assert!(differ.has_differences);
        assert_eq!(differ.output, "+x\n");

        let err = classify_exit(Some(2), String::new(), "No such file".into()).unwrap_err();
        assert_eq!(err.to_string(), "Diff command failed: No such file");

        assert!(classify_exit(None, String::new(), String::new()).is_err());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ComparisonToolError::NotFound {
                program: "diff".into()
            }
            .to_string(),
            "Command not found: diff"
        );
        assert_eq!(
            ComparisonToolError::Other("boom".into()).to_string(),
            "Error running diff: boom"
        );
    }

    #[test]
    fn missing_program() {
        let tool = DiffCommand::new(
            "roundtrip-no-such-diff-program",
            Vec::<String>::new(),
            Duration::from_secs(5),
        );
        let err = tool.compare(Path::new("a"), Path::new("b")).unwrap_err();
        assert_eq!(
            err,
            ComparisonToolError::NotFound {
                program: "roundtrip-no-such-diff-program".into()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn exit_one_reports_output() {
        let tool = DiffCommand::new(
            "sh",
            ["-c", "echo changed; exit 1", "sh"],
            Duration::from_secs(5),
        );
        let comparison = tool.compare(Path::new("a"), Path::new("b")).unwrap();
        assert!(comparison.has_differences);
        assert_eq!(comparison.output.trim(), "changed");
    }

    #[cfg(unix)]
    #[test]
    fn slow_tool_times_out() {
        let tool = DiffCommand::new("sh", ["-c", "sleep 5", "sh"], Duration::from_millis(100));
        let err = tool.compare(Path::new("a"), Path::new("b")).unwrap_err();
        assert_eq!(err, ComparisonToolError::TimedOut);
    }

    #[test]
    fn pager_command_parsing() {
        assert_eq!(PagerCommand::new("less -R").argv(), ["less", "-R"]);
        assert!(PagerCommand::new("  ").page("text").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn failing_pager_is_an_error() {
        assert!(PagerCommand::new("false").page("text").is_err());
        assert!(PagerCommand::new("cat").page("").is_ok());
    }
}
