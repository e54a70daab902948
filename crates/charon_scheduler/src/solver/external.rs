use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
};

use jiff::SignedDuration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Solver did not finish within {0:?}")]
    Timeout(SignedDuration),

    #[error("Solver did not write {0}")]
    MissingOutput(PathBuf),

    #[error("Cannot remove previous output {path}: {source}")]
    ClearOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Solves an exported subproblem file into a partial solution file.
pub trait SubproblemSolver {
    fn solve(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), SolverError>> + Send;
}

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Bytes of stderr kept in error messages.
const STDERR_TAIL: usize = 2048;

#[derive(Clone, Debug)]
pub struct ExternalSolverParams {
    pub program: PathBuf,
    /// Arguments, `{input}` and `{output}` are replaced by the file paths
    pub args: Vec<String>,
    pub timeout: SignedDuration,
    pub working_dir: Option<PathBuf>,
}

impl Default for ExternalSolverParams {
    fn default() -> Self {
        Self {
            program: PathBuf::from("mosel"),
            args: vec![
                String::from("exec"),
                String::from("HSP.mos"),
                format!("INPUT={INPUT_PLACEHOLDER}"),
                format!("OUTPUT={OUTPUT_PLACEHOLDER}"),
            ],
            timeout: SignedDuration::from_hours(1),
            working_dir: None,
        }
    }
}

/// Runs a solver executable as a child process, killed when the timeout expires.
#[derive(Clone, Debug)]
pub struct ExternalSolver {
    params: ExternalSolverParams,
}

impl ExternalSolver {
    pub fn new(params: ExternalSolverParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ExternalSolverParams {
        &self.params
    }

    fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();

        self.params
            .args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    #[instrument(skip_all, level = "debug")]
    async fn run(&self, input: &Path, output: &Path) -> Result<(), SolverError> {
        // A file left by an earlier run must not pass for this run's output.
        match tokio::fs::remove_file(output).await {
            Ok(()) => debug!("Removed previous output {}", output.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SolverError::ClearOutput {
                    path: output.to_path_buf(),
                    source,
                });
            }
        }

        let args = self.arguments(input, output);
        debug!("Running {} {}", self.params.program.display(), args.join(" "));

        let mut command = Command::new(&self.params.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(working_dir) = &self.params.working_dir {
            command.current_dir(working_dir);
        }

        let child = command.spawn().map_err(|source| SolverError::Spawn {
            program: self.params.program.display().to_string(),
            source,
        })?;

        let timeout = self
            .params
            .timeout
            .try_into()
            .unwrap_or(std::time::Duration::ZERO);
        // Dropping the future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| SolverError::Timeout(self.params.timeout))?;
        let result = result.map_err(|source| SolverError::Spawn {
            program: self.params.program.display().to_string(),
            source,
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL);
            let start = (start..stderr.len())
                .find(|&index| stderr.is_char_boundary(index))
                .unwrap_or(stderr.len());

            return Err(SolverError::Failed {
                status: result.status.to_string(),
                stderr: stderr[start..].trim().to_owned(),
            });
        }

        if !output.exists() {
            return Err(SolverError::MissingOutput(output.to_path_buf()));
        }

        info!("Solver wrote {}", output.display());
        Ok(())
    }
}

impl SubproblemSolver for ExternalSolver {
    fn solve(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), SolverError>> + Send {
        self.run(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str, timeout: SignedDuration) -> ExternalSolver {
        ExternalSolver::new(ExternalSolverParams {
            program: PathBuf::from("sh"),
            args: vec![String::from("-c"), script.to_owned()],
            timeout,
            working_dir: None,
        })
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("charon-solver-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_placeholders_are_replaced() {
        let solver = ExternalSolver::new(ExternalSolverParams::default());
        let args = solver.arguments(Path::new("in.txt"), Path::new("out.txt"));

        assert_eq!(args, vec!["exec", "HSP.mos", "INPUT=in.txt", "OUTPUT=out.txt"]);
    }

    #[tokio::test]
    async fn test_successful_run() {
        let input = temp_path("copy-in.txt");
        let output = temp_path("copy-out.txt");
        std::fs::write(&input, "Duties: []\n").unwrap();

        shell("cp {input} {output}", SignedDuration::from_secs(10))
            .solve(&input, &output)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Duties: []\n");
        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&output).unwrap();
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let result = shell("echo infeasible >&2; exit 3", SignedDuration::from_secs(10))
            .solve(&temp_path("unused-in"), &temp_path("unused-out"))
            .await;

        match result {
            Err(SolverError::Failed { stderr, .. }) => assert_eq!(stderr, "infeasible"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let result = shell("sleep 5", SignedDuration::from_millis(100))
            .solve(&temp_path("unused-in"), &temp_path("unused-out"))
            .await;

        assert!(matches!(result, Err(SolverError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_output() {
        let output = temp_path("never-written");
        let result = shell("true", SignedDuration::from_secs(10))
            .solve(&temp_path("unused-in"), &output)
            .await;

        assert!(matches!(result, Err(SolverError::MissingOutput(path)) if path == output));
    }

    #[tokio::test]
    async fn test_previous_output_is_not_reused() {
        let output = temp_path("left-over.solution.txt");
        std::fs::write(&output, "Duties: [(\"0\") [\"3\"]]\n").unwrap();

        let result = shell("true", SignedDuration::from_secs(10))
            .solve(&temp_path("unused-in"), &output)
            .await;

        assert!(matches!(result, Err(SolverError::MissingOutput(path)) if path == output));
        assert!(!output.exists());
    }
}
