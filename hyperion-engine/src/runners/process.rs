// Process Runner
// Spawns external programs with captured output and hard cancellation

use super::TaskError;

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Output collected from a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output lines joined with '\n'
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None when terminated by a signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `program` with `args` in `working_dir` until it exits or `cancel` fires.
///
/// Output is collected until every holder of the pipes is gone. On Unix the
/// process group is killed afterwards, so background children never outlive the task.
/// On cancellation the process is killed and reaped before `TaskError::Cancelled` is returned.
pub async fn run_process<I, S>(
    program: &str,
    args: I,
    working_dir: &Path,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, TaskError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if cancel.is_cancelled() {
        return Err(TaskError::Cancelled);
    }

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(working_dir);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| TaskError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let mut stdout_handle = child.stdout.take().map(collect_lines);
    let mut stderr_handle = child.stderr.take().map(collect_lines);
    #[cfg(unix)]
    let group = child.id();

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = cancel.cancelled() => None,
    };

    // Background children may keep the pipes open after the leader exits
    let output = match status {
        Some(_) => tokio::select! {
            output = async {
                let stdout = join_output(&mut stdout_handle).await;
                (stdout, join_output(&mut stderr_handle).await)
            } => Some(output),
            _ = cancel.cancelled() => None,
        },
        None => None,
    };

    #[cfg(unix)]
    if let Some(pid) = group {
        kill_process_group(pid);
    }

    match (status, output) {
        (Some(status), Some((stdout, stderr))) => {
            if !stderr.is_empty() {
                tracing::debug!(program, "stderr: {}", stderr);
            }
            Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code: status.code(),
            })
        }
        (status, _) => {
            if status.is_none() {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program, "failed to kill process: {}", e);
                }
            }
            for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
                handle.abort();
            }
            tracing::warn!(program, "process killed after cancellation");
            Err(TaskError::Cancelled)
        }
    }
}

fn collect_lines<R>(stream: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut output = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&line);
        }
        output
    })
}

async fn join_output(handle: &mut Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Kill whatever is left of the process group led by `pid` (children of a shell script included)
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(pid, "killed process group"),
        // group already gone
        Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!(pid, "could not signal process group: {}", e),
    }
}
