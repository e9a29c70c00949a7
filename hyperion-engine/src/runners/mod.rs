// Runners Module
// Executes task kinds: scripts, containers, file operations, downloads and XSL transforms

pub mod container;
pub mod download;
pub mod file;
pub mod process;
pub mod script;
pub mod xsl;

// Re-export key types
pub use container::ContainerRunner;
pub use download::DownloadRunner;
pub use file::FileRunner;
pub use process::{run_process, ProcessOutput};
pub use script::ScriptRunner;
pub use xsl::XslRunner;

use crate::tasks::TaskKind;
use crate::template::{RenderError, TemplateContext};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result of one task invocation as seen by the executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Text handed to the task variable
    pub text: String,
    /// Exit indicator of the invocation
    pub success: bool,
}

impl TaskOutput {
    pub fn succeeded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

impl From<ProcessOutput> for TaskOutput {
    fn from(output: ProcessOutput) -> Self {
        let success = output.success();
        Self {
            text: output.stdout,
            success,
        }
    }
}

/// Failures that prevent a task from producing output
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("required tool '{0}' was not found on PATH")]
    ToolMissing(String),

    #[error("invalid task: {0}")]
    Invalid(String),

    #[error("task cancelled")]
    Cancelled,

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for task runners
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    /// Render and execute one invocation of `kind`
    async fn run(
        &self,
        kind: &TaskKind,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError>;
}

/// Runner registry dispatching every task kind to its runner
pub struct RunnerRegistry {
    script: ScriptRunner,
    container: ContainerRunner,
    file: FileRunner,
    download: DownloadRunner,
    xsl: XslRunner,
}

impl RunnerRegistry {
    /// Create a registry resolving relative paths against the current directory
    pub fn new() -> Self {
        Self::with_working_dir(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn with_working_dir(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self {
            script: ScriptRunner::new(working_dir.clone()),
            container: ContainerRunner::new(working_dir.clone()),
            file: FileRunner::new(working_dir.clone()),
            download: DownloadRunner::new(working_dir.clone()),
            xsl: XslRunner::new(working_dir),
        }
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Runner for RunnerRegistry {
    async fn run(
        &self,
        kind: &TaskKind,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        match kind {
            TaskKind::Script(task) => self.script.run(task, context, cancel).await,
            TaskKind::DockerContainer(task) => {
                self.container.run_container(task, context, cancel).await
            }
            TaskKind::DockerImage(task) => self.container.build_image(task, context, cancel).await,
            TaskKind::CopyFile(task) => self.file.copy(task, context).await,
            TaskKind::WriteFile(task) => self.file.write(task, context).await,
            TaskKind::Download(task) => self.download.run(task, context, cancel).await,
            TaskKind::XslTransform(task) => self.xsl.run(task, context, cancel).await,
        }
    }
}

/// Read `code` as a file when it names an existing regular file with one of
/// `extensions` (any extension when empty), otherwise return it as inline text
pub(crate) async fn resolve_source(
    code: &str,
    extensions: &[&str],
    working_dir: &Path,
) -> Result<String, TaskError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return Ok(code.to_string());
    }

    let path = working_dir.join(trimmed);
    let extension_matches = extensions.is_empty()
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));

    if extension_matches && path.is_file() {
        tracing::debug!("reading task source from {}", path.display());
        return Ok(tokio::fs::read_to_string(&path).await?);
    }

    Ok(code.to_string())
}

/// Write `content` to a temporary file removed when the returned path drops
pub(crate) async fn write_temp_file(
    prefix: &str,
    extension: &str,
    content: &str,
) -> Result<tempfile::TempPath, TaskError> {
    let suffix = format!(".{}", extension);
    let path = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(&suffix)
        .tempfile()?
        .into_temp_path();
    tokio::fs::write(&path, content).await?;
    Ok(path)
}

/// Locate an external tool on PATH
pub(crate) fn require_tool(name: &str) -> Result<PathBuf, TaskError> {
    which::which(name).map_err(|_| TaskError::ToolMissing(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_resolve_inline_source() {
        let dir = TempDir::new().unwrap();
        let source = resolve_source("echo hello", &["sh"], dir.path()).await.unwrap();
        assert_eq!(source, "echo hello");
    }

    #[tokio::test]
    async fn test_resolve_file_source() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.sh"), "echo from file").unwrap();

        let source = resolve_source("build.sh", &["sh"], dir.path()).await.unwrap();
        assert_eq!(source, "echo from file");

        // wrong extension keeps the text inline
        let source = resolve_source("build.sh", &["py"], dir.path()).await.unwrap();
        assert_eq!(source, "build.sh");
    }

    #[tokio::test]
    async fn test_write_temp_file_removed_on_drop() {
        let path = write_temp_file("hyperion-test-", "txt", "content").await.unwrap();
        let location = path.to_path_buf();
        assert_eq!(std::fs::read_to_string(&location).unwrap(), "content");
        assert!(location.to_string_lossy().ends_with(".txt"));

        drop(path);
        assert!(!location.exists());
    }

    #[test]
    fn test_task_output_from_process() {
        let output = TaskOutput::from(ProcessOutput {
            stdout: "hello".to_string(),
            stderr: String::new(),
            exit_code: Some(1),
        });
        assert_eq!(output, TaskOutput::failed("hello"));
    }

    #[test]
    fn test_missing_tool() {
        let result = require_tool("hyperion-definitely-not-installed");
        assert!(matches!(result, Err(TaskError::ToolMissing(_))));
    }
}
