// Script Runner
// Executes shell, batch, powershell, python, groovy and jshell tasks

use super::{require_tool, resolve_source, run_process, write_temp_file, TaskError, TaskOutput};
use crate::tasks::{Interpreter, ScriptTask};
use crate::template::{render, TemplateContext};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

impl Interpreter {
    /// Program and arguments that execute the script at `path`
    fn command(&self, path: &Path) -> (String, Vec<OsString>) {
        let file = path.as_os_str().to_os_string();
        match self {
            Interpreter::Shell => ("sh".to_string(), vec![file]),
            Interpreter::Batch => ("cmd".to_string(), vec!["/q".into(), "/c".into(), file]),
            Interpreter::PowerShell => {
                let program = if cfg!(target_os = "windows") {
                    "powershell"
                } else {
                    // Fall back to pwsh on non-Windows
                    "pwsh"
                };
                (
                    program.to_string(),
                    vec!["-NoLogo".into(), "-NoProfile".into(), "-File".into(), file],
                )
            }
            Interpreter::Python => {
                let program = if require_tool("python3").is_ok() {
                    "python3"
                } else {
                    "python"
                };
                (program.to_string(), vec![file])
            }
            Interpreter::Groovy => ("groovy".to_string(), vec![file]),
            Interpreter::JShell => ("jshell".to_string(), vec!["-q".into(), file]),
        }
    }

    /// Adjust rendered source before it is written out
    fn finish_source(&self, mut source: String) -> String {
        if *self == Interpreter::JShell {
            if !source.ends_with('\n') {
                source.push('\n');
            }
            source.push_str("/exit\n");
        }
        source
    }
}

/// Script runner for local interpreters
pub struct ScriptRunner {
    working_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Render the script, write it to a temporary file and run the interpreter on it
    pub async fn run(
        &self,
        task: &ScriptTask,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        let interpreter = task.interpreter;
        let source = resolve_source(&task.code, interpreter.extensions(), &self.working_dir).await?;
        let script = interpreter.finish_source(render(&source, context)?);

        let extension = interpreter.extensions().first().copied().unwrap_or("txt");
        let path = write_temp_file("hyperion-script-", extension, &script).await?;

        let (program, args) = interpreter.command(&path);
        tracing::debug!(
            interpreter = interpreter.type_name(),
            "running {} {}",
            program,
            path.display()
        );

        let output = run_process(&program, args, &self.working_dir, cancel).await?;
        if !output.success() {
            tracing::warn!(
                interpreter = interpreter.type_name(),
                exit_code = ?output.exit_code,
                "script failed"
            );
        }
        Ok(output.into())
    }
}
