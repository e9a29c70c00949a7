// File Runner
// Copies and writes files with templated paths and content

use super::{TaskError, TaskOutput};
use crate::tasks::{CopyFileTask, FileOptions, WriteFileTask};
use crate::template::{render, TemplateContext};

use std::path::{Path, PathBuf};

/// File runner for copy-file and write-file tasks
pub struct FileRunner {
    working_dir: PathBuf,
}

impl FileRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    fn resolve(&self, template: &str, context: &TemplateContext<'_>) -> Result<PathBuf, TaskError> {
        resolve_path(&self.working_dir, template, context)
    }

    /// Copy a file; the output is the final destination path
    pub async fn copy(
        &self,
        task: &CopyFileTask,
        context: &TemplateContext<'_>,
    ) -> Result<TaskOutput, TaskError> {
        let source = self.resolve(&task.source, context)?;
        let destination = self.resolve(&task.destination, context)?;

        if !source.is_file() {
            return Err(TaskError::Invalid(format!(
                "source '{}' is not a regular file",
                source.display()
            )));
        }

        if task.options.ensure_path {
            let directory = if task.destination_is_directory {
                Some(destination.as_path())
            } else {
                destination.parent()
            };
            if let Some(directory) = directory {
                tokio::fs::create_dir_all(directory).await?;
            }
        }

        let target = match (task.destination_is_directory, source.file_name()) {
            (true, Some(name)) => destination.join(name),
            _ => destination,
        };
        check_overwrite(&target, task.options)?;

        tracing::info!("copying {} to {}", source.display(), target.display());
        tokio::fs::copy(&source, &target).await?;
        Ok(TaskOutput::succeeded(target.display().to_string()))
    }

    /// Write rendered content; the output is the destination path
    pub async fn write(
        &self,
        task: &WriteFileTask,
        context: &TemplateContext<'_>,
    ) -> Result<TaskOutput, TaskError> {
        let content = render(&task.content, context)?;
        let destination = self.resolve(&task.destination, context)?;
        check_overwrite(&destination, task.options)?;
        prepare_parent(&destination, task.options).await?;

        tracing::info!("writing file {}", destination.display());
        tokio::fs::write(&destination, content).await?;
        Ok(TaskOutput::succeeded(destination.display().to_string()))
    }
}

/// Render a path template and resolve it against `working_dir`
pub(crate) fn resolve_path(
    working_dir: &Path,
    template: &str,
    context: &TemplateContext<'_>,
) -> Result<PathBuf, TaskError> {
    let rendered = render(template, context)?;
    let rendered = rendered.trim();
    if rendered.is_empty() {
        return Err(TaskError::Invalid(format!(
            "path '{}' renders to an empty string",
            template
        )));
    }
    Ok(working_dir.join(rendered))
}

pub(crate) fn check_overwrite(target: &Path, options: FileOptions) -> Result<(), TaskError> {
    if !options.overwrite && target.is_file() {
        return Err(TaskError::Invalid(format!(
            "'{}' exists and overwrite is disabled",
            target.display()
        )));
    }
    Ok(())
}

/// Create the parent of `destination` with `ensure_path`, otherwise require it to exist
pub(crate) async fn prepare_parent(destination: &Path, options: FileOptions) -> Result<(), TaskError> {
    if let Some(parent) = destination.parent() {
        if options.ensure_path {
            tokio::fs::create_dir_all(parent).await?;
        } else if !parent.is_dir() {
            return Err(TaskError::Invalid(format!(
                "directory '{}' does not exist",
                parent.display()
            )));
        }
    }
    Ok(())
}
