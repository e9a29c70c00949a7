// Download Runner
// Fetches files over HTTP into templated destinations

use super::file::{check_overwrite, prepare_parent, resolve_path};
use super::{TaskError, TaskOutput};
use crate::tasks::DownloadTask;
use crate::template::TemplateContext;

use reqwest::{Client, Url};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Runner for download tasks
pub struct DownloadRunner {
    client: Client,
    working_dir: PathBuf,
}

impl DownloadRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            working_dir,
        }
    }

    /// Fetch the task url into the rendered destination; the output is the destination path
    pub async fn run(
        &self,
        task: &DownloadTask,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        let destination = resolve_path(&self.working_dir, &task.destination, context)?;
        check_overwrite(&destination, task.options)?;
        prepare_parent(&destination, task.options).await?;

        tracing::info!(url = %task.url, "downloading to {}", destination.display());
        let body = tokio::select! {
            body = self.fetch(&task.url) => body?,
            _ = cancel.cancelled() => return Err(TaskError::Cancelled),
        };

        tokio::fs::write(&destination, &body).await?;
        tracing::debug!("wrote {} bytes to {}", body.len(), destination.display());
        Ok(TaskOutput::succeeded(destination.display().to_string()))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
