// Container Runner
// Executes scripts inside Docker containers and builds Docker images

use super::{require_tool, resolve_source, run_process, write_temp_file, TaskError, TaskOutput};
use crate::tasks::{DockerContainerTask, DockerImageTask, Platform};
use crate::template::{render, TemplateContext};

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Mount point of the working directory inside the container
const WORK_MOUNT: &str = "/work";
/// Mount point of the temporary script directory inside the container
const SCRIPT_MOUNT: &str = "/hosttmp";

impl Platform {
    fn script_extension(&self) -> &'static str {
        match self {
            Platform::Unix => "sh",
            Platform::Windows => "cmd",
        }
    }

    /// In-container command running `script`
    fn shell_command(&self, script: &str) -> Vec<String> {
        match self {
            Platform::Unix => vec!["sh".to_string(), script.to_string()],
            Platform::Windows => vec!["cmd".to_string(), "/C".to_string(), script.to_string()],
        }
    }
}

/// Container runner driving the docker CLI
pub struct ContainerRunner {
    working_dir: PathBuf,
}

impl ContainerRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Run the rendered script inside `image-name:image-version`
    pub async fn run_container(
        &self,
        task: &DockerContainerTask,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        if task.image_name.trim().is_empty() {
            return Err(TaskError::Invalid("docker image name not specified".to_string()));
        }
        require_tool("docker")?;

        let extension = task.platform.script_extension();
        let source = resolve_source(&task.code, &[extension], &self.working_dir).await?;
        let script = render(&source, context)?;
        let path = write_temp_file("hyperion-docker-container-", extension, &script).await?;

        let args = container_args(task, &self.working_dir, &path)?;
        tracing::info!(image = %task.image(), "running docker container");
        let output = run_process("docker", &args, &self.working_dir, cancel).await?;
        Ok(output.into())
    }

    /// Build an image tagged `repository-tag` from the rendered Dockerfile
    pub async fn build_image(
        &self,
        task: &DockerImageTask,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        if task.repository_tag.trim().is_empty() {
            return Err(TaskError::Invalid("image tag not specified".to_string()));
        }
        require_tool("docker")?;

        let source = resolve_source(&task.code, &[], &self.working_dir).await?;
        let dockerfile = render(&source, context)?;
        let path = write_temp_file("hyperion-docker-image-", "dockerfile", &dockerfile).await?;

        let args = image_args(task, &path);
        tracing::info!(tag = %task.repository_tag, "building docker image");
        let output = run_process("docker", &args, &self.working_dir, cancel).await?;
        Ok(output.into())
    }
}

fn container_args(
    task: &DockerContainerTask,
    working_dir: &Path,
    script: &Path,
) -> Result<Vec<String>, TaskError> {
    let (Some(script_dir), Some(file_name)) = (script.parent(), script.file_name()) else {
        return Err(TaskError::Invalid(format!(
            "invalid container script path '{}'",
            script.display()
        )));
    };

    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:{}", working_dir.display(), WORK_MOUNT),
        "-v".to_string(),
        format!("{}:{}", script_dir.display(), SCRIPT_MOUNT),
        "-w".to_string(),
        WORK_MOUNT.to_string(),
        "-i".to_string(),
        task.image(),
    ];
    let in_container = format!("{}/{}", SCRIPT_MOUNT, file_name.to_string_lossy());
    args.extend(task.platform.shell_command(&in_container));
    Ok(args)
}

fn image_args(task: &DockerImageTask, dockerfile: &Path) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        task.repository_tag.clone(),
        "-f".to_string(),
        dockerfile.display().to_string(),
        ".".to_string(),
    ]
}
