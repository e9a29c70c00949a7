// Task Kinds
// Kind-specific payloads selected by the document's `type` field

use reqwest::Url;
use serde::Deserialize;

/// Kind-specific part of a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Script handed to a local interpreter
    Script(ScriptTask),
    /// Script run inside a Docker container
    DockerContainer(DockerContainerTask),
    /// Docker image built from a Dockerfile
    DockerImage(DockerImageTask),
    CopyFile(CopyFileTask),
    WriteFile(WriteFileTask),
    /// File fetched over HTTP
    Download(DownloadTask),
    XslTransform(XslTransformTask),
}

impl TaskKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            TaskKind::Script(task) => task.interpreter.type_name(),
            TaskKind::DockerContainer(_) => "docker-container",
            TaskKind::DockerImage(_) => "docker-image",
            TaskKind::CopyFile(_) => "copy-file",
            TaskKind::WriteFile(_) => "write-file",
            TaskKind::Download(_) => "download",
            TaskKind::XslTransform(_) => "xsl-transform",
        }
    }
}

/// Local script interpreters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    /// POSIX shell
    Shell,
    /// Windows batch (cmd)
    Batch,
    /// PowerShell (powershell on Windows, pwsh elsewhere)
    PowerShell,
    Python,
    Groovy,
    JShell,
}

impl Interpreter {
    pub fn type_name(&self) -> &'static str {
        match self {
            Interpreter::Shell => "shell",
            Interpreter::Batch => "batch",
            Interpreter::PowerShell => "powershell",
            Interpreter::Python => "python",
            Interpreter::Groovy => "groovy",
            Interpreter::JShell => "jshell",
        }
    }

    /// File extensions recognised when `code` names a script file; the first is used for temp files
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Interpreter::Shell => &["sh"],
            Interpreter::Batch => &["cmd", "bat"],
            Interpreter::PowerShell => &["ps1"],
            Interpreter::Python => &["py"],
            Interpreter::Groovy => &["groovy"],
            Interpreter::JShell => &["jsh"],
        }
    }
}

/// Inline code or a script path for a local interpreter
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptTask {
    pub interpreter: Interpreter,
    pub code: String,
}

impl ScriptTask {
    pub fn new(interpreter: Interpreter, code: impl Into<String>) -> Self {
        Self {
            interpreter,
            code: code.into(),
        }
    }
}

/// Container platform, decides the in-container shell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Unix,
    Windows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockerContainerTask {
    pub code: String,
    pub image_name: String,
    pub image_version: String,
    pub platform: Platform,
}

impl DockerContainerTask {
    pub const DEFAULT_VERSION: &'static str = "latest";

    pub fn image(&self) -> String {
        format!("{}:{}", self.image_name, self.image_version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockerImageTask {
    /// Dockerfile content or path
    pub code: String,
    pub repository_tag: String,
}

/// Options shared by tasks writing files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Replace an existing destination
    pub overwrite: bool,
    /// Create missing parent directories
    pub ensure_path: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyFileTask {
    pub source: String,
    pub destination: String,
    /// Destination names a directory receiving the source file name
    pub destination_is_directory: bool,
    pub options: FileOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteFileTask {
    pub content: String,
    pub destination: String,
    pub options: FileOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Source address, validated when the document is read
    pub url: Url,
    pub destination: String,
    pub options: FileOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XslTransformTask {
    /// Stylesheet text or path
    pub xsl: String,
    /// Document text or path
    pub xml: String,
}
