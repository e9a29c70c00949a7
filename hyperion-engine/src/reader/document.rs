// Document Reader
// Reads YAML documents into the executable Document graph

use crate::execution::{Document, TaskGroup};
use crate::model::{MatrixParameters, Value, Variable};
use crate::reader::error::{ParseError, ParseErrorKind, ParseResult};
use crate::tasks::{
    CopyFileTask, DockerContainerTask, DockerImageTask, DownloadTask, FileOptions, Interpreter,
    Platform, ScriptTask, Task, TaskKind, WriteFileTask, XslTransformTask,
};

use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    model: Option<Value>,
    #[serde(default)]
    matrix: Vec<MatrixParameters>,
    taskgroups: Vec<RawTaskGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTaskGroup {
    title: String,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    tasks: Vec<RawTask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawTaskType {
    Shell,
    Batch,
    Powershell,
    Python,
    Groovy,
    Jshell,
    DockerContainer,
    DockerImage,
    CopyFile,
    WriteFile,
    Download,
    XslTransform,
}

/// Every field a task may carry; which ones apply depends on `type`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawTask {
    #[serde(rename = "type")]
    task_type: RawTaskType,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, rename = "with")]
    with_values: Vec<Value>,
    variable: Option<RawVariable>,

    code: Option<String>,
    image_name: Option<String>,
    image_version: Option<String>,
    platform: Option<Platform>,
    repository_tag: Option<String>,
    source: Option<String>,
    destination: Option<String>,
    destination_is_directory: Option<bool>,
    overwrite: Option<bool>,
    ensure_path: Option<bool>,
    content: Option<String>,
    url: Option<String>,
    xsl: Option<String>,
    xml: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawVariable {
    name: String,
    #[serde(default = "default_regex")]
    regex: String,
    #[serde(default)]
    group: usize,
    #[serde(default)]
    line_by_line: bool,
}

fn default_regex() -> String {
    Variable::DEFAULT_REGEX.to_string()
}

/// Reads documents from files, text or bytes
pub struct DocumentReader;

impl DocumentReader {
    /// Read a document from a YAML file
    pub fn read_file<P: AsRef<Path>>(path: P) -> ParseResult<Document> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ParseError::io(path, &e))?;
        tracing::debug!("reading document {}", path.display());
        Self::read_str(&content)
    }

    /// Read a document from raw bytes (must be UTF-8)
    pub fn read_slice(bytes: &[u8]) -> ParseResult<Document> {
        let content = std::str::from_utf8(bytes).map_err(|e| {
            ParseError::new(
                format!("document is not valid UTF-8: {}", e),
                ParseErrorKind::InvalidValue,
            )
        })?;
        Self::read_str(content)
    }

    /// Read a document from YAML text
    pub fn read_str(content: &str) -> ParseResult<Document> {
        let raw: RawDocument =
            serde_yaml::from_str(content).map_err(|e| ParseError::from_yaml_error(&e, content))?;

        let model = match raw.model {
            None => Value::empty_map(),
            Some(model @ Value::Map(_)) => model,
            Some(_) => {
                return Err(ParseError::new(
                    "'model' must be a map of attributes",
                    ParseErrorKind::InvalidSchema,
                ))
            }
        };

        let mut document = Document::new(model);
        document.matrix = raw.matrix;
        for (group_index, raw_group) in raw.taskgroups.into_iter().enumerate() {
            let mut group = TaskGroup::new(raw_group.title, raw_group.parallel);
            for (task_index, raw_task) in raw_group.tasks.into_iter().enumerate() {
                let location = format!("taskgroups[{}].tasks[{}]", group_index, task_index);
                group.add(raw_task.into_task(&location)?);
            }
            document.task_groups.push(group);
        }

        tracing::debug!(
            "read document with {} task group(s) and {} matrix entries",
            document.task_groups.len(),
            document.matrix.len()
        );
        Ok(document)
    }
}

impl RawTaskType {
    fn name(&self) -> &'static str {
        match self {
            RawTaskType::Shell => "shell",
            RawTaskType::Batch => "batch",
            RawTaskType::Powershell => "powershell",
            RawTaskType::Python => "python",
            RawTaskType::Groovy => "groovy",
            RawTaskType::Jshell => "jshell",
            RawTaskType::DockerContainer => "docker-container",
            RawTaskType::DockerImage => "docker-image",
            RawTaskType::CopyFile => "copy-file",
            RawTaskType::WriteFile => "write-file",
            RawTaskType::Download => "download",
            RawTaskType::XslTransform => "xsl-transform",
        }
    }

    /// Kind-specific fields accepted by this type
    fn fields(&self) -> &'static [&'static str] {
        match self {
            RawTaskType::Shell
            | RawTaskType::Batch
            | RawTaskType::Powershell
            | RawTaskType::Python
            | RawTaskType::Groovy
            | RawTaskType::Jshell => &["code"],
            RawTaskType::DockerContainer => &["code", "image-name", "image-version", "platform"],
            RawTaskType::DockerImage => &["code", "repository-tag"],
            RawTaskType::CopyFile => &[
                "source",
                "destination",
                "destination-is-directory",
                "overwrite",
                "ensure-path",
            ],
            RawTaskType::WriteFile => &["content", "destination", "overwrite", "ensure-path"],
            RawTaskType::Download => &["url", "destination", "overwrite", "ensure-path"],
            RawTaskType::XslTransform => &["xsl", "xml"],
        }
    }

    fn interpreter(&self) -> Option<Interpreter> {
        match self {
            RawTaskType::Shell => Some(Interpreter::Shell),
            RawTaskType::Batch => Some(Interpreter::Batch),
            RawTaskType::Powershell => Some(Interpreter::PowerShell),
            RawTaskType::Python => Some(Interpreter::Python),
            RawTaskType::Groovy => Some(Interpreter::Groovy),
            RawTaskType::Jshell => Some(Interpreter::JShell),
            _ => None,
        }
    }
}

impl RawTask {
    /// Kind-specific fields present in the document
    fn present_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("code", self.code.is_some()),
            ("image-name", self.image_name.is_some()),
            ("image-version", self.image_version.is_some()),
            ("platform", self.platform.is_some()),
            ("repository-tag", self.repository_tag.is_some()),
            ("source", self.source.is_some()),
            ("destination", self.destination.is_some()),
            ("destination-is-directory", self.destination_is_directory.is_some()),
            ("overwrite", self.overwrite.is_some()),
            ("ensure-path", self.ensure_path.is_some()),
            ("content", self.content.is_some()),
            ("url", self.url.is_some()),
            ("xsl", self.xsl.is_some()),
            ("xml", self.xml.is_some()),
        ];
        fields
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| name)
            .collect()
    }

    fn into_task(self, location: &str) -> ParseResult<Task> {
        let type_name = self.task_type.name();
        let allowed = self.task_type.fields();
        if let Some(field) = self
            .present_fields()
            .into_iter()
            .find(|field| !allowed.contains(field))
        {
            return Err(ParseError::new(
                format!(
                    "{}: field '{}' is not allowed for task type '{}'",
                    location, field, type_name
                ),
                ParseErrorKind::UnknownField,
            )
            .with_suggestion(format!(
                "'{}' tasks accept: {}",
                type_name,
                allowed.join(", ")
            )));
        }

        let required = |field: Option<String>, name: &str| {
            field.ok_or_else(|| {
                ParseError::new(
                    format!(
                        "{}: missing required field '{}' for task type '{}'",
                        location, name, type_name
                    ),
                    ParseErrorKind::MissingField,
                )
            })
        };

        let options = FileOptions {
            overwrite: self.overwrite.unwrap_or(false),
            ensure_path: self.ensure_path.unwrap_or(false),
        };

        let kind = match self.task_type {
            RawTaskType::DockerContainer => TaskKind::DockerContainer(DockerContainerTask {
                code: required(self.code, "code")?,
                image_name: required(self.image_name, "image-name")?,
                image_version: self
                    .image_version
                    .unwrap_or_else(|| DockerContainerTask::DEFAULT_VERSION.to_string()),
                platform: self.platform.unwrap_or_default(),
            }),
            RawTaskType::DockerImage => TaskKind::DockerImage(DockerImageTask {
                code: required(self.code, "code")?,
                repository_tag: required(self.repository_tag, "repository-tag")?,
            }),
            RawTaskType::CopyFile => TaskKind::CopyFile(CopyFileTask {
                source: required(self.source, "source")?,
                destination: required(self.destination, "destination")?,
                destination_is_directory: self.destination_is_directory.unwrap_or(true),
                options,
            }),
            RawTaskType::WriteFile => TaskKind::WriteFile(WriteFileTask {
                content: required(self.content, "content")?,
                destination: required(self.destination, "destination")?,
                options,
            }),
            RawTaskType::Download => {
                let url = required(self.url, "url")?;
                let url = Url::parse(&url).map_err(|e| {
                    ParseError::new(
                        format!("{}: invalid url '{}': {}", location, url, e),
                        ParseErrorKind::InvalidValue,
                    )
                })?;
                TaskKind::Download(DownloadTask {
                    url,
                    destination: required(self.destination, "destination")?,
                    options,
                })
            }
            RawTaskType::XslTransform => TaskKind::XslTransform(XslTransformTask {
                xsl: required(self.xsl, "xsl")?,
                xml: required(self.xml, "xml")?,
            }),
            script => match script.interpreter() {
                Some(interpreter) => {
                    TaskKind::Script(ScriptTask::new(interpreter, required(self.code, "code")?))
                }
                None => {
                    return Err(ParseError::new(
                        format!("{}: unsupported task type '{}'", location, type_name),
                        ParseErrorKind::InvalidValue,
                    ))
                }
            },
        };

        let variable = match self.variable {
            Some(raw) => raw.into_variable(location)?,
            None => Variable::default(),
        };

        let mut task = Task::new(kind)
            .with_title(self.title)
            .with_values(self.with_values)
            .with_variable(variable);
        task.tags = self.tags.into_iter().collect::<BTreeSet<_>>();
        Ok(task)
    }
}

impl RawVariable {
    fn into_variable(self, location: &str) -> ParseResult<Variable> {
        if let Err(e) = Regex::new(&self.regex) {
            return Err(ParseError::new(
                format!("{}: invalid variable regex '{}': {}", location, self.regex, e),
                ParseErrorKind::InvalidValue,
            ));
        }

        Ok(Variable::new(self.name)
            .with_regex(self.regex)
            .with_group(self.group)
            .with_line_by_line(self.line_by_line))
    }
}
