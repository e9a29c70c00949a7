// Tasks
// Task definitions: common attributes plus the kind-specific payload

pub mod kinds;

pub use kinds::{
    CopyFileTask, DockerContainerTask, DockerImageTask, DownloadTask, FileOptions, Interpreter,
    Platform, ScriptTask, TaskKind, WriteFileTask, XslTransformTask,
};

use crate::model::{Value, Variable};

use std::collections::BTreeSet;

/// One executable unit of a task group
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Title, rendered for log output
    pub title: String,
    pub kind: TaskKind,
    pub tags: BTreeSet<String>,
    /// One invocation per entry; empty means a single invocation
    pub with_values: Vec<Value>,
    /// Extraction rule applied to the task output
    pub variable: Variable,
}

impl Task {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            title: String::new(),
            kind,
            tags: BTreeSet::new(),
            with_values: Vec::new(),
            variable: Variable::default(),
        }
    }

    /// Shell task with inline code
    pub fn shell(code: impl Into<String>) -> Self {
        Self::new(TaskKind::Script(ScriptTask::new(Interpreter::Shell, code)))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.with_values = values;
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variable = variable;
        self
    }

    /// A task runs when no tags are requested or it carries one of them
    pub fn is_selected(&self, tags: &BTreeSet<String>) -> bool {
        tags.is_empty() || !self.tags.is_disjoint(tags)
    }

    /// Document type name of this task
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selection_without_filter() {
        let task = Task::shell("true");
        assert!(task.is_selected(&tags(&[])));

        let tagged = Task::shell("true").with_tag("a");
        assert!(tagged.is_selected(&tags(&[])));
    }

    #[test]
    fn test_selection_with_filter() {
        let task = Task::shell("true").with_tag("a").with_tag("b");

        assert!(task.is_selected(&tags(&["b"])));
        assert!(task.is_selected(&tags(&["x", "a"])));
        assert!(!task.is_selected(&tags(&["x"])));
        assert!(!Task::shell("true").is_selected(&tags(&["a"])));
    }

    #[test]
    fn test_defaults() {
        let task = Task::shell("echo hi");
        assert_eq!(task.type_name(), "shell");
        assert_eq!(task.variable.name, "default");
        assert!(task.with_values.is_empty());
    }
}
