// Reader error types with helpful error messages
// Provides context, line/column info, and suggestions for common document mistakes

use std::fmt;

/// Detailed read error with location and context
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
    /// Surrounding source lines
    pub context: String,
    /// Optional suggestion for fixing the error
    pub suggestion: Option<String>,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// YAML syntax error
    YamlSyntax,
    /// Wrong types or structure
    InvalidSchema,
    /// Field not allowed at this place
    UnknownField,
    /// Required field absent
    MissingField,
    /// Field present but unusable (bad regex, unknown task type)
    InvalidValue,
    /// File could not be read
    IoError,
}

impl ParseError {
    pub fn new(message: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            message: message.into(),
            line: 0,
            column: 0,
            context: String::new(),
            suggestion: None,
            kind,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the source lines around the error location
    pub fn with_source_context(mut self, source: &str, context_lines: usize) -> Self {
        if self.line == 0 {
            return self;
        }

        let lines: Vec<&str> = source.lines().collect();
        let start = self.line.saturating_sub(context_lines + 1);
        let end = (self.line + context_lines).min(lines.len());

        let mut context = String::new();
        for (i, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = i + 1;
            let prefix = if line_num == self.line { ">" } else { " " };
            context.push_str(&format!("{} {:4} | {}\n", prefix, line_num, line));

            if line_num == self.line && self.column > 0 {
                let indicator = " ".repeat(self.column + 7) + "^";
                context.push_str(&format!("       | {}\n", indicator));
            }
        }

        self.context = context;
        self
    }

    /// Create from serde_yaml error
    pub fn from_yaml_error(err: &serde_yaml::Error, source: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((0, 0));

        let msg = err.to_string();
        let (message, kind) = classify_yaml_error(&msg);
        let mut error = ParseError::new(message, kind)
            .at(line, column)
            .with_source_context(source, 2);
        error.suggestion = suggest_fix(&msg);
        error
    }

    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        ParseError::new(
            format!("cannot read '{}': {}", path.display(), err),
            ParseErrorKind::IoError,
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if self.line > 0 {
            write!(f, " (line {}:{})", self.line, self.column)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.context.trim_end())?;
        }

        if let Some(suggestion) = &self.suggestion {
            writeln!(f)?;
            write!(f, "help: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Result type for reader operations
pub type ParseResult<T> = Result<T, ParseError>;

fn classify_yaml_error(msg: &str) -> (String, ParseErrorKind) {
    if let Some(field) = extract_between(msg, "missing field `", "`") {
        return (
            format!("missing required field '{}'", field),
            ParseErrorKind::MissingField,
        );
    }

    if let Some(field) = extract_between(msg, "unknown field `", "`") {
        let message = match extract_expected(msg) {
            Some(expected) => format!(
                "unknown field '{}', expected one of: {}",
                field,
                expected.join(", ")
            ),
            None => format!("unknown field '{}'", field),
        };
        return (message, ParseErrorKind::UnknownField);
    }

    if let Some(variant) = extract_between(msg, "unknown variant `", "`") {
        return (
            format!("unknown task type '{}'", variant),
            ParseErrorKind::InvalidValue,
        );
    }

    if msg.contains("invalid type") {
        return (strip_location(msg), ParseErrorKind::InvalidSchema);
    }

    (strip_location(msg), ParseErrorKind::YamlSyntax)
}

fn strip_location(msg: &str) -> String {
    match msg.find(" at line ") {
        Some(pos) => msg[..pos].to_string(),
        None => msg.to_string(),
    }
}

fn extract_between(msg: &str, prefix: &str, suffix: &str) -> Option<String> {
    let start = msg.find(prefix)? + prefix.len();
    let end = msg[start..].find(suffix)? + start;
    Some(msg[start..end].to_string())
}

fn extract_expected(msg: &str) -> Option<Vec<String>> {
    let start = msg.find("expected one of ")? + "expected one of ".len();
    let fields = &msg[start..];
    let end = fields.find(" at").unwrap_or(fields.len());
    Some(
        fields[..end]
            .split(", ")
            .map(|s| s.trim_matches('`').to_string())
            .collect(),
    )
}

/// Suggest fixes for common document mistakes
fn suggest_fix(msg: &str) -> Option<String> {
    let typos = [
        ("taskGroups", "taskgroups"),
        ("task_groups", "taskgroups"),
        ("lineByLine", "line-by-line"),
        ("imageName", "image-name"),
        ("imageVersion", "image-version"),
        ("ensurePath", "ensure-path"),
        ("repositoryTag", "repository-tag"),
    ];
    for (typo, correct) in typos {
        if msg.contains(&format!("unknown field `{}`", typo)) {
            return Some(format!("did you mean '{}'?", correct));
        }
    }

    if msg.contains("missing field `type`") {
        return Some("every task needs a 'type' such as shell, python or write-file".to_string());
    }

    if msg.contains("missing field `taskgroups`") {
        return Some("a document needs a 'taskgroups' list, even if it is empty".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("missing required field 'tasks'", ParseErrorKind::MissingField)
            .at(3, 5)
            .with_suggestion("add a 'tasks' list");

        let output = err.to_string();
        assert!(output.contains("missing required field"));
        assert!(output.contains("line 3:5"));
        assert!(output.contains("help: add a 'tasks' list"));
    }

    #[test]
    fn test_parse_error_with_source_context() {
        let source = "taskgroups:\n  - title: test\n    tasks:\n      - type: shell";
        let err = ParseError::new("boom", ParseErrorKind::InvalidSchema)
            .at(2, 5)
            .with_source_context(source, 1);

        assert!(err.context.contains(">    2 |   - title: test"));
        assert!(err.context.contains("taskgroups:"));
    }

    #[test]
    fn test_classify_messages() {
        let (message, kind) =
            classify_yaml_error("taskgroups[0]: missing field `tasks` at line 2 column 5");
        assert_eq!(message, "missing required field 'tasks'");
        assert_eq!(kind, ParseErrorKind::MissingField);

        let (message, kind) = classify_yaml_error(
            "unknown field `foo`, expected one of `title`, `tasks` at line 1 column 1",
        );
        assert_eq!(message, "unknown field 'foo', expected one of: title, tasks");
        assert_eq!(kind, ParseErrorKind::UnknownField);

        let (message, kind) = classify_yaml_error("unknown variant `bash`, expected one of `shell`");
        assert_eq!(message, "unknown task type 'bash'");
        assert_eq!(kind, ParseErrorKind::InvalidValue);
    }

    #[test]
    fn test_suggestions() {
        assert_eq!(
            suggest_fix("unknown field `taskGroups`, expected one of `model`"),
            Some("did you mean 'taskgroups'?".to_string())
        );
        assert!(suggest_fix("something else entirely").is_none());
    }
}
