// Task Variables
// Regex-based extraction of task output into named values

use regex::Regex;
use serde::Serialize;

/// Named extraction rule plus the value it last captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Name under which the variable is stored in the task group
    pub name: String,
    /// Pattern applied to task output
    pub regex: String,
    /// Capture group copied into the value (0 = whole match)
    pub group: usize,
    /// Apply the pattern to every line separately
    pub line_by_line: bool,
    value: String,
}

impl Variable {
    pub const DEFAULT_NAME: &'static str = "default";
    pub const DEFAULT_REGEX: &'static str = ".*";

    /// Create a variable matching everything
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regex: Self::DEFAULT_REGEX.to_string(),
            group: 0,
            line_by_line: false,
            value: String::new(),
        }
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = regex.into();
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn with_line_by_line(mut self, line_by_line: bool) -> Self {
        self.line_by_line = line_by_line;
        self
    }

    /// Current value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Apply the pattern to `raw` and store the captured text.
    ///
    /// Returns false and keeps the previous value when nothing matches.
    pub fn set_value(&mut self, raw: &str) -> bool {
        let regex = match Regex::new(&self.regex) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(variable = %self.name, "invalid regex '{}': {}", self.regex, e);
                return false;
            }
        };

        if self.line_by_line {
            let captured: Vec<&str> = raw
                .lines()
                .filter_map(|line| regex.captures(line)?.get(self.group))
                .map(|m| m.as_str())
                .collect();

            if captured.is_empty() {
                return false;
            }
            self.value = captured.join("\n");
            true
        } else {
            match regex.captures(raw).and_then(|c| c.get(self.group)) {
                Some(m) => {
                    self.value = m.as_str().to_string();
                    true
                }
                None => false,
            }
        }
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_variable() {
        let variable = Variable::default();
        assert_eq!(variable.name, "default");
        assert_eq!(variable.regex, ".*");
        assert_eq!(variable.value(), "");
    }

    #[test]
    fn test_set_value_whole_match() {
        let mut variable = Variable::new("test");
        assert!(variable.set_value("hello world"));
        assert_eq!(variable.value(), "hello world");
    }

    #[test]
    fn test_set_value_no_match_keeps_previous() {
        let mut variable = Variable::new("version").with_regex(r"\d+\.\d+");
        assert!(variable.set_value("release 1.2"));
        assert_eq!(variable.value(), "1.2");

        assert!(!variable.set_value("nothing here"));
        assert_eq!(variable.value(), "1.2");
    }

    #[test]
    fn test_set_value_capture_group() {
        let mut variable = Variable::new("name")
            .with_regex(r"name=(\w+)")
            .with_group(1);
        assert!(variable.set_value("id=3 name=Gandalf"));
        assert_eq!(variable.value(), "Gandalf");
    }

    #[test]
    fn test_set_value_missing_group_is_no_match() {
        let mut variable = Variable::new("x").with_regex("a|(b)").with_group(1);
        assert!(!variable.set_value("a"));
        assert_eq!(variable.value(), "");
    }

    #[test]
    fn test_set_value_line_by_line() {
        let mut variable = Variable::new("items")
            .with_regex(r"^item: (.*)$")
            .with_group(1)
            .with_line_by_line(true);

        assert!(variable.set_value("item: a\nnoise\nitem: b"));
        assert_eq!(variable.value(), "a\nb");

        assert!(!variable.set_value("noise only"));
        assert_eq!(variable.value(), "a\nb");
    }

    #[test]
    fn test_set_value_invalid_regex() {
        let mut variable = Variable::new("broken").with_regex("(unclosed");
        assert!(!variable.set_value("anything"));
        assert_eq!(variable.value(), "");
    }
}
