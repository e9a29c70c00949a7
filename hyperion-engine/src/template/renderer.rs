// Template Renderer
// Evaluates parsed templates against the model, variables, "with" entry and matrix

use super::parser::{parse_template, Expr, Filter, Node, Operand, Reference, ReferencePart};
use super::RenderError;
use crate::model::{MatrixParameters, Value, Variable};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Current "with" entry of a fanned-out task
#[derive(Debug, Clone, Copy)]
pub struct WithEntry<'a> {
    pub index: usize,
    pub value: &'a Value,
}

/// Everything a template can see during one task invocation.
///
/// Roots: `model`, `variables`, `with` (`value`, `index`) and `matrix`.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    model: &'a Value,
    variables: Option<&'a BTreeMap<String, Variable>>,
    with: Option<WithEntry<'a>>,
    matrix: Option<&'a MatrixParameters>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(model: &'a Value) -> Self {
        Self {
            model,
            variables: None,
            with: None,
            matrix: None,
        }
    }

    pub fn with_variables(mut self, variables: &'a BTreeMap<String, Variable>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_entry(mut self, index: usize, value: &'a Value) -> Self {
        self.with = Some(WithEntry { index, value });
        self
    }

    pub fn with_matrix(mut self, matrix: Option<&'a MatrixParameters>) -> Self {
        self.matrix = matrix;
        self
    }
}

/// Render template text against a context.
///
/// Missing references render as empty text; malformed templates are errors.
pub fn render(template: &str, context: &TemplateContext<'_>) -> Result<String, RenderError> {
    if !template.contains("{{") && !template.contains("{%") {
        return Ok(template.to_string());
    }

    let nodes = parse_template(template)?;
    let mut renderer = Renderer {
        context,
        locals: Vec::new(),
    };
    let mut output = String::with_capacity(template.len());
    renderer.render_nodes(&nodes, &mut output)?;
    Ok(output)
}

/// Result of walking a reference
enum Resolved<'r> {
    Value(&'r Value),
    Text(Cow<'r, str>),
    Variables(&'r BTreeMap<String, Variable>),
    Variable(&'r Variable),
    With(WithEntry<'r>),
    Matrix(&'r MatrixParameters),
    Missing,
}

/// Value flowing through the filter chain
#[derive(Debug, Clone, PartialEq)]
enum Piped {
    Missing,
    Text(String),
    Value(Value),
}

impl Piped {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Piped::Text(s.clone()),
            other => Piped::Value(other.clone()),
        }
    }

    fn into_text(self) -> String {
        match self {
            Piped::Missing => String::new(),
            Piped::Text(s) => s,
            Piped::Value(v) => v.to_string(),
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Piped::Missing => false,
            Piped::Text(s) => !s.is_empty(),
            Piped::Value(v) => !v.is_empty(),
        }
    }

    fn map_text(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            Piped::Missing => Piped::Missing,
            other => Piped::Text(f(&other.into_text())),
        }
    }
}

struct Renderer<'c, 'a> {
    context: &'c TemplateContext<'a>,
    locals: Vec<(String, Value)>,
}

impl Renderer<'_, '_> {
    fn render_nodes(&mut self, nodes: &[Node], output: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => output.push_str(text),
                Node::Output(expr) => output.push_str(&self.evaluate(expr)?.into_text()),
                Node::For {
                    binding,
                    iterable,
                    body,
                } => {
                    let items = match self.evaluate(iterable)? {
                        Piped::Missing => Vec::new(),
                        Piped::Text(s) => vec![Value::String(s)],
                        Piped::Value(Value::List(items)) => items,
                        Piped::Value(Value::Map(map)) => {
                            map.into_keys().map(Value::String).collect()
                        }
                        Piped::Value(leaf) => vec![leaf],
                    };

                    for item in items {
                        self.locals.push((binding.clone(), item));
                        let result = self.render_nodes(body, output);
                        self.locals.pop();
                        result?;
                    }
                }
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let branch = if self.evaluate(condition)?.is_truthy() {
                        then_branch
                    } else {
                        else_branch
                    };
                    self.render_nodes(branch, output)?;
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, expr: &Expr) -> Result<Piped, RenderError> {
        let mut value = match &expr.operand {
            Operand::Literal(text) => Piped::Text(text.clone()),
            Operand::Reference(reference) => into_piped(self.resolve(reference)),
        };

        for filter in &expr.filters {
            value = apply_filter(filter, value)?;
        }

        Ok(value)
    }

    fn resolve(&self, reference: &Reference) -> Resolved<'_> {
        let mut current = self.root(&reference.root);
        for part in &reference.parts {
            current = step(current, part);
            if matches!(current, Resolved::Missing) {
                break;
            }
        }
        current
    }

    fn root(&self, name: &str) -> Resolved<'_> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Resolved::Value(value);
        }

        match name {
            "model" => Resolved::Value(self.context.model),
            "variables" => self
                .context
                .variables
                .map_or(Resolved::Missing, Resolved::Variables),
            "with" => self.context.with.map_or(Resolved::Missing, Resolved::With),
            "matrix" => self.context.matrix.map_or(Resolved::Missing, Resolved::Matrix),
            _ => Resolved::Missing,
        }
    }
}

/// One property or index step.
///
/// `attributes` on a map without such a key and `value` on a string leaf
/// resolve to the value itself, so `model.attributes.x.value` reads `x`.
fn step<'r>(current: Resolved<'r>, part: &ReferencePart) -> Resolved<'r> {
    match current {
        Resolved::Value(value) => match (value, part) {
            (Value::Map(map), ReferencePart::Property(key)) => match map.get(key) {
                Some(found) => Resolved::Value(found),
                None if key == "attributes" => Resolved::Value(value),
                None => Resolved::Missing,
            },
            (Value::Map(map), ReferencePart::Index(index)) => map
                .get(&index.to_string())
                .map_or(Resolved::Missing, Resolved::Value),
            (Value::List(items), ReferencePart::Index(index)) => {
                items.get(*index).map_or(Resolved::Missing, Resolved::Value)
            }
            (Value::String(_), ReferencePart::Property(key)) if key == "value" => {
                Resolved::Value(value)
            }
            _ => Resolved::Missing,
        },
        Resolved::Variables(variables) => match part {
            ReferencePart::Property(name) => variables
                .get(name)
                .map_or(Resolved::Missing, Resolved::Variable),
            ReferencePart::Index(_) => Resolved::Missing,
        },
        Resolved::Variable(variable) => match part {
            ReferencePart::Property(field) => match field.as_str() {
                "value" => Resolved::Text(Cow::Borrowed(variable.value())),
                "name" => Resolved::Text(Cow::Borrowed(&variable.name)),
                "regex" => Resolved::Text(Cow::Borrowed(&variable.regex)),
                "group" => Resolved::Text(Cow::Owned(variable.group.to_string())),
                _ => Resolved::Missing,
            },
            ReferencePart::Index(_) => Resolved::Missing,
        },
        Resolved::With(entry) => match part {
            ReferencePart::Property(field) if field == "value" => Resolved::Value(entry.value),
            ReferencePart::Property(field) if field == "index" => {
                Resolved::Text(Cow::Owned(entry.index.to_string()))
            }
            _ => Resolved::Missing,
        },
        Resolved::Matrix(matrix) => match part {
            ReferencePart::Property(key) => matrix
                .parameters
                .get(key)
                .map_or(Resolved::Missing, |v| Resolved::Text(Cow::Borrowed(v))),
            ReferencePart::Index(_) => Resolved::Missing,
        },
        Resolved::Text(_) | Resolved::Missing => Resolved::Missing,
    }
}

fn into_piped(resolved: Resolved<'_>) -> Piped {
    match resolved {
        Resolved::Value(value) => Piped::from_value(value),
        Resolved::Text(text) => Piped::Text(text.into_owned()),
        Resolved::Variables(variables) => Piped::Value(Value::Map(
            variables
                .iter()
                .map(|(name, v)| (name.clone(), Value::from(v.value())))
                .collect(),
        )),
        Resolved::Variable(variable) => Piped::Text(variable.value().to_string()),
        Resolved::With(entry) => Piped::from_value(entry.value),
        Resolved::Matrix(matrix) => Piped::Value(Value::Map(
            matrix
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect(),
        )),
        Resolved::Missing => Piped::Missing,
    }
}

fn check_arity(filter: &Filter, allowed: RangeInclusive<usize>) -> Result<(), RenderError> {
    if allowed.contains(&filter.args.len()) {
        Ok(())
    } else {
        let expected = if allowed.start() == allowed.end() {
            allowed.start().to_string()
        } else {
            format!("{} to {}", allowed.start(), allowed.end())
        };
        Err(RenderError::FilterArguments {
            name: filter.name.clone(),
            expected,
            found: filter.args.len(),
        })
    }
}

fn apply_filter(filter: &Filter, input: Piped) -> Result<Piped, RenderError> {
    match filter.name.as_str() {
        "upper" => {
            check_arity(filter, 0..=0)?;
            Ok(input.map_text(str::to_uppercase))
        }
        "lower" => {
            check_arity(filter, 0..=0)?;
            Ok(input.map_text(str::to_lowercase))
        }
        "trim" => {
            check_arity(filter, 0..=0)?;
            Ok(input.map_text(|s| s.trim().to_string()))
        }
        "default" => {
            check_arity(filter, 1..=1)?;
            if input.is_truthy() {
                Ok(input)
            } else {
                Ok(Piped::Text(filter.args[0].clone()))
            }
        }
        "join" => {
            check_arity(filter, 0..=1)?;
            let separator = filter.args.first().map(String::as_str).unwrap_or("");
            Ok(match input {
                Piped::Value(Value::List(items)) => Piped::Text(
                    items
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(separator),
                ),
                other => other,
            })
        }
        "length" => {
            check_arity(filter, 0..=0)?;
            let length = match &input {
                Piped::Missing => 0,
                Piped::Text(s) => s.chars().count(),
                Piped::Value(v) => v.len(),
            };
            Ok(Piped::Text(length.to_string()))
        }
        other => Err(RenderError::UnknownFilter(other.to_string())),
    }
}
