// Template Parser
// Builds the node tree for a template and the AST for tag expressions

use super::lexer::{split_template, Lexer, Segment, Token};
use super::RenderError;

/// Expression inside a tag: an operand followed by filters
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub operand: Operand,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// String or number literal
    Literal(String),
    /// Context lookup: model.attributes.name, with.value[0]
    Reference(Reference),
}

/// Reference to a context value
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub root: String,
    pub parts: Vec<ReferencePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferencePart {
    /// Property access by name
    Property(String),
    /// Index access by position
    Index(usize),
}

/// Filter application: `| name` or `| name('arg', ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<String>,
}

/// Template node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Expr),
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    If {
        condition: Expr,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
}

/// Parse template text into a node tree
pub fn parse_template(input: &str) -> Result<Vec<Node>, RenderError> {
    let segments = split_template(input)?;
    let mut iter = segments.into_iter();
    let (nodes, terminator) = parse_block(&mut iter)?;

    match terminator {
        None => Ok(nodes),
        Some((keyword, position)) => Err(RenderError::Syntax {
            position,
            message: format!("unexpected '{}'", keyword),
        }),
    }
}

/// Parse nodes until a block terminator (endfor, else, endif) or the end
fn parse_block(
    segments: &mut impl Iterator<Item = Segment>,
) -> Result<(Vec<Node>, Option<(String, usize)>), RenderError> {
    let mut nodes = Vec::new();

    while let Some(segment) = segments.next() {
        match segment {
            Segment::Text(text) => nodes.push(Node::Text(text)),
            Segment::Output { source, position } => {
                nodes.push(Node::Output(ExprParser::parse_str(&source, position)?));
            }
            Segment::Statement { source, position } => {
                let mut parser = ExprParser::new(Lexer::new(&source, position).tokenize()?);
                let keyword = parser.expect_identifier("statement keyword")?;

                match keyword.as_str() {
                    "for" => {
                        let binding = parser.expect_identifier("loop variable")?;
                        if parser.expect_identifier("'in'")? != "in" {
                            return Err(parser.error("expected 'in'"));
                        }
                        let iterable = parser.parse_expression()?;
                        parser.expect_end()?;

                        let (body, end) = parse_block(segments)?;
                        expect_terminator(end, &["endfor"], position)?;
                        nodes.push(Node::For {
                            binding,
                            iterable,
                            body,
                        });
                    }
                    "if" => {
                        let condition = parser.parse_expression()?;
                        parser.expect_end()?;

                        let (then_branch, end) = parse_block(segments)?;
                        let keyword = expect_terminator(end, &["else", "endif"], position)?;
                        let else_branch = if keyword == "else" {
                            let (else_branch, end) = parse_block(segments)?;
                            expect_terminator(end, &["endif"], position)?;
                            else_branch
                        } else {
                            Vec::new()
                        };

                        nodes.push(Node::If {
                            condition,
                            then_branch,
                            else_branch,
                        });
                    }
                    "endfor" | "else" | "endif" => {
                        parser.expect_end()?;
                        return Ok((nodes, Some((keyword.clone(), position))));
                    }
                    other => {
                        return Err(RenderError::Syntax {
                            position,
                            message: format!("unknown statement '{}'", other),
                        })
                    }
                }
            }
        }
    }

    Ok((nodes, None))
}

fn expect_terminator(
    found: Option<(String, usize)>,
    expected: &[&str],
    opened_at: usize,
) -> Result<String, RenderError> {
    match found {
        Some((keyword, _)) if expected.contains(&keyword.as_str()) => Ok(keyword),
        Some((keyword, position)) => Err(RenderError::Syntax {
            position,
            message: format!("expected {}, found '{}'", expected.join(" or "), keyword),
        }),
        None => Err(RenderError::Syntax {
            position: opened_at,
            message: format!("block is never closed, expected {}", expected.join(" or ")),
        }),
    }
}

/// Recursive descent parser over tag tokens
pub struct ExprParser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl ExprParser {
    pub fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse a complete output expression
    pub fn parse_str(input: &str, base: usize) -> Result<Expr, RenderError> {
        let mut parser = Self::new(Lexer::new(input, base).tokenize()?);
        let expr = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, RenderError> {
        let operand = self.parse_operand()?;
        let mut filters = Vec::new();

        while self.check(&Token::Pipe) {
            self.advance();
            let name = self.expect_identifier("filter name")?;
            let args = if self.check(&Token::LParen) {
                self.parse_args()?
            } else {
                Vec::new()
            };
            filters.push(Filter { name, args });
        }

        Ok(Expr { operand, filters })
    }

    fn parse_operand(&mut self) -> Result<Operand, RenderError> {
        match self.advance() {
            Token::String(s) => Ok(Operand::Literal(s)),
            Token::Number(n) => Ok(Operand::Literal(n.to_string())),
            Token::Identifier(root) => {
                let mut parts = Vec::new();
                loop {
                    if self.check(&Token::Dot) {
                        self.advance();
                        match self.advance() {
                            Token::Identifier(name) => parts.push(ReferencePart::Property(name)),
                            Token::Number(n) => parts.push(ReferencePart::Index(n)),
                            _ => return Err(self.error("expected property name after '.'")),
                        }
                    } else if self.check(&Token::LBracket) {
                        self.advance();
                        match self.advance() {
                            Token::Number(n) => parts.push(ReferencePart::Index(n)),
                            Token::String(key) => parts.push(ReferencePart::Property(key)),
                            _ => return Err(self.error("expected index or quoted key")),
                        }
                        self.expect(&Token::RBracket, "expected ']'")?;
                    } else {
                        break;
                    }
                }
                Ok(Operand::Reference(Reference { root, parts }))
            }
            Token::Eof => Err(self.error("empty expression")),
            token => Err(self.error(&format!("unexpected token '{}'", token))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<String>, RenderError> {
        self.expect(&Token::LParen, "expected '('")?;
        let mut args = Vec::new();

        if !self.check(&Token::RParen) {
            loop {
                match self.advance() {
                    Token::String(s) => args.push(s),
                    Token::Number(n) => args.push(n.to_string()),
                    _ => return Err(self.error("filter arguments must be literals")),
                }
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(&Token::RParen, "expected ')'")?;
        Ok(args)
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, RenderError> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            _ => Err(self.error(&format!("expected {}", what))),
        }
    }

    fn expect_end(&mut self) -> Result<(), RenderError> {
        match self.peek() {
            Token::Eof => Ok(()),
            token => {
                let message = format!("unexpected token '{}'", token);
                Err(self.error(&message))
            }
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.position += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token, msg: &str) -> Result<(), RenderError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    fn error(&self, message: &str) -> RenderError {
        let index = self.position.min(self.tokens.len().saturating_sub(1));
        let position = self.tokens.get(index).map(|(_, p)| *p).unwrap_or(0);
        RenderError::Syntax {
            position,
            message: message.to_string(),
        }
    }
}
