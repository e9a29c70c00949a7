// Template Lexer
// Splits template text into literal and tag segments and tokenizes tag contents

use super::RenderError;

use std::fmt;

/// Raw template segment
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text copied to the output
    Text(String),
    /// Output tag: {{ expression }}
    Output { source: String, position: usize },
    /// Statement tag: {% statement %}
    Statement { source: String, position: usize },
}

/// Split template text into segments.
///
/// Quotes inside a tag may contain the closing delimiter.
pub fn split_template(input: &str) -> Result<Vec<Segment>, RenderError> {
    let mut segments = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while let Some(start) = find_opening(rest) {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }

        let is_output = rest[start..].starts_with("{{");
        let closing = if is_output { "}}" } else { "%}" };
        let body_start = start + 2;
        let position = offset + start;

        let Some(end) = find_closing(&rest[body_start..], closing) else {
            return Err(RenderError::Unclosed {
                delimiter: if is_output { "{{" } else { "{%" },
                position,
            });
        };

        let source = rest[body_start..body_start + end].trim().to_string();
        segments.push(if is_output {
            Segment::Output { source, position }
        } else {
            Segment::Statement { source, position }
        });

        let consumed = body_start + end + closing.len();
        rest = &rest[consumed..];
        offset += consumed;
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    Ok(segments)
}

fn find_opening(input: &str) -> Option<usize> {
    match (input.find("{{"), input.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn find_closing(body: &str, closing: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let delimiter = closing.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if bytes[i..].starts_with(delimiter) => return Some(i),
            None => {}
        }
        i += 1;
    }

    None
}

/// Tokens inside a tag
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    String(String),
    Number(usize),
    Dot,
    Comma,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "{}", s),
            Token::String(s) => write!(f, "'{}'", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Pipe => write!(f, "|"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Eof => write!(f, "end of tag"),
        }
    }
}

/// Tokenizer for tag contents
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    base: usize,
}

impl<'a> Lexer<'a> {
    /// `base` is the tag's offset in the template, used for error positions
    pub fn new(input: &'a str, base: usize) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            base,
        }
    }

    /// Tokenize the entire input; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<(Token, usize)>, RenderError> {
        let mut tokens = Vec::new();
        loop {
            let (token, position) = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, position));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<(Token, usize), RenderError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok((Token::Eof, self.base));
        };
        let position = self.base + pos;

        let single = match ch {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            '|' => Some(Token::Pipe),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = single {
            self.chars.next();
            return Ok((token, position));
        }

        let token = match ch {
            '\'' | '"' => self.read_string(ch, position)?,
            '0'..='9' => self.read_number(position)?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            other => {
                return Err(RenderError::Syntax {
                    position,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        Ok((token, position))
    }

    fn read_string(&mut self, quote: char, position: usize) -> Result<Token, RenderError> {
        self.chars.next();
        let mut value = String::new();

        for (_, ch) in self.chars.by_ref() {
            if ch == quote {
                return Ok(Token::String(value));
            }
            value.push(ch);
        }

        Err(RenderError::Syntax {
            position,
            message: "unterminated string".to_string(),
        })
    }

    fn read_number(&mut self, position: usize) -> Result<Token, RenderError> {
        let mut digits = String::new();
        while let Some((_, ch)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            digits.push(ch);
        }
        digits
            .parse::<usize>()
            .map(Token::Number)
            .map_err(|_| RenderError::Syntax {
                position,
                message: format!("invalid number: {}", digits),
            })
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some((_, ch)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || *c == '_')
        {
            ident.push(ch);
        }
        Token::Identifier(ident)
    }
}
