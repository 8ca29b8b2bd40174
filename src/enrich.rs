//! Endpoint signature enricher.
//!
//! Given an endpoint's raw request/response strings (already reconstructed
//! by the parser as space-joined scalars), attempts a structural parse into
//! a typed [`Shape`] tree. Failure is non-fatal by design: callers get
//! `None` and keep the raw strings, they never see an error here.

use crate::ast::{ShapeField, ShapeOutput};
use crate::lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Primitive(String),
    Object {
        tag: Option<String>,
        fields: Vec<(String, Shape)>,
    },
    Tuple(Vec<(String, Shape)>),
    Optional(Box<Shape>),
}

struct ShapeParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ShapeParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_question_mark(&self) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Ident && t.text == "?")
    }

    fn parse_shape(&mut self) -> Option<Shape> {
        let base = self.parse_primary()?;
        if self.at_question_mark() {
            self.bump();
            Some(Shape::Optional(Box::new(base)))
        } else {
            Some(base)
        }
    }

    fn parse_primary(&mut self) -> Option<Shape> {
        match self.peek_kind()? {
            TokenKind::Ident => {
                let name = self.bump()?.text.clone();
                if name == "?" {
                    return None;
                }
                if self.peek_kind() == Some(TokenKind::LBrace) {
                    self.bump();
                    let fields = self.parse_fields(TokenKind::RBrace)?;
                    Some(Shape::Object {
                        tag: Some(name),
                        fields,
                    })
                } else {
                    Some(Shape::Primitive(name))
                }
            }
            TokenKind::LBrace => {
                self.bump();
                let fields = self.parse_fields(TokenKind::RBrace)?;
                Some(Shape::Object { tag: None, fields })
            }
            TokenKind::LParen => {
                self.bump();
                let fields = self.parse_fields(TokenKind::RParen)?;
                Some(Shape::Tuple(fields))
            }
            _ => None,
        }
    }

    fn parse_fields(&mut self, closing: TokenKind) -> Option<Vec<(String, Shape)>> {
        let mut fields = Vec::new();
        loop {
            if self.peek_kind() == Some(closing) {
                self.bump();
                return Some(fields);
            }
            let name_tok = self.bump()?;
            if name_tok.kind != TokenKind::Ident {
                return None;
            }
            let name = name_tok.text.clone();
            if self.peek_kind() != Some(TokenKind::Colon) {
                return None;
            }
            self.bump();
            let shape = self.parse_shape()?;
            fields.push((name, shape));

            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.bump();
                }
                Some(k) if k == closing => {}
                _ => {}
            }
        }
    }
}

/// Attempts to parse `raw` into a [`Shape`]; `None` on any grammar mismatch
/// or unbalanced delimiter, never an error.
pub fn parse_shape(raw: &str) -> Option<Shape> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let tokens = lexer::tokenize(trimmed).ok()?;
    let mut parser = ShapeParser { tokens: &tokens, pos: 0 };
    let shape = parser.parse_shape()?;
    match parser.peek_kind() {
        Some(TokenKind::Eof) | None => Some(shape),
        _ => None,
    }
}

fn fields_of(shape: &Shape) -> Option<&Vec<(String, Shape)>> {
    match shape {
        Shape::Object { fields, .. } => Some(fields),
        Shape::Tuple(fields) => Some(fields),
        Shape::Optional(inner) => fields_of(inner),
        Shape::Primitive(_) => None,
    }
}

fn type_name(shape: &Shape) -> String {
    match shape {
        Shape::Primitive(name) => name.clone(),
        Shape::Optional(inner) => type_name(inner),
        Shape::Object { tag, .. } => tag.clone().unwrap_or_else(|| "object".to_string()),
        Shape::Tuple(_) => "tuple".to_string(),
    }
}

fn is_optional(shape: &Shape) -> bool {
    matches!(shape, Shape::Optional(_))
}

/// Derives `inputs` from a parsed request shape, plus the HTTP path
/// placeholders of `path` (empty for RPC endpoints).
pub fn derive_inputs(request_shape: Option<&Shape>, path: &str) -> Vec<ShapeField> {
    let body_fields: Vec<ShapeField> = request_shape
        .and_then(fields_of)
        .map(|fs| {
            fs.iter()
                .map(|(n, t)| ShapeField {
                    name: n.clone(),
                    type_name: type_name(t),
                })
                .collect()
        })
        .unwrap_or_default();

    let placeholders = path_placeholders(path);
    let mut result = Vec::new();
    for name in placeholders {
        if !body_fields.iter().any(|f| f.name == name) {
            result.push(ShapeField {
                name,
                type_name: "str".to_string(),
            });
        }
    }
    result.extend(body_fields);
    result
}

/// Derives `outputs` from a parsed response shape.
pub fn derive_outputs(response_shape: Option<&Shape>) -> Vec<ShapeOutput> {
    response_shape
        .and_then(fields_of)
        .map(|fs| {
            fs.iter()
                .map(|(n, t)| ShapeOutput {
                    name: n.clone(),
                    type_name: type_name(t),
                    optional: is_optional(t),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts `{name}` placeholders from an HTTP path, in order.
pub fn path_placeholders(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            for c2 in chars.by_ref() {
                if c2 == '}' {
                    break;
                }
                name.push(c2);
            }
            if !name.is_empty() {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_object() {
        let shape = parse_shape("User{ id: UUID, name: str }").unwrap();
        match shape {
            Shape::Object { tag, fields } => {
                assert_eq!(tag.as_deref(), Some("User"));
                assert_eq!(fields.len(), 2);
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn parses_optional_primitive_field() {
        let shape = parse_shape("JSON{comments: list?, error: str?}").unwrap();
        let outputs = derive_outputs(Some(&shape));
        assert_eq!(outputs[0].name, "comments");
        assert_eq!(outputs[0].type_name, "list");
        assert!(outputs[0].optional);
        assert_eq!(outputs[1].name, "error");
        assert!(outputs[1].optional);
    }

    #[test]
    fn parses_tuple() {
        let shape = parse_shape("(id: UUID, name: str)").unwrap();
        assert!(matches!(shape, Shape::Tuple(_)));
    }

    #[test]
    fn unbalanced_braces_yield_none() {
        assert!(parse_shape("User{ id: UUID").is_none());
    }

    #[test]
    fn bare_primitive() {
        let shape = parse_shape("UUID").unwrap();
        assert_eq!(shape, Shape::Primitive("UUID".to_string()));
    }

    #[test]
    fn path_placeholder_extraction() {
        assert_eq!(
            path_placeholders("/api/comments/{id}"),
            vec!["id".to_string()]
        );
    }

    #[test]
    fn placeholder_deduped_in_favor_of_body_field() {
        let shape = parse_shape("User{id: UUID}").unwrap();
        let inputs = derive_inputs(Some(&shape), "/users/{id}");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].type_name, "UUID");
    }
}
