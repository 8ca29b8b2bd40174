//! HTTP/RPC endpoint-line mini-grammar.

use super::Parser;
use crate::ast::*;
use crate::enrich;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

const HTTP_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

pub(crate) fn parse_endpoint(
    parser: &mut Parser,
    annotations: &[Annotation],
) -> Result<ListItem, ParseError> {
    let line = parser.collect_item_tokens();
    if line.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }

    let is_http = line[0].kind == TokenKind::Ident
        && HTTP_VERBS.contains(&line[0].text.as_str());

    let endpoint = if is_http {
        parse_http(&line)?
    } else {
        parse_rpc(&line)?
    };

    Ok(ListItem::Endpoint(Endpoint {
        annotations: annotations.to_vec(),
        ..endpoint
    }))
}

/// Reconstructs token spellings preserving the source's original spacing
/// (no gap in source → no gap in the rebuilt string) rather than always
/// inserting a space. Endpoint paths like `/api/comments/{id}` and request
/// shapes like `JSON{id: UUID}` are written with no internal whitespace and
/// must come back byte-exact; this is distinct from the generic
/// scalar-reconstruction rule used elsewhere in the parser, which always
/// inserts single spaces and is lossy by design.
fn join_spelling(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev_end: Option<(usize, usize)> = None;
    for tok in tokens {
        let spelling = tok.spelling();
        if let Some((line, column)) = prev_end {
            if tok.line != line || tok.column != column {
                out.push(' ');
            }
        }
        out.push_str(spelling);
        // A STRING token's spelling is its quote-stripped body, but its
        // recorded column is that of the opening quote — account for both
        // stripped quote characters so the next token's adjacency check
        // lines up with its real source column.
        let width = spelling.chars().count().max(1)
            + if tok.kind == TokenKind::String { 2 } else { 0 };
        prev_end = Some((tok.line, tok.column + width));
    }
    out
}

/// Finds the first `{placeholder}` or `JSON` marker in a left-hand HTTP
/// segment, treating a brace pair that merely wraps a single bare
/// identifier (no `:`) as a path placeholder rather than a request shape.
fn find_request_split(left: &[Token]) -> usize {
    let mut i = 0;
    while i < left.len() {
        let tok = &left[i];
        if tok.kind == TokenKind::Ident && tok.text == "JSON" {
            return i;
        }
        if tok.kind == TokenKind::LBrace {
            let is_placeholder = left.get(i + 1).map(|t| t.kind) == Some(TokenKind::Ident)
                && left.get(i + 2).map(|t| t.kind) == Some(TokenKind::RBrace);
            if is_placeholder {
                i += 3;
                continue;
            }
            return i;
        }
        i += 1;
    }
    left.len()
}

/// Splits off a trailing `[k:v, ...]` attribute block, tracking `()`/`{}`
/// depth so brackets belonging to a nested shape are never mistaken for it
/// (the grammar never uses `[]` inside a request/response shape itself).
fn split_trailing_attrs(tokens: &[Token]) -> (&[Token], Option<&[Token]>) {
    let mut depth: i32 = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBrace => depth -= 1,
            TokenKind::LBracket if depth == 0 => {
                return (&tokens[..idx], Some(&tokens[idx..]));
            }
            _ => {}
        }
    }
    (tokens, None)
}

fn parse_bracket_attributes(block: &[Token], loc: (usize, usize)) -> Result<OrderedMap, ParseError> {
    if block.len() < 2 {
        return Err(ParseError::UnmatchedDelimiter {
            what: "[",
            line: loc.0,
            column: loc.1,
        });
    }
    let inner = &block[1..block.len() - 1];
    let mut attrs = Vec::new();
    let mut i = 0;
    while i < inner.len() {
        if matches!(inner[i].kind, TokenKind::Comma | TokenKind::Newline) {
            i += 1;
            continue;
        }
        let key_tok = &inner[i];
        if !matches!(key_tok.kind, TokenKind::Ident | TokenKind::String) {
            return Err(ParseError::UnexpectedToken {
                found: key_tok.text.clone(),
                line: key_tok.line,
                column: key_tok.column,
            });
        }
        let key = key_tok.text.clone();
        i += 1;
        match inner.get(i) {
            Some(t) if t.kind == TokenKind::Colon => i += 1,
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: ":".to_string(),
                    line: key_tok.line,
                    column: key_tok.column,
                });
            }
        }
        let mut depth: i32 = 0;
        let mut parts = Vec::new();
        while i < inner.len() {
            match inner[i].kind {
                TokenKind::Comma if depth == 0 => break,
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => {
                    depth += 1;
                    parts.push(inner[i].spelling().to_string());
                    i += 1;
                }
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    depth -= 1;
                    parts.push(inner[i].spelling().to_string());
                    i += 1;
                }
                _ => {
                    parts.push(inner[i].spelling().to_string());
                    i += 1;
                }
            }
        }
        attrs.push(Attribute::new(key, Value::String(parts.join(" "))));
    }
    Ok(attrs)
}

fn build_endpoint(
    style: EndpointStyle,
    method: String,
    path: String,
    request_raw: String,
    response_raw: String,
    attr_block: Option<&[Token]>,
    loc: (usize, usize),
) -> Result<Endpoint, ParseError> {
    let attributes = match attr_block {
        Some(block) => parse_bracket_attributes(block, loc)?,
        None => Vec::new(),
    };
    let request_shape = enrich::parse_shape(&request_raw);
    let response_shape = enrich::parse_shape(&response_raw);
    let inputs = enrich::derive_inputs(request_shape.as_ref(), &path);
    let outputs = enrich::derive_outputs(response_shape.as_ref());

    Ok(Endpoint {
        style,
        method,
        path,
        request_raw,
        response_raw,
        request_shape,
        response_shape,
        inputs,
        outputs,
        attributes,
        annotations: Vec::new(),
    })
}

fn parse_http(line: &[Token]) -> Result<Endpoint, ParseError> {
    let method = line[0].text.clone();
    let rest = &line[1..];

    let arrow_idx = rest.iter().position(|t| t.kind == TokenKind::Arrow);
    let arrow_idx = match arrow_idx {
        Some(i) => i,
        None => {
            let (line0, column) = (line[0].line, line[0].column);
            return Err(ParseError::EndpointMissingArrow { line: line0, column });
        }
    };

    let left = &rest[..arrow_idx];
    let right = &rest[arrow_idx + 1..];

    let split_idx = find_request_split(left);
    let (path_tokens, request_tokens): (&[Token], &[Token]) =
        (&left[..split_idx], &left[split_idx..]);

    let path = join_spelling(path_tokens);
    let request_raw = join_spelling(request_tokens);

    let (response_tokens, attr_block) = split_trailing_attrs(right);
    let response_raw = join_spelling(response_tokens);

    build_endpoint(
        EndpointStyle::Http,
        method,
        path,
        request_raw,
        response_raw,
        attr_block,
        (line[0].line, line[0].column),
    )
}

fn parse_rpc(line: &[Token]) -> Result<Endpoint, ParseError> {
    let method = line[0].text.clone();
    let rest = &line[1..];

    if rest.first().map(|t| t.kind) != Some(TokenKind::LParen) {
        let (l, c) = (line[0].line, line[0].column);
        return Err(ParseError::UnexpectedToken {
            found: rest.first().map(|t| t.text.clone()).unwrap_or_default(),
            line: l,
            column: c,
        });
    }

    let mut depth: i32 = 0;
    let mut close_idx = None;
    for (idx, tok) in rest.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    close_idx = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let close_idx = close_idx.ok_or_else(|| {
        let (l, c) = (line[0].line, line[0].column);
        ParseError::UnmatchedDelimiter { what: "(", line: l, column: c }
    })?;

    let request_raw = join_spelling(&rest[1..close_idx]);
    let after_paren = &rest[close_idx + 1..];

    if after_paren.first().map(|t| t.kind) != Some(TokenKind::Arrow) {
        let (l, c) = (line[0].line, line[0].column);
        return Err(ParseError::EndpointMissingArrow { line: l, column: c });
    }
    let after_arrow = &after_paren[1..];

    let (response_tokens, attr_block) = split_trailing_attrs(after_arrow);
    let response_raw = join_spelling(response_tokens);

    build_endpoint(
        EndpointStyle::Grpc,
        method,
        String::new(),
        request_raw,
        response_raw,
        attr_block,
        (line[0].line, line[0].column),
    )
}
