//! Recursive-descent parser: token stream → [`System`] AST.

pub mod endpoints;
pub mod lists;

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Result of parsing a brace-delimited map: either a genuine map, or — when
/// every entry turned out to be a raw line — the collapsed string.
pub(crate) enum MapResult {
    Map(OrderedMap),
    Collapsed(String),
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn loc(&self) -> (usize, usize) {
        (self.peek().line, self.peek().column)
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            let (line, column) = self.loc();
            Err(ParseError::UnmatchedDelimiter { what, line, column })
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == TokenKind::Newline {
            self.bump();
        }
    }

    /// Consumes a run of `,`/newline separators (both optional in the
    /// map/list grammar).
    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Comma) {
            self.bump();
        }
    }

    fn is_key_ahead(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident | TokenKind::String)
            && self.peek_at(1).kind == TokenKind::Colon
    }

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>, ParseError> {
        let mut annotations = Vec::new();
        while self.peek_kind() == TokenKind::At {
            self.bump();
            let name_tok = self.expect(TokenKind::Ident, "annotation name")?;
            let mut args = Vec::new();
            if self.peek_kind() == TokenKind::LParen {
                self.bump();
                args = self.parse_annotation_args()?;
                self.expect(TokenKind::RParen, ")")?;
            }
            annotations.push(Annotation {
                name: name_tok.text,
                args,
            });
        }
        Ok(annotations)
    }

    /// Splits annotation arguments on top-level commas, respecting nested
    /// `(){}[]`.
    fn parse_annotation_args(&mut self) -> Result<Vec<String>, ParseError> {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut depth: i32 = 0;

        loop {
            match self.peek_kind() {
                TokenKind::RParen if depth == 0 => {
                    if !current.trim().is_empty() {
                        args.push(current.trim().to_string());
                    }
                    return Ok(args);
                }
                TokenKind::Eof => {
                    let (line, column) = self.loc();
                    return Err(ParseError::UnmatchedDelimiter {
                        what: "(",
                        line,
                        column,
                    });
                }
                TokenKind::Comma if depth == 0 => {
                    self.bump();
                    args.push(current.trim().to_string());
                    current.clear();
                }
                _ => {
                    let tok = self.bump();
                    match tok.kind {
                        TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                        TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => depth -= 1,
                        _ => {}
                    }
                    if tok.kind == TokenKind::String {
                        current.push('"');
                        current.push_str(&tok.text);
                        current.push('"');
                    } else {
                        if !current.is_empty() {
                            current.push(' ');
                        }
                        current.push_str(tok.spelling());
                    }
                }
            }
        }
    }

    /// Reconstructs a bare scalar: tokens up to the nearest top-level
    /// separator (`NEWLINE` or `COMMA`), re-joined with single spaces.
    /// Lossy by design — original inter-token spacing is not preserved.
    fn parse_scalar(&mut self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut depth: i32 = 0;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen if depth == 0 => break,
                _ => {
                    let tok = self.bump();
                    match tok.kind {
                        TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                        TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => depth -= 1,
                        _ => {}
                    }
                    parts.push(tok.spelling().to_string());
                }
            }
        }
        parts.join(" ")
    }

    /// Like [`Self::parse_scalar`], but also stops (without consuming) at a
    /// top-level `{`, used by the `methods` return-signature grammar where
    /// a brace introduces the method's attribute map.
    fn parse_scalar_stop_at_brace(&mut self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut depth: i32 = 0;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::LBrace if depth == 0 => break,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen if depth == 0 => break,
                _ => {
                    let tok = self.bump();
                    match tok.kind {
                        TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                        TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => depth -= 1,
                        _ => {}
                    }
                    parts.push(tok.spelling().to_string());
                }
            }
        }
        parts.join(" ")
    }

    /// Consumes a balanced `(...)` group, returning the space-joined
    /// spelling of its interior (parens stripped). `Ok(None)` if no `(`
    /// is present at all.
    pub(crate) fn parse_paren_group(&mut self) -> Result<Option<String>, ParseError> {
        if self.peek_kind() != TokenKind::LParen {
            return Ok(None);
        }
        self.bump();
        let mut depth: i32 = 1;
        let mut parts = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => {
                    let (line, column) = self.loc();
                    return Err(ParseError::UnmatchedDelimiter {
                        what: "(",
                        line,
                        column,
                    });
                }
                TokenKind::RParen if depth == 1 => {
                    self.bump();
                    break;
                }
                _ => {
                    let tok = self.bump();
                    match tok.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => depth -= 1,
                        _ => {}
                    }
                    parts.push(tok.spelling().to_string());
                }
            }
        }
        Ok(Some(parts.join(" ")))
    }

    /// Gathers the tokens of one logical `endpoints:` list item: everything
    /// up to the next top-level separator (`,`, newline, or the list's
    /// closing `]`), without consuming the terminator.
    pub(crate) fn collect_item_tokens(&mut self) -> Vec<Token> {
        let mut toks = Vec::new();
        let mut depth: i32 = 0;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::RBracket if depth == 0 => break,
                _ => {
                    let tok = self.bump();
                    match tok.kind {
                        TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                        TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => depth -= 1,
                        _ => {}
                    }
                    toks.push(tok);
                }
            }
        }
        toks
    }

    pub(crate) fn error_loc(&self) -> (usize, usize) {
        self.loc()
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek_kind() {
            TokenKind::LBrace => {
                self.bump();
                match self.parse_map()? {
                    MapResult::Map(m) => Ok(Value::Map(m)),
                    MapResult::Collapsed(s) => Ok(Value::String(s)),
                }
            }
            TokenKind::LBracket => {
                self.bump();
                Ok(Value::List(self.parse_list(None)?))
            }
            TokenKind::String => {
                let tok = self.bump();
                Ok(Value::String(tok.text))
            }
            _ => Ok(Value::String(self.parse_scalar())),
        }
    }

    /// Parses an attribute value when the attribute's key names one of the
    /// specialized lists: the list body gets a different grammar than the
    /// generic one.
    fn parse_value_for_key(&mut self, key: &str) -> Result<Value, ParseError> {
        match self.peek_kind() {
            TokenKind::LBracket if lists::is_specialized(key) => {
                self.bump();
                Ok(Value::List(self.parse_list(Some(key))?))
            }
            _ => self.parse_value(),
        }
    }

    /// Parses a map body; the opening `{` has already been consumed.
    /// Consumes the closing `}`.
    pub(crate) fn parse_map(&mut self) -> Result<MapResult, ParseError> {
        let mut entries: OrderedMap = Vec::new();
        let mut raw_lines: Vec<String> = Vec::new();

        loop {
            self.skip_separators();
            if self.peek_kind() == TokenKind::RBrace {
                self.bump();
                break;
            }
            if self.peek_kind() == TokenKind::Eof {
                let (line, column) = self.loc();
                return Err(ParseError::UnmatchedDelimiter {
                    what: "{",
                    line,
                    column,
                });
            }

            let annotations = self.parse_annotations()?;
            if self.peek_kind() == TokenKind::RBrace || self.peek_kind() == TokenKind::Eof {
                if !annotations.is_empty() {
                    let (line, column) = self.loc();
                    return Err(ParseError::TrailingAnnotation { line, column });
                }
            }

            if self.is_key_ahead() {
                let key_tok = self.bump();
                let key = key_tok.text;
                self.expect(TokenKind::Colon, ":")?;
                let value = self.parse_value_for_key(&key)?;
                if entries.iter().any(|a: &Attribute| a.key == key) {
                    return Err(ParseError::DuplicateKey {
                        key,
                        line: key_tok.line,
                        column: key_tok.column,
                    });
                }
                entries.push(Attribute {
                    key,
                    value,
                    annotations,
                });
            } else {
                let (line, _) = self.loc();
                let raw = self.parse_scalar();
                if raw.is_empty() && self.peek_kind() != TokenKind::Eof {
                    // Guard against a delimiter-only loop (e.g. stray
                    // token that is neither a key nor consumable scalar).
                    let (l, c) = self.loc();
                    return Err(ParseError::UnexpectedToken {
                        found: self.peek().text.clone(),
                        line: l,
                        column: c,
                    });
                }
                let _ = line;
                raw_lines.push(raw);
            }
        }

        if entries.is_empty() && !raw_lines.is_empty() {
            return Ok(MapResult::Collapsed(raw_lines.join("\n")));
        }
        if !raw_lines.is_empty() {
            entries.push(Attribute::new(
                "__raw__",
                Value::List(raw_lines.into_iter().map(ListItem::Scalar).collect()),
            ));
        }
        Ok(MapResult::Map(entries))
    }

    /// Parses a map body and always returns an [`OrderedMap`], for use as a
    /// fixed-shape struct field (`Block.attributes`, `Method.attributes`,
    /// ...) where raw-only collapse does not apply.
    pub(crate) fn parse_map_fields(&mut self) -> Result<OrderedMap, ParseError> {
        match self.parse_map()? {
            MapResult::Map(m) => Ok(m),
            MapResult::Collapsed(s) => Ok(vec![Attribute::new(
                "__raw__",
                Value::List(s.lines().map(|l| ListItem::Scalar(l.to_string())).collect()),
            )]),
        }
    }

    /// Parses a list body; the opening `[` has already been consumed.
    /// Consumes the closing `]`. `list_key` selects a specialized grammar
    /// when it names `components`/`fields`/`methods`/`endpoints`.
    pub(crate) fn parse_list(&mut self, list_key: Option<&str>) -> Result<Vec<ListItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            if self.peek_kind() == TokenKind::RBracket {
                self.bump();
                break;
            }
            if self.peek_kind() == TokenKind::Eof {
                let (line, column) = self.loc();
                return Err(ParseError::UnmatchedDelimiter {
                    what: "[",
                    line,
                    column,
                });
            }
            items.push(self.parse_list_item(list_key)?);
        }
        Ok(items)
    }

    fn parse_list_item(&mut self, list_key: Option<&str>) -> Result<ListItem, ParseError> {
        let annotations = self.parse_annotations()?;

        if self.peek_kind() == TokenKind::RBracket || self.peek_kind() == TokenKind::Eof {
            if !annotations.is_empty() {
                let (line, column) = self.loc();
                return Err(ParseError::TrailingAnnotation { line, column });
            }
        }

        if let Some(key) = list_key {
            if let Some(item) = lists::parse_specialized_item(self, key, &annotations)? {
                return Ok(item);
            }
        }

        let item = if self.peek_kind() == TokenKind::LBrace {
            self.bump();
            match self.parse_map()? {
                MapResult::Map(m) => ListItem::Map(m),
                MapResult::Collapsed(s) => ListItem::Scalar(s),
            }
        } else {
            ListItem::Scalar(self.parse_scalar())
        };

        if annotations.is_empty() {
            Ok(item)
        } else {
            Ok(ListItem::Annotated(Box::new(item), annotations))
        }
    }

    fn parse_service(&mut self, annotations: Vec<Annotation>) -> Result<Service, ParseError> {
        self.bump(); // 'service'
        let name_tok = self.expect(TokenKind::Ident, "service name")?;
        self.expect(TokenKind::LBrace, "{")?;
        let attributes = self.parse_container_body()?;
        Ok(Service {
            name: name_tok.text,
            attributes,
            annotations,
        })
    }

    /// Parses the body of `system { ... }` or `service NAME { ... }`:
    /// a sequence of attributes (and, at system scope, nested services —
    /// handled by the caller). Consumes the closing `}`.
    fn parse_container_body(&mut self) -> Result<OrderedMap, ParseError> {
        let mut attrs = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_kind() == TokenKind::RBrace {
                self.bump();
                break;
            }
            if self.peek_kind() == TokenKind::Eof {
                let (line, column) = self.loc();
                return Err(ParseError::UnmatchedDelimiter {
                    what: "{",
                    line,
                    column,
                });
            }
            let annotations = self.parse_annotations()?;
            if self.peek_kind() == TokenKind::RBrace {
                if !annotations.is_empty() {
                    let (line, column) = self.loc();
                    return Err(ParseError::TrailingAnnotation { line, column });
                }
                self.bump();
                break;
            }
            if !self.is_key_ahead() {
                let (line, column) = self.loc();
                return Err(ParseError::UnexpectedToken {
                    found: self.peek().text.clone(),
                    line,
                    column,
                });
            }
            let key_tok = self.bump();
            self.expect(TokenKind::Colon, ":")?;
            let value = self.parse_value_for_key(&key_tok.text)?;
            if attrs.iter().any(|a: &Attribute| a.key == key_tok.text) {
                return Err(ParseError::DuplicateKey {
                    key: key_tok.text,
                    line: key_tok.line,
                    column: key_tok.column,
                });
            }
            attrs.push(Attribute {
                key: key_tok.text,
                value,
                annotations,
            });
        }
        Ok(attrs)
    }

    fn parse_system(&mut self) -> Result<System, ParseError> {
        self.skip_newlines();
        if self.peek_kind() != TokenKind::Ident || self.peek().text != "system" {
            let (line, column) = self.loc();
            return Err(ParseError::MissingSystemRoot { line, column });
        }
        self.bump();
        if self.peek_kind() != TokenKind::LBrace {
            let (line, column) = self.loc();
            return Err(ParseError::MissingSystemRoot { line, column });
        }
        self.bump();

        let mut attributes = Vec::new();
        let mut services = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek_kind() == TokenKind::RBrace {
                self.bump();
                break;
            }
            if self.peek_kind() == TokenKind::Eof {
                let (line, column) = self.loc();
                return Err(ParseError::UnmatchedDelimiter {
                    what: "{",
                    line,
                    column,
                });
            }

            let annotations = self.parse_annotations()?;
            if self.peek_kind() == TokenKind::RBrace {
                if !annotations.is_empty() {
                    let (line, column) = self.loc();
                    return Err(ParseError::TrailingAnnotation { line, column });
                }
                self.bump();
                break;
            }

            if self.peek_kind() == TokenKind::Ident && self.peek().text == "service" {
                services.push(self.parse_service(annotations)?);
                continue;
            }

            if self.is_key_ahead() {
                let key_tok = self.bump();
                self.expect(TokenKind::Colon, ":")?;
                let value = self.parse_value_for_key(&key_tok.text)?;
                if attributes.iter().any(|a: &Attribute| a.key == key_tok.text) {
                    return Err(ParseError::DuplicateKey {
                        key: key_tok.text,
                        line: key_tok.line,
                        column: key_tok.column,
                    });
                }
                attributes.push(Attribute {
                    key: key_tok.text,
                    value,
                    annotations,
                });
                continue;
            }

            let (line, column) = self.loc();
            return Err(ParseError::UnexpectedToken {
                found: self.peek().text.clone(),
                line,
                column,
            });
        }

        Ok(System {
            attributes,
            services,
        })
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<System, ParseError> {
    Parser::new(tokens).parse_system()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> System {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_minimal_system() {
        let sys = parse_src("system { type: microservices }");
        assert_eq!(sys.attributes.len(), 1);
        assert_eq!(sys.attributes[0].key, "type");
        assert_eq!(sys.attributes[0].value, Value::String("microservices".into()));
    }

    #[test]
    fn missing_root_errors() {
        let err = parse(tokenize("foo { }").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::MissingSystemRoot { .. }));
    }

    #[test]
    fn duplicate_key_errors() {
        let err = parse(tokenize("system { a: 1\na: 2 }").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateKey { .. }));
    }

    #[test]
    fn trailing_annotation_errors() {
        let err = parse(tokenize("system { @Foo }").unwrap()).unwrap_err();
        assert!(matches!(err, ParseError::TrailingAnnotation { .. }));
    }

    #[test]
    fn nested_service_with_list() {
        let sys = parse_src("system { type: microservices  service s { langs: [go] } }");
        assert_eq!(sys.services.len(), 1);
        assert_eq!(sys.services[0].name, "s");
    }

    #[test]
    fn map_with_string_values_stay_strings() {
        let sys = parse_src("system { mail: { driver: smtp, port: 587 } }");
        match &sys.attributes[0].value {
            Value::Map(m) => {
                assert_eq!(m[1].value, Value::String("587".to_string()));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn raw_only_map_collapses_to_string() {
        let sys = parse_src("system { notes: {\nfirst line\nsecond line\n} }");
        assert_eq!(
            sys.attributes[0].value,
            Value::String("first line\nsecond line".to_string())
        );
    }

    #[test]
    fn comma_and_newline_separators_are_equivalent() {
        let a = parse_src("system { a: [x, y, z] }");
        let b = parse_src("system { a: [x\ny\nz] }");
        assert_eq!(a, b);
    }
}
