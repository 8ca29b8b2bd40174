//! Hand-written tokenizer for SiMAL source text.
//!
//! Converts UTF-8 source into a flat [`Token`] stream. No heuristics: every
//! rule here (identifier continuation set, heredoc dedent, arrow detection)
//! is a fixed part of the grammar rather than guessed at.

use crate::error::LexError;
use crate::token::{Token, TokenKind};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            input: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' => {
                    self.advance();
                }
                '\n' | '\r' => {
                    let (line, column) = (self.line, self.column);
                    self.consume_newline_run();
                    tokens.push(Token::new(TokenKind::Newline, "\n", line, column));
                }
                '{' => tokens.push(self.single(TokenKind::LBrace, "{")),
                '}' => tokens.push(self.single(TokenKind::RBrace, "}")),
                '[' => tokens.push(self.single(TokenKind::LBracket, "[")),
                ']' => tokens.push(self.single(TokenKind::RBracket, "]")),
                '(' => tokens.push(self.single(TokenKind::LParen, "(")),
                ')' => tokens.push(self.single(TokenKind::RParen, ")")),
                ':' => tokens.push(self.single(TokenKind::Colon, ":")),
                ',' => tokens.push(self.single(TokenKind::Comma, ",")),
                '@' => tokens.push(self.single(TokenKind::At, "@")),
                '"' | '\'' => tokens.push(self.read_quoted(ch)?),
                '-' if self.peek_at(1) == Some('>') => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    tokens.push(Token::new(TokenKind::Arrow, "->", line, column));
                }
                '<' if self.peek_at(1) == Some('<') && self.heredoc_label_follows() => {
                    tokens.push(self.read_heredoc()?);
                }
                c if is_ident_start(c) => tokens.push(self.read_ident()),
                c if c.is_ascii_digit() => tokens.push(self.read_number_like()),
                _ => {
                    let (line, column) = (self.line, self.column);
                    let text = ch.to_string();
                    self.advance();
                    tokens.push(Token::new(TokenKind::Ident, text, line, column));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind, text: &str) -> Token {
        let (line, column) = (self.line, self.column);
        self.advance();
        Token::new(kind, text, line, column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Consumes one logical line break plus any further blank lines,
    /// collapsing the run into the single `NEWLINE` the caller emits.
    fn consume_newline_run(&mut self) {
        loop {
            match self.peek() {
                Some('\r') => {
                    self.advance();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                Some('\n') => {
                    self.advance();
                }
                Some(' ') | Some('\t') => {
                    // Peek past horizontal whitespace to see if another
                    // blank line follows; if not, leave it for the main
                    // loop to skip.
                    let mut lookahead = self.position;
                    while matches!(self.input.get(lookahead), Some(' ') | Some('\t')) {
                        lookahead += 1;
                    }
                    if matches!(self.input.get(lookahead), Some('\n') | Some('\r')) {
                        while self.position < lookahead {
                            self.advance();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_ident(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if text.is_empty() {
                if is_ident_start(c) {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            } else if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Ident, text, line, column)
    }

    /// A digit-led run (`587`, `12.5`, `v2-beta` is not this — that starts
    /// with a letter and goes through `read_ident`). Digits cannot begin an
    /// identifier under the grammar's strict rule, but an unbroken run of
    /// them still has to come back as one token, not one `IDENT` per digit.
    fn read_number_like(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Ident, text, line, column)
    }

    fn read_quoted(&mut self, delim: char) -> Result<Token, LexError> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening delimiter
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString { line, column });
                }
                Some(c) if c == delim => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::String, text, line, column))
    }

    /// True if `<<` at the current position is immediately followed by a
    /// valid label identifier (no intervening whitespace).
    fn heredoc_label_follows(&self) -> bool {
        self.peek_at(2).map(is_ident_start).unwrap_or(false)
    }

    fn read_heredoc(&mut self) -> Result<Token, LexError> {
        let (line, column) = (self.line, self.column);
        self.advance(); // first '<'
        self.advance(); // second '<'

        let mut label = String::new();
        while let Some(c) = self.peek() {
            if label.is_empty() && is_ident_start(c) {
                label.push(c);
                self.advance();
            } else if !label.is_empty() && is_ident_continue(c) {
                label.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // Skip to end of the `<<LABEL` line.
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.advance();
        }
        if self.peek() == Some('\r') {
            self.advance();
        }
        if self.peek() == Some('\n') {
            self.advance();
        }

        let mut collected: Vec<String> = Vec::new();
        loop {
            if self.peek().is_none() {
                return Err(LexError::UnterminatedHeredoc { label, line, column });
            }
            let line_start = self.position;
            while let Some(c) = self.peek() {
                if c == '\n' || c == '\r' {
                    break;
                }
                self.advance();
            }
            let raw_line: String = self.input[line_start..self.position].iter().collect();

            let at_eof = self.peek().is_none();
            if self.peek() == Some('\r') {
                self.advance();
            }
            if self.peek() == Some('\n') {
                self.advance();
            }

            if raw_line.trim() == label {
                break;
            }
            if at_eof && raw_line.trim() != label {
                return Err(LexError::UnterminatedHeredoc { label, line, column });
            }
            collected.push(raw_line);
        }

        let dedent = collected
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
            .min()
            .unwrap_or(0);

        let body = collected
            .iter()
            .map(|l| {
                if l.trim().is_empty() {
                    l.clone()
                } else {
                    l.chars().skip(dedent).collect::<String>()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Token::new(TokenKind::String, body, line, column))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '-' | '\'')
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn skips_horizontal_whitespace() {
        assert_eq!(kinds("  {  }  "), vec![TokenKind::LBrace, TokenKind::RBrace, TokenKind::Eof]);
    }

    #[test]
    fn collapses_blank_lines() {
        let toks = tokenize("a\n\n\nb").unwrap();
        assert_eq!(
            toks.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn arrow_is_two_char_token() {
        assert_eq!(kinds("a -> b"), vec![TokenKind::Ident, TokenKind::Arrow, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn lone_dash_is_ident() {
        assert_eq!(kinds("a - b"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn identifier_allows_dots_slashes_dashes_quotes() {
        let toks = tokenize("postgres-12 a.b/c d'e").unwrap();
        let texts: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["postgres-12", "a.b/c", "d'e", ""]);
    }

    #[test]
    fn unknown_symbol_is_single_char_ident() {
        let toks = tokenize("a + b").unwrap();
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[1].text, "+");
    }

    #[test]
    fn quoted_string_is_verbatim() {
        let toks = tokenize(r#""meta[name=csrf-token]""#).unwrap();
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text, "meta[name=csrf-token]");
    }

    #[test]
    fn unterminated_quote_errors() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn heredoc_dedents_common_prefix() {
        let src = "<<SQL\n    select 1\n    from dual\n    SQL\nafter";
        let toks = tokenize(src).unwrap();
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text, "select 1\nfrom dual");
    }

    #[test]
    fn digit_run_is_one_token() {
        let toks = tokenize("port: 587").unwrap();
        assert_eq!(toks[2].text, "587");
        assert_eq!(toks[2].kind, TokenKind::Ident);
    }

    #[test]
    fn unterminated_heredoc_errors() {
        let err = tokenize("<<SQL\nselect 1\n").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedHeredoc { .. }));
    }
}
