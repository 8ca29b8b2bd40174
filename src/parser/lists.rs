//! Context-sensitive list-item sub-parsers. Dispatch happens purely on the
//! enclosing attribute's key string, never on a heuristic of the item
//! contents — `components`/`fields`/`methods` are genuinely
//! ambiguous-looking without that key.

use super::endpoints;
use super::Parser;
use crate::ast::*;
use crate::error::ParseError;
use crate::token::TokenKind;

pub(crate) fn is_specialized(key: &str) -> bool {
    matches!(key, "components" | "fields" | "methods" | "endpoints")
}

/// Returns `Ok(Some(item))` when the specialized grammar for `key` matched;
/// `Ok(None)` to fall through to the generic list-item rule (only
/// `components` ever falls through).
pub(crate) fn parse_specialized_item(
    parser: &mut Parser,
    key: &str,
    annotations: &[Annotation],
) -> Result<Option<ListItem>, ParseError> {
    match key {
        "components" => parse_component(parser, annotations),
        "fields" => Ok(Some(parse_field(parser, annotations)?)),
        "methods" => Ok(Some(parse_method(parser, annotations)?)),
        "endpoints" => Ok(Some(endpoints::parse_endpoint(parser, annotations)?)),
        _ => Ok(None),
    }
}

fn parse_component(
    parser: &mut Parser,
    annotations: &[Annotation],
) -> Result<Option<ListItem>, ParseError> {
    let looks_like_block = parser.peek_kind() == TokenKind::Ident
        && parser.peek_at(1).kind == TokenKind::Ident
        && parser.peek_at(2).kind == TokenKind::LBrace;

    if !looks_like_block {
        return Ok(None);
    }

    let kind = parser.bump().text;
    let name = parser.bump().text;
    parser.bump(); // '{'
    let attributes = parser.parse_map_fields()?;
    Ok(Some(ListItem::Block(Block {
        kind,
        name,
        attributes,
        annotations: annotations.to_vec(),
    })))
}

fn take_visibility(parser: &mut Parser) -> Visibility {
    if parser.peek_kind() == TokenKind::Ident {
        let marker = match parser.peek().text.as_str() {
            "+" => Some(Visibility::Public),
            "-" => Some(Visibility::Private),
            "#" => Some(Visibility::Protected),
            _ => None,
        };
        if let Some(v) = marker {
            parser.bump();
            return v;
        }
    }
    Visibility::None
}

fn parse_field(parser: &mut Parser, annotations: &[Annotation]) -> Result<ListItem, ParseError> {
    let visibility = take_visibility(parser);
    let name_tok = parser.expect(TokenKind::Ident, "field name")?;
    if parser.peek_kind() != TokenKind::Colon {
        let (line, column) = parser.error_loc();
        return Err(ParseError::FieldMissingColon { line, column });
    }
    parser.bump();
    let type_string = parse_field_type(parser);
    Ok(ListItem::Field(Field {
        visibility,
        name: name_tok.text,
        type_string,
        annotations: annotations.to_vec(),
    }))
}

/// Reconstructs a field's type string, stopping at a top-level separator
/// the way [`Parser::parse_scalar`] does, but *also* stopping where the
/// next field item plainly begins (a visibility marker, or `IDENT COLON`)
/// — `fields` lists are routinely written with only whitespace between
/// items, so the type string can't be greedy about swallowing the rest of
/// the list.
fn parse_field_type(parser: &mut Parser) -> String {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    loop {
        match parser.peek_kind() {
            TokenKind::Eof => break,
            TokenKind::Newline | TokenKind::Comma if depth == 0 => break,
            TokenKind::RBracket | TokenKind::RBrace | TokenKind::RParen if depth == 0 => break,
            _ if depth == 0 && starts_next_field(parser) => break,
            _ => {
                let tok = parser.bump();
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

fn starts_next_field(parser: &Parser) -> bool {
    if parser.peek_kind() == TokenKind::Ident && matches!(parser.peek().text.as_str(), "+" | "-" | "#") {
        return true;
    }
    matches!(parser.peek_kind(), TokenKind::Ident | TokenKind::String)
        && parser.peek_at(1).kind == TokenKind::Colon
}

fn parse_method(parser: &mut Parser, annotations: &[Annotation]) -> Result<ListItem, ParseError> {
    let visibility = take_visibility(parser);
    let name_tok = parser.expect(TokenKind::Ident, "method name")?;

    let params = match parser.parse_paren_group()? {
        Some(p) => p,
        None => {
            let (line, column) = parser.error_loc();
            return Err(ParseError::MethodMissingParams { line, column });
        }
    };

    if parser.peek_kind() != TokenKind::Arrow {
        let (line, column) = parser.error_loc();
        return Err(ParseError::MethodMissingArrow { line, column });
    }
    parser.bump();

    let returns = parser.parse_scalar_stop_at_brace();

    let attributes = if parser.peek_kind() == TokenKind::LBrace {
        parser.bump();
        parser.parse_map_fields()?
    } else {
        Vec::new()
    };

    Ok(ListItem::Method(Method {
        visibility,
        name: name_tok.text,
        params,
        returns,
        attributes,
        annotations: annotations.to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::ast::{ListItem, Value, Visibility};
    use crate::error::ParseError;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn parse_src(src: &str) -> crate::ast::System {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn component_item_not_matching_block_shape_falls_through_to_scalar() {
        // `components` items that aren't `kind name { ... }` fall through to
        // the generic list-item rule rather than erroring.
        let sys = parse_src("system { service u { components: [ just-a-string ] } }");
        let items = match &sys.services[0].attributes[0].value {
            Value::List(items) => items,
            other => panic!("expected list, got {:?}", other),
        };
        assert_eq!(items, &vec![ListItem::Scalar("just-a-string".to_string())]);
    }

    #[test]
    fn method_with_attribute_body_is_parsed() {
        let sys = parse_src(
            "system { service u { methods: [ +GetUser(uuid string) -> User { description: fetch } ] } }",
        );
        let items = match &sys.services[0].attributes[0].value {
            Value::List(items) => items,
            other => panic!("expected list, got {:?}", other),
        };
        match &items[0] {
            ListItem::Method(m) => {
                assert_eq!(m.visibility, Visibility::Public);
                assert_eq!(m.name, "GetUser");
                assert_eq!(m.params, "uuid string");
                assert_eq!(m.returns, "User");
                assert_eq!(m.attributes.len(), 1);
                assert_eq!(m.attributes[0].key, "description");
            }
            other => panic!("expected method, got {:?}", other),
        }
    }

    #[test]
    fn method_without_params_errors() {
        let err = parse(tokenize("system { service u { methods: [ Foo -> Bar ] } }").unwrap())
            .unwrap_err();
        assert!(matches!(err, ParseError::MethodMissingParams { .. }));
    }

    #[test]
    fn method_without_arrow_errors() {
        let err = parse(tokenize("system { service u { methods: [ Foo() ] } }").unwrap())
            .unwrap_err();
        assert!(matches!(err, ParseError::MethodMissingArrow { .. }));
    }

    #[test]
    fn field_without_colon_errors() {
        let err = parse(tokenize("system { service u { fields: [ Name string ] } }").unwrap())
            .unwrap_err();
        assert!(matches!(err, ParseError::FieldMissingColon { .. }));
    }

    #[test]
    fn field_without_visibility_marker_defaults_to_none() {
        let sys = parse_src("system { service u { fields: [ Name: string ] } }");
        let items = match &sys.services[0].attributes[0].value {
            Value::List(items) => items,
            other => panic!("expected list, got {:?}", other),
        };
        match &items[0] {
            ListItem::Field(f) => assert_eq!(f.visibility, Visibility::None),
            other => panic!("expected field, got {:?}", other),
        }
    }
}
