//! Property-based tests for two structural properties of the grammar that
//! are best checked over a distribution of inputs rather than a handful of
//! literal examples: comma/newline separator equivalence, and heredoc
//! dedent.

use proptest::prelude::*;
use simal::lexer::tokenize;
use simal::pipeline::run_all;
use simal::token::TokenKind;

fn idents() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{1,7}"
}

proptest! {
    /// Replacing every top-level `,` in a list with a `NEWLINE` (or vice
    /// versa) must yield the same AST.
    #[test]
    fn comma_and_newline_list_separators_are_equivalent(items in prop::collection::vec(idents(), 1..6)) {
        let with_commas = format!("system {{ a: [{}] }}", items.join(", "));
        let with_newlines = format!("system {{ a: [{}] }}", items.join("\n"));

        let a = run_all(&with_commas).expect("comma form should parse");
        let b = run_all(&with_newlines).expect("newline form should parse");
        prop_assert_eq!(a, b);
    }

    /// Same equivalence, for a generic map's entries.
    #[test]
    fn comma_and_newline_map_separators_are_equivalent(
        keys in prop::collection::vec(idents(), 1..5),
        vals in prop::collection::vec(idents(), 1..5),
    ) {
        let n = keys.len().min(vals.len());
        let entries: Vec<String> = (0..n).map(|i| format!("{}: {}", keys[i], vals[i])).collect();
        prop_assume!(!entries.is_empty());

        let with_commas = format!("system {{ m: {{{}}} }}", entries.join(", "));
        let with_newlines = format!("system {{ m: {{{}}} }}", entries.join("\n"));

        let a = run_all(&with_commas);
        let b = run_all(&with_newlines);
        // A duplicate key (from randomly colliding idents) is a parse error
        // on both sides identically; only compare successful parses.
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert_eq!(a, b);
        }
    }

    /// If every non-empty collected heredoc line shares a leading-whitespace
    /// prefix of length k, the resulting string has that prefix stripped
    /// from each such line, with no newline added before or after.
    #[test]
    fn heredoc_dedents_common_whitespace_prefix(
        lines in prop::collection::vec(idents(), 1..6),
        indent in 0usize..6,
    ) {
        let pad = " ".repeat(indent);
        let body: Vec<String> = lines.iter().map(|l| format!("{}{}", pad, l)).collect();
        let src = format!("<<DOC\n{}\nDOC\n", body.join("\n"));

        let tokens = tokenize(&src).expect("heredoc should tokenize");
        let string_tok = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();

        let expected = lines.join("\n");
        prop_assert_eq!(&string_tok.text, &expected);
    }
}
