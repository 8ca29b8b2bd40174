//! SiMAL: a tokenizer, recursive-descent parser, and JSON lowering pipeline
//! for a dense, brace-delimited language describing software systems
//! (services, components, APIs, data types, runtime config).
//!
//! The pipeline is tokenize ([`lexer`]) → parse ([`parser`], producing an
//! [`ast::System`], enriching `endpoints` items inline via [`enrich`]) →
//! lower ([`lower::full`] or [`lower::simple`]). [`pipeline`] wires the
//! phases together for callers who want the whole thing in one call.

pub mod ast;
pub mod enrich;
pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod pipeline;
pub mod token;

pub use error::SimalError;
pub use pipeline::run_all;
