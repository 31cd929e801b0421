//! Parsers for template bodies and group sources

pub mod ast;
pub mod group;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::parse_template;
pub use group::{parse_group, TemplateDecl};
