//! Stencil - a text template engine with groups, `super` dispatch and
//! non-fatal render diagnostics
//!
//! Templates are compiled once into a [`Group`] and rendered against
//! attribute values bound to a [`TemplateInstance`]. Problems found while
//! rendering (unknown templates, argument count mismatches, undefined
//! attributes) never stop the render; they are reported to a
//! [`DiagnosticSink`] with the call context and the location in the template.
//!
//! # Example
//!
//! ```rust
//! use stencil::{render_group, Value};
//!
//! let rendered = render_group(
//!     r#"greet(names) ::= "<names:{n | Hello, <n>!}; separator=\" \">""#,
//!     "greet",
//!     vec![("names", Value::from(vec!["Ter", "Tom"]))],
//! )
//! .unwrap();
//!
//! assert_eq!(rendered.text, "Hello, Ter! Hello, Tom!");
//! assert!(rendered.diagnostics.is_empty());
//! ```

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod interp;
pub mod parser;
pub mod resolver;
pub mod template;
pub mod value;

pub use config::{ConfigError, Delimiters, EngineConfig, RenderConfig};
pub use diagnostic::{
    Diagnostic, DiagnosticKind, DiagnosticSink, ErrorBuffer, Location, LogSink, Severity,
};
pub use error::CompileError;
pub use interp::{Interpreter, Rendered, TraceEvent};
pub use resolver::{DefaultResolver, ModelResolver};
pub use template::{BindError, Group, GroupError, TemplateDefinition, TemplateInstance};
pub use value::{AccessError, HostObject, Member, MemberKind, Record, Value, Visibility};

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur before a render starts
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error building the group
    #[error(transparent)]
    Group(#[from] GroupError),

    /// Error binding an attribute
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The requested template is not defined
    #[error("no such template: {0}")]
    NoSuchTemplate(String),
}

/// Render one template of a group source with default configuration
///
/// Diagnostics are collected into the returned [`Rendered`].
pub fn render_group<I, S>(
    group_source: &str,
    template: &str,
    attributes: I,
) -> Result<Rendered, RenderError>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let group = Arc::new(Group::from_source("main", group_source)?);
    let mut instance = group
        .instance_of(template)
        .ok_or_else(|| RenderError::NoSuchTemplate(template.to_string()))?;
    for (name, value) in attributes {
        instance.bind(name.as_ref(), value)?;
    }
    Ok(instance.evaluate())
}

/// Render a template source that has no signature; every attribute given is
/// visible to it
///
/// # Example
///
/// ```rust
/// use stencil::{render_adhoc, Value};
///
/// let rendered = render_adhoc("<trim(s)>", vec![("s", Value::from(34))]).unwrap();
/// assert_eq!(rendered.text, "");
/// assert_eq!(
///     rendered.diagnostics[0].to_string(),
///     "context [anonymous] 1:1 function trim expects a string not i64"
/// );
/// ```
pub fn render_adhoc<I, S>(source: &str, attributes: I) -> Result<Rendered, RenderError>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let group = Arc::new(Group::new("main"));
    let mut instance = group.adhoc(source)?;
    for (name, value) in attributes {
        instance.add(name.as_ref(), value)?;
    }
    Ok(instance.evaluate())
}
