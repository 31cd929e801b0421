//! Template definitions, groups and instances
//!
//! A [`Group`] compiles template sources into [`TemplateDefinition`]s and
//! resolves names through its imports. A [`TemplateInstance`] binds one
//! definition to attribute values and renders it.
//!
//! # Example
//!
//! ```text
//! // group source
//! page(title, items) ::= <<
//! <title>: <items:{it | [<it>]}; separator=", ">
//! >>
//! ```

mod definition;
mod group;
mod instance;

pub use definition::{TemplateDefinition, TemplateKind, ANONYMOUS};
pub use group::{Group, GroupError};
pub use instance::{BindError, TemplateInstance};
