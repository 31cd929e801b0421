//! Attribute scopes
//!
//! Each template being rendered owns a [`Frame`]. Attribute lookup walks the
//! frames from the innermost outwards, so a template sees the attributes of
//! every template that (transitively) included it.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostic::Location;
use crate::template::{Group, TemplateDefinition, TemplateKind};
use crate::value::Value;

/// Attributes the interpreter defines while iterating
pub const IMPLICIT_ATTRIBUTES: [&str; 3] = ["it", "i", "i0"];

/// No frame on the chain declares the name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("attribute {name} isn't defined")]
pub struct Undeclared {
    pub name: String,
}

/// Add `value` to a possibly multi-valued binding
///
/// The first add binds the value itself; later adds turn the binding into a
/// list and append to it.
pub fn accumulate(attributes: &mut BTreeMap<String, Value>, name: String, value: Value) {
    match attributes.remove(&name) {
        None | Some(Value::Absent) => {
            attributes.insert(name, value);
        }
        Some(Value::List(mut items)) => {
            items.push(value);
            attributes.insert(name, Value::List(items));
        }
        Some(existing) => {
            attributes.insert(name, Value::List(vec![existing, value]));
        }
    }
}

/// Bindings of one executing template
#[derive(Debug)]
pub struct Frame {
    pub(crate) def: Arc<TemplateDefinition>,
    /// Group the template was found in, used for `super` calls
    pub(crate) group: Arc<Group>,
    attributes: BTreeMap<String, Value>,
    pub(crate) call_site: Option<Location>,
}

impl Frame {
    pub fn new(
        def: Arc<TemplateDefinition>,
        group: Arc<Group>,
        attributes: BTreeMap<String, Value>,
        call_site: Option<Location>,
    ) -> Self {
        Self {
            def,
            group,
            attributes,
            call_site,
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        accumulate(&mut self.attributes, name.into(), value.into());
    }

    /// Whether lookups of `name` stop at this frame
    pub fn declares(&self, name: &str) -> bool {
        if self.def.declares(name) {
            return true;
        }
        let attached = self.attributes.contains_key(name);
        match self.def.kind {
            TemplateKind::AdHoc => attached,
            _ => attached && IMPLICIT_ATTRIBUTES.contains(&name),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn definition(&self) -> &Arc<TemplateDefinition> {
        &self.def
    }
}

/// Stack of frames for one render
#[derive(Debug, Default)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Value of `name` in the innermost frame declaring it; declared but
    /// unbound names are Absent
    pub fn lookup(&self, name: &str) -> Result<Value, Undeclared> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.declares(name))
            .map(|frame| frame.get(name).cloned().unwrap_or_default())
            .ok_or_else(|| Undeclared {
                name: name.to_string(),
            })
    }

    /// Display names of the frames, outermost first
    pub fn context_names(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| frame.def.display_name().to_string())
            .collect()
    }
}
