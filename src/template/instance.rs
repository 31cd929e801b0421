//! Template instances: a definition bound to attribute values

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::RenderConfig;
use crate::diagnostic::{DiagnosticSink, ErrorBuffer, Location};
use crate::interp::scope::accumulate;
use crate::interp::{Interpreter, Rendered};
use crate::resolver::{DefaultResolver, ModelResolver};
use crate::template::definition::{TemplateDefinition, TemplateKind};
use crate::template::group::Group;
use crate::value::Value;

/// Errors from binding attributes through the host API
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("no such attribute: {name} in template {template}")]
    NoSuchAttribute { template: String, name: String },
}

/// A template definition plus the attribute values it renders with
#[derive(Clone)]
pub struct TemplateInstance {
    def: Arc<TemplateDefinition>,
    /// Group the definition was found in
    group: Arc<Group>,
    /// Group that plain template lookups start from when this instance is
    /// the root of a render
    render_group: Arc<Group>,
    attributes: BTreeMap<String, Value>,
    call_site: Option<Location>,
}

impl TemplateInstance {
    pub fn new(def: Arc<TemplateDefinition>, group: Arc<Group>) -> Self {
        Self {
            def,
            render_group: Arc::clone(&group),
            group,
            attributes: BTreeMap::new(),
            call_site: None,
        }
    }

    /// Instance created while rendering, for an include or a map iteration
    pub(crate) fn invoked(
        def: Arc<TemplateDefinition>,
        group: Arc<Group>,
        attributes: BTreeMap<String, Value>,
        call_site: Location,
    ) -> Self {
        Self {
            def,
            render_group: Arc::clone(&group),
            group,
            attributes,
            call_site: Some(call_site),
        }
    }

    /// Attach an iteration attribute unless a parameter of that name exists
    pub(crate) fn with_implicit(mut self, name: &str, value: Value) -> Self {
        if !self.def.declares(name) {
            self.attributes.insert(name.to_string(), value);
        }
        self
    }

    pub(crate) fn set_render_group(&mut self, group: Arc<Group>) {
        self.render_group = group;
    }

    pub fn definition(&self) -> &Arc<TemplateDefinition> {
        &self.def
    }

    pub fn group(&self) -> &Arc<Group> {
        &self.group
    }

    pub fn render_group(&self) -> &Arc<Group> {
        &self.render_group
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn call_site(&self) -> Option<Location> {
        self.call_site
    }

    fn check_declared(&self, name: &str) -> Result<(), BindError> {
        match self.def.kind {
            TemplateKind::AdHoc => Ok(()),
            _ if self.def.declares(name) => Ok(()),
            _ => Err(BindError::NoSuchAttribute {
                template: self.def.name.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Set an attribute, replacing any previous value
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, BindError> {
        self.check_declared(name)?;
        self.attributes.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// Add a value to an attribute; repeated adds build a list
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, BindError> {
        self.check_declared(name)?;
        accumulate(&mut self.attributes, name.to_string(), value.into());
        Ok(self)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Arc<TemplateDefinition>,
        Arc<Group>,
        BTreeMap<String, Value>,
        Option<Location>,
    ) {
        (self.def, self.group, self.attributes, self.call_site)
    }

    /// Render with the group's render configuration and the default resolver
    pub fn render(&self, sink: &mut dyn DiagnosticSink) -> String {
        let config = self.render_group.config().render.clone();
        self.render_with(&DefaultResolver, sink, config)
    }

    /// Render with an explicit resolver and configuration
    pub fn render_with(
        &self,
        resolver: &dyn ModelResolver,
        sink: &mut dyn DiagnosticSink,
        config: RenderConfig,
    ) -> String {
        let mut interpreter =
            Interpreter::new(Arc::clone(&self.render_group), resolver, sink, config);
        interpreter.render(self)
    }

    /// Render and collect the diagnostics and trace
    pub fn evaluate(&self) -> Rendered {
        let config = self.render_group.config().render.clone();
        let mut buffer = ErrorBuffer::new();
        let (text, trace) = {
            let mut interpreter = Interpreter::new(
                Arc::clone(&self.render_group),
                &DefaultResolver,
                &mut buffer,
                config,
            );
            let text = interpreter.render(self);
            (text, interpreter.into_trace())
        };
        Rendered {
            text,
            diagnostics: buffer.into_inner(),
            trace,
        }
    }
}

impl fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateInstance")
            .field("name", &self.def.name)
            .field("group", &self.group.name())
            .field("attributes", &self.attributes)
            .finish()
    }
}
