//! Template groups for storing, importing and resolving template definitions

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::error::CompileError;
use crate::parser::parse_group;
use crate::template::definition::{TemplateDefinition, TemplateKind, ANONYMOUS};
use crate::template::instance::TemplateInstance;

/// Errors that can occur while building a group
#[derive(Debug, Error)]
pub enum GroupError {
    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// A template body failed to compile
    #[error("error compiling template {name}: {}", first_message(.errors))]
    Compile {
        name: String,
        /// Template body the error spans refer to
        source_text: String,
        errors: Vec<CompileError>,
    },

    /// The group source itself is malformed
    #[error("error reading group source: {}", first_message(.errors))]
    Syntax {
        source_text: String,
        errors: Vec<CompileError>,
    },
}

fn first_message(errors: &[CompileError]) -> String {
    match errors {
        [] => "unknown error".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

impl GroupError {
    /// Format every compile error with source context using ariadne
    pub fn format(&self, filename: &str) -> String {
        match self {
            GroupError::Duplicate { .. } => self.to_string(),
            GroupError::Compile {
                name,
                source_text,
                errors,
            } => {
                let label = format!("{}:{}", filename, name);
                errors
                    .iter()
                    .map(|e| e.format(source_text, &label))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            GroupError::Syntax {
                source_text,
                errors,
            } => errors
                .iter()
                .map(|e| e.format(source_text, filename))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A named collection of templates plus the groups it imports
///
/// Groups are built with `&mut self` and then shared by `Arc` while
/// rendering; they are not modified afterwards.
#[derive(Debug, Default)]
pub struct Group {
    name: String,
    config: EngineConfig,
    templates: HashMap<String, Arc<TemplateDefinition>>,
    /// Searched in order after the group's own templates
    imports: Vec<Arc<Group>>,
    /// Numbers `_subN` subtemplates of every template compiled here
    sub_counter: AtomicUsize,
}

impl Group {
    /// Create a new empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EngineConfig::default())
    }

    /// Create a new empty group with configuration
    pub fn with_config(name: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            name: name.into(),
            config,
            templates: HashMap::new(),
            imports: Vec::new(),
            sub_counter: AtomicUsize::new(0),
        }
    }

    /// Create a group from a group source
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self, GroupError> {
        Self::from_source_with_config(name, source, EngineConfig::default())
    }

    /// Create a group from a group source with configuration
    pub fn from_source_with_config(
        name: impl Into<String>,
        source: &str,
        config: EngineConfig,
    ) -> Result<Self, GroupError> {
        let mut group = Self::with_config(name, config);
        group.load(source)?;
        Ok(group)
    }

    /// Define every template of a group source
    pub fn load(&mut self, source: &str) -> Result<(), GroupError> {
        let decls = parse_group(source).map_err(|errors| GroupError::Syntax {
            source_text: source.to_string(),
            errors,
        })?;

        for decl in decls {
            let params: Vec<&str> = decl.params.iter().map(String::as_str).collect();
            self.define(&decl.name, &params, &decl.body)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile and register a template
    pub fn define(&mut self, name: &str, params: &[&str], source: &str) -> Result<(), GroupError> {
        if self.templates.contains_key(name) {
            return Err(GroupError::Duplicate {
                name: name.to_string(),
            });
        }

        let def = TemplateDefinition::compile(
            name,
            params.iter().map(|p| p.to_string()).collect(),
            TemplateKind::Named,
            source,
            &self.config.delimiters,
            &self.sub_counter,
        )
        .map_err(|errors| GroupError::Compile {
            name: name.to_string(),
            source_text: source.to_string(),
            errors,
        })?;

        log::debug!("group {}: defined {}({})", self.name, name, params.join(", "));
        self.templates.insert(name.to_string(), Arc::new(def));
        Ok(())
    }

    /// Append `other` to the import list; importing the same group again
    /// leaves the list unchanged
    pub fn import(&mut self, other: Arc<Group>) {
        if self.imports.iter().any(|g| Arc::ptr_eq(g, &other)) {
            log::debug!("group {}: {} already imported", self.name, other.name);
            return;
        }
        log::debug!("group {}: importing {}", self.name, other.name);
        self.imports.push(other);
    }

    pub fn imports(&self) -> &[Arc<Group>] {
        &self.imports
    }

    /// A template defined directly in this group
    pub fn get(&self, name: &str) -> Option<&Arc<TemplateDefinition>> {
        self.templates.get(name)
    }

    /// Check if this group defines a template itself
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Get all template names defined directly in this group, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Find a template here or in the imports, depth-first in import order.
    /// Returns the group that defines it along with the definition.
    pub fn lookup(self: &Arc<Self>, name: &str) -> Option<(Arc<Group>, Arc<TemplateDefinition>)> {
        if let Some(def) = self.templates.get(name) {
            return Some((Arc::clone(self), Arc::clone(def)));
        }
        self.lookup_super(name)
    }

    /// Find a template in the imports only, skipping this group's own
    /// definitions
    pub fn lookup_super(&self, name: &str) -> Option<(Arc<Group>, Arc<TemplateDefinition>)> {
        let found = self.imports.iter().find_map(|import| import.lookup(name));
        if found.is_none() {
            log::debug!("group {}: no template {} in imports", self.name, name);
        }
        found
    }

    /// Compile a root template without a signature; any attribute may be
    /// attached to it
    pub fn adhoc(self: &Arc<Self>, source: &str) -> Result<TemplateInstance, GroupError> {
        let def = TemplateDefinition::compile(
            ANONYMOUS,
            Vec::new(),
            TemplateKind::AdHoc,
            source,
            &self.config.delimiters,
            &self.sub_counter,
        )
        .map_err(|errors| GroupError::Compile {
            name: ANONYMOUS.to_string(),
            source_text: source.to_string(),
            errors,
        })?;
        Ok(TemplateInstance::new(Arc::new(def), Arc::clone(self)))
    }

    /// A fresh, unbound instance of a template visible from this group
    pub fn instance_of(self: &Arc<Self>, name: &str) -> Option<TemplateInstance> {
        let (native, def) = self.lookup(name)?;
        let mut instance = TemplateInstance::new(def, native);
        instance.set_render_group(Arc::clone(self));
        Some(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut group = Group::new("g");
        group.define("t", &["x", "y"], "<x><y>").expect("Should define");
        let def = group.get("t").expect("defined");
        assert_eq!(def.params, vec!["x", "y"]);
        assert!(group.contains("t"));
        assert_eq!(group.names(), vec!["t"]);
    }

    #[test]
    fn test_duplicate_error() {
        let mut group = Group::new("g");
        group.define("t", &[], "a").expect("First define should succeed");
        let result = group.define("t", &[], "b");
        assert!(matches!(result, Err(GroupError::Duplicate { .. })));
    }

    #[test]
    fn test_compile_error_carries_source() {
        let mut group = Group::new("g");
        let result = group.define("t", &[], "<foo(>");
        match result {
            Err(GroupError::Compile {
                name, source_text, ..
            }) => {
                assert_eq!(name, "t");
                assert_eq!(source_text, "<foo(>");
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_searches_imports_in_order() {
        let mut first = Group::new("first");
        first.define("t", &[], "first").expect("Should define");
        let mut second = Group::new("second");
        second.define("t", &[], "second").expect("Should define");
        second.define("u", &[], "u").expect("Should define");
        let first = Arc::new(first);
        let second = Arc::new(second);

        let mut root = Group::new("root");
        root.import(Arc::clone(&first));
        root.import(Arc::clone(&second));
        let root = Arc::new(root);

        let (native, _) = root.lookup("t").expect("found");
        assert_eq!(native.name(), "first");
        let (native, _) = root.lookup("u").expect("found");
        assert_eq!(native.name(), "second");
        assert!(root.lookup("v").is_none());
    }

    #[test]
    fn test_lookup_super_skips_own_templates() {
        let mut base = Group::new("base");
        base.define("t", &[], "base").expect("Should define");
        let mut derived = Group::new("derived");
        derived.define("t", &[], "derived").expect("Should define");
        derived.import(Arc::new(base));
        let derived = Arc::new(derived);

        let (native, _) = derived.lookup("t").expect("found");
        assert_eq!(native.name(), "derived");
        let (native, _) = derived.lookup_super("t").expect("found");
        assert_eq!(native.name(), "base");
    }

    #[test]
    fn test_import_is_idempotent() {
        let base = Arc::new(Group::new("base"));
        let other = Arc::new(Group::new("other"));
        let mut group = Group::new("g");
        group.import(Arc::clone(&base));
        group.import(Arc::clone(&other));
        group.import(Arc::clone(&base));
        let names: Vec<&str> = group.imports().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["base", "other"]);
    }

    #[test]
    fn test_from_source() {
        let group = Group::from_source("g", "t() ::= \"<u()>\"\nu(x) ::= <<\n<x>\n>>\n")
            .expect("Should load");
        assert_eq!(group.names(), vec!["t", "u"]);
    }

    #[test]
    fn test_from_source_syntax_error() {
        let result = Group::from_source("g", "t( ::= \"x\"");
        assert!(matches!(result, Err(GroupError::Syntax { .. })));
    }

    #[test]
    fn test_instance_of_and_adhoc() {
        let group = Arc::new(Group::from_source("g", "t() ::= \"x\"").expect("Should load"));
        assert!(group.instance_of("t").is_some());
        assert!(group.instance_of("missing").is_none());

        let adhoc = group.adhoc("<a>").expect("Should compile");
        assert_eq!(adhoc.definition().display_name(), "anonymous");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_compiled_templates_are_shareable_across_threads() {
        assert_send_sync::<Group>();
        assert_send_sync::<TemplateDefinition>();

        let group = Arc::new(
            Group::from_source("g", "t(xs) ::= \"<xs:{x | <x>}>\"").expect("Should load"),
        );
        let shared = Arc::clone(&group);
        let names = std::thread::spawn(move || {
            shared.lookup("t").map(|(_, def)| def.params.clone())
        })
        .join()
        .expect("reader thread");
        assert_eq!(names, Some(vec!["xs".to_string()]));
    }
}
