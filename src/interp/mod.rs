//! Template interpreter
//!
//! Walks a compiled body against the frames of the current render, writing
//! text and reporting problems to the diagnostic sink. Every evaluation
//! returns a usable value, so a render always runs to completion.

mod functions;
mod iterate;
pub mod scope;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::RenderConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink, Location};
use crate::error::Span;
use crate::parser::ast::{Element, Expr, IfBlock, Island, Spanned, Subtemplate};
use crate::resolver::ModelResolver;
use crate::template::{Group, TemplateDefinition, TemplateInstance};
use crate::value::Value;

use scope::{Frame, Scope};

/// Output of a collected render
#[derive(Debug)]
pub struct Rendered {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Enter/exit events, recorded when tracing is enabled
    pub trace: Vec<TraceEvent>,
}

/// Template enter/exit event of a traced render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Enter { template: String, depth: usize },
    Exit { template: String, depth: usize },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Enter { template, depth } => {
                write!(f, "{:indent$}enter {}", "", template, indent = depth * 2)
            }
            TraceEvent::Exit { template, depth } => {
                write!(f, "{:indent$}exit {}", "", template, indent = depth * 2)
            }
        }
    }
}

/// Formatting options in effect while writing one island
#[derive(Debug, Clone, Default)]
struct WriteOptions {
    separator: Option<String>,
    null: Option<String>,
}

pub struct Interpreter<'r> {
    /// Group the render was started in; plain lookups start here
    root: Arc<Group>,
    resolver: &'r dyn ModelResolver,
    sink: &'r mut dyn DiagnosticSink,
    config: RenderConfig,
    scope: Scope,
    /// Start of the enclosing island, where failed plain includes report
    island_start: usize,
    trace: Vec<TraceEvent>,
}

impl<'r> Interpreter<'r> {
    pub fn new(
        root: Arc<Group>,
        resolver: &'r dyn ModelResolver,
        sink: &'r mut dyn DiagnosticSink,
        config: RenderConfig,
    ) -> Self {
        Self {
            root,
            resolver,
            sink,
            config,
            scope: Scope::new(),
            island_start: 0,
            trace: Vec::new(),
        }
    }

    /// Render an instance in a new frame
    pub fn render(&mut self, instance: &TemplateInstance) -> String {
        let (def, group, attributes, call_site) = instance.clone().into_parts();
        self.enter(Frame::new(Arc::clone(&def), group, attributes, call_site));

        let saved_island = self.island_start;
        let mut out = String::new();
        self.write_elements(&def.body, &mut out);
        self.island_start = saved_island;

        self.exit();
        out
    }

    pub fn into_trace(self) -> Vec<TraceEvent> {
        self.trace
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    fn enter(&mut self, frame: Frame) {
        let template = frame.definition().display_name().to_string();
        self.scope.push(frame);
        if self.config.trace {
            let depth = self.scope.depth();
            match self.scope.current().and_then(|f| f.call_site) {
                Some(site) => log::trace!("enter {} from {}", self.context(), site),
                None => log::trace!("enter {}", self.context()),
            }
            self.trace.push(TraceEvent::Enter { template, depth });
        }
    }

    fn exit(&mut self) {
        if self.config.trace {
            log::trace!("exit {}", self.context());
        }
        let depth = self.scope.depth();
        if let Some(frame) = self.scope.pop() {
            if self.config.trace {
                self.trace.push(TraceEvent::Exit {
                    template: frame.definition().display_name().to_string(),
                    depth,
                });
            }
        }
    }

    fn context(&self) -> String {
        self.scope.context_names().join(" ")
    }

    fn current_definition(&self) -> Option<&Arc<TemplateDefinition>> {
        self.scope.current().map(|f| f.definition())
    }

    /// Native group of the executing template
    fn current_group(&self) -> Arc<Group> {
        self.scope
            .current()
            .map(|f| Arc::clone(&f.group))
            .unwrap_or_else(|| Arc::clone(&self.root))
    }

    /// Report a diagnostic at `offset` in the executing template's body
    fn report(&mut self, kind: DiagnosticKind, span: Span) {
        let source = self
            .current_definition()
            .map(|def| Arc::clone(def.source()))
            .unwrap_or_else(|| Arc::from(""));
        let diagnostic = Diagnostic::new(kind, self.scope.context_names(), span, source);
        if self.config.trace {
            log::trace!("diagnostic: {}", diagnostic);
        }
        self.sink.receive(diagnostic);
    }

    fn call_site(&self, offset: usize) -> Location {
        self.current_definition()
            .map(|def| def.location(offset))
            .unwrap_or_default()
    }

    fn write_elements(&mut self, elements: &[Element], out: &mut String) {
        for element in elements {
            match element {
                Element::Text(text) => out.push_str(text),
                Element::Island(island) => self.write_island(island, out),
                Element::If(block) => self.write_if(block, out),
            }
        }
    }

    fn write_island(&mut self, island: &Island, out: &mut String) {
        self.island_start = island.open.start;
        let value = self.eval(&island.expr);

        let separator = island.options.separator.as_ref().map(|e| {
            let v = self.eval(e);
            self.text_of(v)
        });
        let null = island.options.null.as_ref().map(|e| {
            let v = self.eval(e);
            self.text_of(v)
        });

        self.write_value(value, &WriteOptions { separator, null }, out);
    }

    fn write_if(&mut self, block: &IfBlock, out: &mut String) {
        for (cond, body) in &block.branches {
            self.island_start = cond.span.start;
            if self.eval(cond).is_truthy() {
                self.write_elements(body, out);
                return;
            }
        }
        if let Some(otherwise) = &block.otherwise {
            self.write_elements(otherwise, out);
        }
    }

    /// Write a value as text
    fn write_value(&mut self, value: Value, options: &WriteOptions, out: &mut String) {
        match value {
            Value::Absent => {
                if let Some(null) = &options.null {
                    out.push_str(null);
                }
            }
            Value::Str(s) => out.push_str(&s),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
                if let Some(text) = value.as_text() {
                    out.push_str(&text);
                }
            }
            Value::List(items) => self.write_list(items, options, out),
            Value::Map(map) => {
                let keys = map.into_keys().map(Value::Str).collect();
                self.write_list(keys, options, out)
            }
            Value::Object(obj) => out.push_str(&obj.render()),
            Value::Template(instance) => {
                let text = self.render(&instance);
                out.push_str(&text);
            }
        }
    }

    fn write_list(&mut self, items: Vec<Value>, options: &WriteOptions, out: &mut String) {
        let mut first = true;
        for item in items {
            if item.is_absent() && options.null.is_none() {
                continue;
            }
            if !first {
                if let Some(separator) = &options.separator {
                    out.push_str(separator);
                }
            }
            first = false;
            self.write_value(item, options, out);
        }
    }

    /// Render a value to text without options
    fn text_of(&mut self, value: Value) -> String {
        let mut out = String::new();
        self.write_value(value, &WriteOptions::default(), &mut out);
        out
    }

    fn eval(&mut self, expr: &Spanned<Expr>) -> Value {
        match &expr.node {
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Attribute(name) => self.lookup(name.as_str(), expr.span.clone()),
            Expr::Property { target, member } => {
                let host = self.eval(target);
                self.property(&host, member.node.as_str())
            }
            Expr::IndirectProperty { target, member } => {
                let host = self.eval(target);
                let name = self.eval(member);
                let name = self.text_of(name);
                self.property(&host, &name)
            }
            Expr::Include {
                name,
                args,
                is_super,
            } => {
                let args = args.iter().map(|a| self.eval(a)).collect();
                let at = if *is_super {
                    expr.span.start
                } else {
                    self.island_start
                };
                self.include(name.node.as_str(), *is_super, args, at, name.span.clone())
            }
            Expr::IndirectInclude { name, args } => {
                let template = self.eval(name);
                let template = self.text_of(template);
                let args = args.iter().map(|a| self.eval(a)).collect();
                let at = self.island_start;
                self.include(&template, false, args, at, name.span.clone())
            }
            Expr::Call { function, arg } => {
                let value = self.eval(arg);
                match functions::apply(*function, value) {
                    Ok(result) => result,
                    Err(found) => {
                        self.report(
                            DiagnosticKind::TypeMismatch {
                                function: function.name().to_string(),
                                found,
                            },
                            expr.span.clone(),
                        );
                        Value::Absent
                    }
                }
            }
            Expr::List(items) => {
                let mut list = Vec::new();
                for item in items {
                    match self.eval(item) {
                        Value::Absent => {}
                        Value::List(inner) => {
                            list.extend(inner.into_iter().filter(|v| !v.is_absent()))
                        }
                        other => list.push(other),
                    }
                }
                Value::List(list)
            }
            Expr::Subtemplate(sub) => match sub {
                Subtemplate::Compiled(def) => {
                    let group = self.current_group();
                    let site = self.call_site(expr.span.start);
                    Value::from(TemplateInstance::invoked(
                        Arc::clone(def),
                        group,
                        BTreeMap::new(),
                        site,
                    ))
                }
                Subtemplate::Source { .. } => Value::Absent,
            },
            Expr::Map { target, stages } => {
                let mut value = self.eval(target);
                for stage in stages {
                    value = self.map(value, stage);
                }
                value
            }
            Expr::Zip { lists, template } => self.zip(lists, template),
            Expr::Not(inner) => Value::Bool(!self.eval(inner).is_truthy()),
            Expr::And(lhs, rhs) => {
                let result = self.eval(lhs).is_truthy() && self.eval(rhs).is_truthy();
                Value::Bool(result)
            }
            Expr::Or(lhs, rhs) => {
                let result = self.eval(lhs).is_truthy() || self.eval(rhs).is_truthy();
                Value::Bool(result)
            }
        }
    }

    fn lookup(&mut self, name: &str, span: Span) -> Value {
        match self.scope.lookup(name) {
            Ok(value) => value,
            Err(undeclared) => {
                self.report(
                    DiagnosticKind::UndeclaredAttribute {
                        name: undeclared.name,
                    },
                    span,
                );
                Value::Absent
            }
        }
    }

    fn property(&self, host: &Value, member: &str) -> Value {
        if host.is_absent() {
            return Value::Absent;
        }
        self.resolver.resolve(host, member).unwrap_or_default()
    }

    /// Find a template by name, reporting `no such template` at `at` when
    /// it does not exist
    fn resolve_template(
        &mut self,
        name: &str,
        is_super: bool,
        at: usize,
    ) -> Option<(Arc<Group>, Arc<TemplateDefinition>)> {
        let found = if is_super {
            self.current_group().lookup_super(name)
        } else {
            self.root.lookup(name)
        };
        if found.is_none() {
            let name = if is_super {
                format!("super.{}", name)
            } else {
                name.to_string()
            };
            self.report(DiagnosticKind::UnresolvedTemplate { name }, at..at + 1);
        }
        found
    }

    /// Template call: resolve, bind positional arguments, return the
    /// instance to be rendered where it is written
    fn include(
        &mut self,
        name: &str,
        is_super: bool,
        args: Vec<Value>,
        at: usize,
        name_span: Span,
    ) -> Value {
        match self.resolve_template(name, is_super, at) {
            Some((group, def)) => {
                Value::from(self.instantiate(def, group, args, name_span, true))
            }
            None => Value::Absent,
        }
    }

    /// Bind `args` positionally to the parameters of `def`
    ///
    /// A count mismatch is reported at `span` when `check` is set; the
    /// first `min(passed, declared)` parameters are bound either way.
    fn instantiate(
        &mut self,
        def: Arc<TemplateDefinition>,
        group: Arc<Group>,
        args: Vec<Value>,
        span: Span,
        check: bool,
    ) -> TemplateInstance {
        if check && args.len() != def.arity() {
            self.report(
                DiagnosticKind::ArityMismatch {
                    template: def.name.clone(),
                    passed: args.len(),
                    declared: def.arity(),
                },
                span.clone(),
            );
        }

        let attributes = def
            .params
            .iter()
            .cloned()
            .zip(args)
            .collect::<BTreeMap<_, _>>();
        let site = self.call_site(span.start);
        TemplateInstance::invoked(def, group, attributes, site)
    }
}
