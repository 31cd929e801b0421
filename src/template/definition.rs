//! Compiled template definitions

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::Delimiters;
use crate::diagnostic::Location;
use crate::error::CompileError;
use crate::parser::ast::{Element, Expr, Spanned, Subtemplate, TemplateRef};
use crate::parser::parse_template;

/// Name given to root templates compiled without a signature
pub const ANONYMOUS: &str = "anonymous";

/// How a definition came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Declared with a name and formal parameters
    Named,
    /// Root template compiled from a bare source string; any attribute may be
    /// attached to it
    AdHoc,
    /// `{...}` literal inside another template
    Subtemplate,
}

/// A compiled template. Immutable once compiled.
#[derive(Debug)]
pub struct TemplateDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub kind: TemplateKind,
    pub body: Vec<Element>,
    /// Body text of the outermost template, shared by its subtemplates
    source: Arc<str>,
}

impl TemplateDefinition {
    /// Compile a template body
    ///
    /// Every `{...}` literal in the body becomes its own definition named
    /// `_subN`, numbered from `counter` in order of appearance.
    pub fn compile(
        name: impl Into<String>,
        params: Vec<String>,
        kind: TemplateKind,
        source: &str,
        delimiters: &Delimiters,
        counter: &AtomicUsize,
    ) -> Result<Self, Vec<CompileError>> {
        let mut body = parse_template(source, delimiters)?;
        let source: Arc<str> = Arc::from(source);

        let compiler = SubtemplateCompiler {
            source: &source,
            counter,
        };
        compiler.elements(&mut body);

        Ok(Self {
            name: name.into(),
            params,
            kind,
            body,
            source,
        })
    }

    /// Name shown in call contexts
    pub fn display_name(&self) -> &str {
        match self.kind {
            TemplateKind::Named => &self.name,
            TemplateKind::AdHoc | TemplateKind::Subtemplate => ANONYMOUS,
        }
    }

    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Line and column of a byte offset in the body
    pub fn location(&self, offset: usize) -> Location {
        Location::from_offset(&self.source, offset)
    }

    /// Whether `name` is declared by this template
    pub fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Walks a freshly parsed body and compiles its subtemplate literals
struct SubtemplateCompiler<'a> {
    source: &'a Arc<str>,
    counter: &'a AtomicUsize,
}

impl SubtemplateCompiler<'_> {
    fn elements(&self, elements: &mut [Element]) {
        for element in elements {
            match element {
                Element::Text(_) => {}
                Element::Island(island) => {
                    self.expr(&mut island.expr);
                    if let Some(sep) = island.options.separator.as_mut() {
                        self.expr(sep);
                    }
                    if let Some(null) = island.options.null.as_mut() {
                        self.expr(null);
                    }
                }
                Element::If(block) => {
                    for (cond, body) in &mut block.branches {
                        self.expr(cond);
                        self.elements(body);
                    }
                    if let Some(otherwise) = block.otherwise.as_mut() {
                        self.elements(otherwise);
                    }
                }
            }
        }
    }

    fn exprs(&self, exprs: &mut [Spanned<Expr>]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    fn expr(&self, expr: &mut Spanned<Expr>) {
        match &mut expr.node {
            Expr::Str(_) | Expr::Bool(_) | Expr::Attribute(_) => {}
            Expr::Property { target, .. } => self.expr(target),
            Expr::IndirectProperty { target, member } => {
                self.expr(target);
                self.expr(member);
            }
            Expr::Include { args, .. } => self.exprs(args),
            Expr::IndirectInclude { name, args } => {
                self.expr(name);
                self.exprs(args);
            }
            Expr::Call { arg, .. } => self.expr(arg),
            Expr::List(items) => self.exprs(items),
            Expr::Subtemplate(sub) => self.subtemplate(sub),
            Expr::Map { target, stages } => {
                self.expr(target);
                for stage in stages {
                    for template in stage {
                        self.template_ref(template);
                    }
                }
            }
            Expr::Zip { lists, template } => {
                self.exprs(lists);
                self.template_ref(template);
            }
            Expr::Not(inner) => self.expr(inner),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                self.expr(lhs);
                self.expr(rhs);
            }
        }
    }

    fn template_ref(&self, template: &mut Spanned<TemplateRef>) {
        match &mut template.node {
            TemplateRef::Named { args, .. } => self.exprs(args),
            TemplateRef::Indirect { name, args } => {
                self.expr(name);
                self.exprs(args);
            }
            TemplateRef::Anonymous(sub) => self.subtemplate(sub),
        }
    }

    fn subtemplate(&self, sub: &mut Subtemplate) {
        let Subtemplate::Source { params, body } = sub else {
            return;
        };

        // outer literals are numbered before the ones nested in their bodies
        let index = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let params = params.iter().map(|p| p.node.to_string()).collect();
        let mut body = std::mem::take(body);
        self.elements(&mut body);

        *sub = Subtemplate::Compiled(Arc::new(TemplateDefinition {
            name: format!("_sub{}", index),
            params,
            kind: TemplateKind::Subtemplate,
            body,
            source: Arc::clone(self.source),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str, counter: &AtomicUsize) -> TemplateDefinition {
        TemplateDefinition::compile(
            "t",
            vec![],
            TemplateKind::Named,
            source,
            &Delimiters::default(),
            counter,
        )
        .expect("Should compile")
    }

    fn subtemplate_names(def: &TemplateDefinition) -> Vec<String> {
        let mut names = Vec::new();
        collect(&def.body, &mut names);
        names
    }

    fn collect(elements: &[Element], names: &mut Vec<String>) {
        for element in elements {
            if let Element::Island(island) = element {
                if let Expr::Map { stages, .. } = &island.expr.node {
                    for template in stages.iter().flatten() {
                        if let TemplateRef::Anonymous(Subtemplate::Compiled(def)) = &template.node {
                            names.push(def.name.clone());
                            collect(&def.body, names);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_subtemplates_are_numbered_outer_first() {
        let counter = AtomicUsize::new(0);
        let def = compile("<a:{x | <x:{y | <y>}>}> <b:{z | <z>}>", &counter);
        assert_eq!(subtemplate_names(&def), vec!["_sub1", "_sub2", "_sub3"]);
    }

    #[test]
    fn test_counter_is_shared_across_templates() {
        let counter = AtomicUsize::new(0);
        compile("<a:{x | <x>}>", &counter);
        let second = compile("<b:{y | <y>}>", &counter);
        assert_eq!(subtemplate_names(&second), vec!["_sub2"]);
    }

    #[test]
    fn test_display_names() {
        let counter = AtomicUsize::new(0);
        let named = compile("x", &counter);
        assert_eq!(named.display_name(), "t");

        let adhoc = TemplateDefinition::compile(
            ANONYMOUS,
            vec![],
            TemplateKind::AdHoc,
            "x",
            &Delimiters::default(),
            &counter,
        )
        .expect("Should compile");
        assert_eq!(adhoc.display_name(), "anonymous");
    }

    #[test]
    fn test_location_is_relative_to_body() {
        let counter = AtomicUsize::new(0);
        let def = compile("line one\n  <x>", &counter);
        assert_eq!(def.location(11), Location::new(2, 2));
    }

    #[test]
    fn test_compile_error() {
        let counter = AtomicUsize::new(0);
        let result = TemplateDefinition::compile(
            "t",
            vec![],
            TemplateKind::Named,
            "<foo(>",
            &Delimiters::default(),
            &counter,
        );
        assert!(result.is_err());
    }
}
