//! Map and zip iteration
//!
//! `items : t()` applies a template to every element; `a, b : t()` walks
//! several lists in lock-step. Lists of different lengths are padded with
//! Absent up to the longest one.

use std::sync::Arc;

use crate::diagnostic::DiagnosticKind;
use crate::parser::ast::{Expr, Spanned, Subtemplate, TemplateRef};
use crate::template::{Group, TemplateDefinition, TemplateInstance, TemplateKind};
use crate::value::Value;

use super::Interpreter;

/// A mapped template resolved once per map construct
struct Applied {
    def: Arc<TemplateDefinition>,
    group: Arc<Group>,
    /// Arguments written after the name, `t(extra...)`
    extra: Vec<Value>,
}

impl Applied {
    /// Param-less subtemplates receive the element as `it`
    fn binds_it(&self) -> bool {
        self.def.kind == TemplateKind::Subtemplate && self.def.params.is_empty()
    }
}

impl<'r> Interpreter<'r> {
    fn resolve_ref(&mut self, template: &Spanned<TemplateRef>) -> Option<Applied> {
        match &template.node {
            TemplateRef::Named {
                name,
                args,
                is_super,
            } => {
                let extra = self.eval_args(args);
                let at = if *is_super {
                    template.span.start
                } else {
                    self.island_start
                };
                let (group, def) = self.resolve_template(name.node.as_str(), *is_super, at)?;
                Some(Applied { def, group, extra })
            }
            TemplateRef::Indirect { name, args } => {
                let name = self.eval(name);
                let name = self.text_of(name);
                let extra = self.eval_args(args);
                let at = self.island_start;
                let (group, def) = self.resolve_template(&name, false, at)?;
                Some(Applied { def, group, extra })
            }
            TemplateRef::Anonymous(Subtemplate::Compiled(def)) => Some(Applied {
                def: Arc::clone(def),
                group: self.current_group(),
                extra: Vec::new(),
            }),
            TemplateRef::Anonymous(Subtemplate::Source { .. }) => None,
        }
    }

    fn eval_args(&mut self, args: &[Spanned<Expr>]) -> Vec<Value> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    /// One application of `value : t1(), t2(), ...`
    ///
    /// Templates are used round-robin. Absent elements are not passed to a
    /// template and stay Absent in the result.
    pub(super) fn map(&mut self, value: Value, alternates: &[Spanned<TemplateRef>]) -> Value {
        let applied: Vec<Option<Applied>> =
            alternates.iter().map(|t| self.resolve_ref(t)).collect();
        if applied.is_empty() {
            return Value::Absent;
        }

        let mut results = Vec::new();
        let mut checked = false;
        let mut index = 0;
        for element in value.into_elements() {
            if element.is_absent() {
                results.push(Value::Absent);
                continue;
            }

            let slot = index % applied.len();
            let result = match &applied[slot] {
                Some(template) => {
                    let span = alternates[slot].span.clone();
                    let instance = if template.binds_it() {
                        self.instantiate(
                            Arc::clone(&template.def),
                            Arc::clone(&template.group),
                            Vec::new(),
                            span,
                            false,
                        )
                        .with_implicit("it", element)
                    } else {
                        let mut args = Vec::with_capacity(1 + template.extra.len());
                        args.push(element);
                        args.extend(template.extra.iter().cloned());
                        self.instantiate(
                            Arc::clone(&template.def),
                            Arc::clone(&template.group),
                            args,
                            span,
                            !checked,
                        )
                    };
                    checked = true;
                    Value::from(with_index(instance, index))
                }
                None => Value::Absent,
            };
            results.push(result);
            index += 1;
        }
        Value::List(results)
    }

    /// `l1, ..., lK : t()` over the longest list
    pub(super) fn zip(
        &mut self,
        lists: &[Spanned<Expr>],
        template: &Spanned<TemplateRef>,
    ) -> Value {
        let columns: Vec<Vec<Value>> = lists
            .iter()
            .map(|list| self.eval(list).into_elements())
            .collect();
        let Some(applied) = self.resolve_ref(template) else {
            return Value::Absent;
        };

        let mapped = columns.len();
        let declared = applied.def.arity();
        if mapped != declared {
            self.report(
                DiagnosticKind::MapArityMismatch {
                    template: applied.def.display_name().to_string(),
                    declared,
                    mapped,
                },
                template.span.clone(),
            );
        }

        let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut results = Vec::with_capacity(rows);
        for index in 0..rows {
            let mut args: Vec<Value> = columns
                .iter()
                .map(|column| column.get(index).cloned().unwrap_or_default())
                .collect();
            args.extend(applied.extra.iter().cloned());

            let instance = self.instantiate(
                Arc::clone(&applied.def),
                Arc::clone(&applied.group),
                args,
                template.span.clone(),
                index == 0,
            );
            results.push(Value::from(with_index(instance, index)));
        }
        Value::List(results)
    }
}

/// Bind the iteration attributes `i` (from 1) and `i0` (from 0)
fn with_index(instance: TemplateInstance, index: usize) -> TemplateInstance {
    instance
        .with_implicit("i", Value::from(index + 1))
        .with_implicit("i0", Value::from(index))
}
