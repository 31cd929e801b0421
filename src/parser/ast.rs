//! Abstract Syntax Tree types for template bodies

use std::sync::Arc;

use crate::template::TemplateDefinition;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Attribute, template or member name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One piece of a template body
#[derive(Debug, Clone)]
pub enum Element {
    /// Literal text
    Text(String),
    /// An expression island: `<expr; options>`
    Island(Island),
    /// `<if(c)>...<elseif(c)>...<else>...<endif>`
    If(IfBlock),
}

#[derive(Debug, Clone)]
pub struct Island {
    pub expr: Spanned<Expr>,
    pub options: Options,
    /// Span of the start delimiter
    pub open: Span,
}

/// Options after `;` in an island
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub separator: Option<Spanned<Expr>>,
    pub null: Option<Spanned<Expr>>,
    /// Accepted for compatibility; line wrapping is not performed
    pub anchor: bool,
    pub wrap: bool,
}

#[derive(Debug, Clone)]
pub struct IfBlock {
    /// `if` followed by any `elseif` branches
    pub branches: Vec<(Spanned<Expr>, Vec<Element>)>,
    pub otherwise: Option<Vec<Element>>,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    First,
    Last,
    Rest,
    Trunc,
    Reverse,
    Strip,
    Length,
    Trim,
    Strlen,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "rest" => Some(Self::Rest),
            "trunc" => Some(Self::Trunc),
            "reverse" => Some(Self::Reverse),
            "strip" => Some(Self::Strip),
            "length" => Some(Self::Length),
            "trim" => Some(Self::Trim),
            "strlen" => Some(Self::Strlen),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Rest => "rest",
            Self::Trunc => "trunc",
            Self::Reverse => "reverse",
            Self::Strip => "strip",
            Self::Length => "length",
            Self::Trim => "trim",
            Self::Strlen => "strlen",
        }
    }

    /// Functions whose argument must be a string
    pub fn requires_string(self) -> bool {
        matches!(self, Self::Trim | Self::Strlen)
    }
}

/// Expressions inside an island
#[derive(Debug, Clone)]
pub enum Expr {
    /// `"text"`
    Str(String),
    /// `true` / `false`
    Bool(bool),
    /// Bare attribute reference: `name`
    Attribute(Identifier),
    /// `target.member`
    Property {
        target: Box<Spanned<Expr>>,
        member: Spanned<Identifier>,
    },
    /// `target.(expr)`
    IndirectProperty {
        target: Box<Spanned<Expr>>,
        member: Box<Spanned<Expr>>,
    },
    /// `name(args)` or `super.name(args)`
    Include {
        name: Spanned<Identifier>,
        args: Vec<Spanned<Expr>>,
        is_super: bool,
    },
    /// `(expr)(args)`: include the template whose name `expr` evaluates to
    IndirectInclude {
        name: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    /// Built-in function call: `trim(x)`
    Call {
        function: Function,
        arg: Box<Spanned<Expr>>,
    },
    /// `[a, b, c]`
    List(Vec<Spanned<Expr>>),
    /// `{a, b | body}` used as a value
    Subtemplate(Subtemplate),
    /// `target : t1(), t2() : t3()`; each stage lists its alternates
    Map {
        target: Box<Spanned<Expr>>,
        stages: Vec<Vec<Spanned<TemplateRef>>>,
    },
    /// `a, b, c : t()`
    Zip {
        lists: Vec<Spanned<Expr>>,
        template: Box<Spanned<TemplateRef>>,
    },
    Not(Box<Spanned<Expr>>),
    And(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Or(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
}

/// Template applied by a map or zip
#[derive(Debug, Clone)]
pub enum TemplateRef {
    Named {
        name: Spanned<Identifier>,
        args: Vec<Spanned<Expr>>,
        is_super: bool,
    },
    Indirect {
        name: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Anonymous(Subtemplate),
}

/// An anonymous template literal
///
/// The grammar produces `Source`; compiling the enclosing template turns
/// every subtemplate into a `Compiled` definition.
#[derive(Debug, Clone)]
pub enum Subtemplate {
    Source {
        params: Vec<Spanned<Identifier>>,
        body: Vec<Element>,
    },
    Compiled(Arc<TemplateDefinition>),
}
