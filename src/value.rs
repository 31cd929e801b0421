//! Attribute values and the host object contract
//!
//! Attributes are whatever the host binds to a template instance. Plain data
//! (strings, numbers, lists, maps) is represented directly; anything with
//! members of its own is a [`HostObject`] that describes its accessors and
//! fields so the resolver can find them by name.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::template::TemplateInstance;

/// A value bound to an attribute or produced while evaluating an expression
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value. Distinct from an empty list.
    #[default]
    Absent,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Rc<dyn HostObject>),
    /// A template instance used as a value; it renders lazily where written
    Template(Box<TemplateInstance>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Runtime type descriptor used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Absent => "absent".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Int(_) => "i64".to_string(),
            Value::Float(_) => "f64".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Object(obj) => obj.type_name().to_string(),
            Value::Template(_) => "Template".to_string(),
        }
    }

    /// Truthiness for conditionals
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// View the value as a sequence for iteration.
    ///
    /// Lists yield their elements, maps their keys, Absent nothing, and any
    /// other value yields itself once.
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            Value::Absent => Vec::new(),
            Value::List(items) => items,
            Value::Map(map) => map.into_keys().map(Value::Str).collect(),
            other => vec![other],
        }
    }

    /// Number of elements [`Value::into_elements`] would yield
    pub fn element_count(&self) -> usize {
        match self {
            Value::Absent => 0,
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            _ => 1,
        }
    }

    /// Text of a plain scalar, if this is one
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Absent)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Rc<dyn HostObject>> for Value {
    fn from(obj: Rc<dyn HostObject>) -> Self {
        Value::Object(obj)
    }
}

impl From<TemplateInstance> for Value {
    fn from(instance: TemplateInstance) -> Self {
        Value::Template(Box::new(instance))
    }
}

/// Who may see a host member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

/// Whether a member is read by calling an accessor or by reading a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Zero-argument accessor such as `getName`, `isActive` or `name`
    Accessor,
    Field,
}

/// Description of one host member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
}

impl Member {
    pub fn accessor(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Accessor,
            visibility,
        }
    }

    pub fn field(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            visibility,
        }
    }
}

/// Failure while reading a host member
#[derive(Debug, Error)]
#[error("cannot read {member} on {type_name}: {reason}")]
pub struct AccessError {
    pub type_name: String,
    pub member: String,
    pub reason: String,
}

/// An object from the host environment whose shape is only known at runtime
pub trait HostObject: fmt::Debug {
    /// Runtime type descriptor, shown in type-mismatch diagnostics
    fn type_name(&self) -> &str;

    /// Every member the object has, visible or not
    fn members(&self) -> Vec<Member>;

    /// Read one member previously returned by [`HostObject::members`]
    fn get(&self, member: &Member) -> Result<Value, AccessError>;

    /// Text written when the object itself is rendered
    fn render(&self) -> String {
        self.type_name().to_string()
    }
}

/// A host object assembled from named members, for hosts without their own
/// types and for tests
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    members: Vec<(Member, Value)>,
    display: Option<String>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
            display: None,
        }
    }

    /// Add an accessor member
    pub fn with_accessor(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        value: impl Into<Value>,
    ) -> Self {
        self.members
            .push((Member::accessor(name, visibility), value.into()));
        self
    }

    /// Add a field member
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        value: impl Into<Value>,
    ) -> Self {
        self.members.push((Member::field(name, visibility), value.into()));
        self
    }

    /// Set the text written when the record itself is rendered
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(self))
    }
}

impl HostObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn members(&self) -> Vec<Member> {
        self.members.iter().map(|(m, _)| m.clone()).collect()
    }

    fn get(&self, member: &Member) -> Result<Value, AccessError> {
        self.members
            .iter()
            .find(|(m, _)| m == member)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| AccessError {
                type_name: self.type_name.clone(),
                member: member.name.clone(),
                reason: "no such member".to_string(),
            })
    }

    fn render(&self) -> String {
        self.display
            .clone()
            .unwrap_or_else(|| self.type_name.clone())
    }
}
