//! Parsed template shape consumed by the semantic builder.
//!
//! The grammar itself lives in [`crate::parser`]; everything downstream of
//! the parser depends only on these types.

use std::collections::BTreeMap;

/// One node of a parsed template: either an instantiated widget (with its
/// nested children) or a named mounting-point placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Widget(WidgetDecl),
    MountingPoint(MountingPointDecl),
}

/// A widget declaration as written in the template, before any class
/// inference or name assignment happens.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDecl {
    /// Declared type name, possibly carrying a `!Override` class suffix.
    pub type_name: String,
    /// User-declared reference alias (`>QLineEdit#nameInput`).
    pub ref_alias: Option<String>,
    /// Property lines in declaration order.
    pub properties: Vec<(String, PropValue)>,
    /// Signal lines in declaration order.
    pub signals: Vec<SignalDecl>,
    /// Free-form extra attributes (`%position`, `%width`, ...).
    pub extra_attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

/// A placeholder slot external code may mount content into at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct MountingPointDecl {
    pub name: String,
    pub is_list: bool,
}

/// A property value: set once at construction, or re-evaluated whenever a
/// referenced data variable changes.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Static(String),
    Dynamic(DynamicValue),
}

/// A dynamic property expression: literal segments interleaved with
/// variable references. `segments.len() == vars.len() + 1`, with empty
/// strings standing in for absent literals.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub segments: Vec<String>,
    pub vars: Vec<VarRef>,
}

impl DynamicValue {
    /// True when the expression is exactly one variable with no
    /// surrounding literal text; such expressions collapse to a direct
    /// read of the variable.
    pub fn is_bare_var(&self) -> bool {
        self.vars.len() == 1 && self.segments.iter().all(|s| s.is_empty())
    }
}

/// One variable reference inside a dynamic expression. The path may carry
/// a `(type)` annotation on its first segment; the binding resolver strips
/// and interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub path: String,
    pub default: Option<String>,
}

/// A native signal mapped to a user-supplied handler name.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDecl {
    pub name: String,
    /// Ordered argument type list from the `signal:type,type` form.
    pub args: Vec<String>,
    pub handler: String,
}
