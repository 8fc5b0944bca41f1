//! Binding resolver: infers data-variable types from property usage and
//! renders the forwarding statements that push variable updates into live
//! widgets.

use std::collections::HashSet;

use crate::ast::DynamicValue;

/// The storage/read type pair of one data variable: the reactive wrapper
/// stored in the generated `$data` struct, and the plain type handed to
/// subscriber callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarType {
    pub wrapper: String,
    pub base: String,
}

impl VarType {
    pub fn string() -> Self {
        VarType {
            wrapper: "EFVar<QString>".to_string(),
            base: "const QString&".to_string(),
        }
    }

    pub fn boolean() -> Self {
        VarType {
            wrapper: "EFVar<bool>".to_string(),
            base: "bool".to_string(),
        }
    }

    pub fn float() -> Self {
        VarType {
            wrapper: "EFVar<float>".to_string(),
            base: "float".to_string(),
        }
    }

    pub fn double() -> Self {
        VarType {
            wrapper: "EFVar<double>".to_string(),
            base: "double".to_string(),
        }
    }

    pub fn int() -> Self {
        VarType {
            wrapper: "EFVar<int>".to_string(),
            base: "int".to_string(),
        }
    }

    /// Resolve a user-written `(type)` annotation. The well-known keywords
    /// map to the canonical pairs; any other text `T` wraps as `EFVar<T>`
    /// read through `const T&`.
    pub fn from_annotation(annotation: &str) -> Self {
        match annotation {
            "string" => VarType::string(),
            "bool" => VarType::boolean(),
            "float" => VarType::float(),
            "double" => VarType::double(),
            "int" => VarType::int(),
            other => VarType {
                wrapper: format!("EFVar<{other}>"),
                base: format!("const {other}&"),
            },
        }
    }

    /// True for variables whose assignment should go through `tr(...)`.
    pub fn is_stringish(&self) -> bool {
        self.wrapper.to_lowercase().contains("string")
    }
}

/// Property-name classification sets deciding the inferred type of a
/// variable first referenced from a given property. Injected configuration:
/// seeded with the built-in Qt property names and extended from the user's
/// extra config, never shared mutable state.
#[derive(Debug, Clone)]
pub struct PropertyClasses {
    string_props: HashSet<String>,
    bool_props: HashSet<String>,
    float_props: HashSet<String>,
    double_props: HashSet<String>,
}

const BUILTIN_STRING_PROPS: &[&str] = &[
    "windowTitle",
    "text",
    "placeholderText",
    "title",
    "currentText",
    "styleSheet",
    "statusTip",
    "toolTip",
    "whatsThis",
    "accessibleName",
    "accessibleDescription",
    "windowFilePath",
    "windowRole",
];

const BUILTIN_BOOL_PROPS: &[&str] = &[
    "checked",
    "enabled",
    "openExternalLinks",
    "acceptDrops",
    "autoFillBackground",
    "editFocus",
    "mouseTracking",
    "tabletTracking",
    "updatesEnabled",
    "disabled",
    "hidden",
    "visible",
    "windowModified",
    "documentMode",
    "animated",
    "dockNestingEnabled",
    "unifiedTitleAndToolBarOnMac",
    "defaultUp",
    "nativeMenuBar",
    "separatorsCollapsible",
    "tearOffEnabled",
    "toolTipsVisible",
    "widgetResizable",
];

impl Default for PropertyClasses {
    fn default() -> Self {
        PropertyClasses {
            string_props: BUILTIN_STRING_PROPS.iter().map(|s| s.to_string()).collect(),
            bool_props: BUILTIN_BOOL_PROPS.iter().map(|s| s.to_string()).collect(),
            float_props: HashSet::new(),
            double_props: HashSet::new(),
        }
    }
}

impl PropertyClasses {
    /// Extend the classification sets from user configuration.
    pub fn extend(
        &mut self,
        string_props: &[String],
        bool_props: &[String],
        float_props: &[String],
        double_props: &[String],
    ) {
        self.string_props.extend(string_props.iter().cloned());
        self.bool_props.extend(bool_props.iter().cloned());
        self.float_props.extend(float_props.iter().cloned());
        self.double_props.extend(double_props.iter().cloned());
    }

    /// Infer the type pair for a variable first referenced from `prop_name`.
    /// Everything not classified is integer-valued.
    pub fn type_for(&self, prop_name: &str) -> VarType {
        if self.string_props.contains(prop_name) {
            VarType::string()
        } else if self.bool_props.contains(prop_name) {
            VarType::boolean()
        } else if self.float_props.contains(prop_name) {
            VarType::float()
        } else if self.double_props.contains(prop_name) {
            VarType::double()
        } else {
            VarType::int()
        }
    }

    pub fn is_string_prop(&self, prop_name: &str) -> bool {
        self.string_props.contains(prop_name)
    }
}

/// Split a raw variable path into its canonical dotted name and the
/// explicit type annotation, if its first segment carries one:
/// `(int)count.total` -> (`count.total`, int pair).
pub fn parse_var_name(raw_path: &str) -> (String, Option<VarType>) {
    if let Some(rest) = raw_path.strip_prefix('(') {
        if let Some((annotation, name)) = rest.split_once(')') {
            if !annotation.is_empty() {
                return (name.to_string(), Some(VarType::from_annotation(annotation)));
            }
        }
    }
    (raw_path.to_string(), None)
}

/// Render the setter-argument expression of a dynamic property: literal
/// segments and variable reads in declaration order. String-typed
/// properties wrap literals in `tr(...)` and join with `+`; everything
/// else joins positionally.
pub fn dynamic_args(prop_name: &str, value: &DynamicValue, classes: &PropertyClasses) -> String {
    if value.is_bare_var() {
        let (name, _) = parse_var_name(&value.vars[0].path);
        return format!("*$data.{name}");
    }

    let string_prop = classes.is_string_prop(prop_name);
    let mut args = Vec::new();
    for (i, var) in value.vars.iter().enumerate() {
        let literal = &value.segments[i];
        if !literal.is_empty() {
            if string_prop {
                args.push(format!("tr(\"{}\")", escape_cpp_string(literal)));
            } else {
                args.push(literal.clone());
            }
        }
        let (name, _) = parse_var_name(&var.path);
        args.push(format!("*$data.{name}"));
    }
    let trailing = &value.segments[value.vars.len()];
    if !trailing.is_empty() {
        if string_prop {
            args.push(format!("tr(\"{}\")", escape_cpp_string(trailing)));
        } else {
            args.push(trailing.clone());
        }
    }

    if string_prop {
        args.join(" + ")
    } else {
        args.join("")
    }
}

/// Render the forwarding statement run whenever any variable referenced by
/// this dynamic property changes.
pub fn dynamic_handler(
    inner_name: &str,
    prop_name: &str,
    value: &DynamicValue,
    classes: &PropertyClasses,
) -> String {
    format!(
        "{inner_name}->set{}({});",
        capitalize_first(prop_name),
        dynamic_args(prop_name, value, classes)
    )
}

pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn escape_cpp_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
