//! Semantic builder: one preorder pass over the parsed template that
//! populates the intermediate model the code generator renders.
//!
//! Synthetic widget names are positional (`__widget_N`, N = arena index at
//! registration), so identical source text always produces identical names
//! and identical generated text; the hash-based build cache depends on
//! this.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::ast::{Node, PropValue};
use crate::bindings::{self, PropertyClasses, VarType};
use crate::placement::{self, classify_widget, WidgetClass};
use crate::EfError;

/// One instantiated widget, layout, action or mounting-point placeholder
/// in traversal order.
#[derive(Debug, Clone)]
pub struct WidgetRecord {
    /// Declared toolkit type, override suffix stripped. Empty for
    /// mounting-point placeholders.
    pub type_name: String,
    pub widget_class: WidgetClass,
    pub inner_name: String,
    pub parent: Option<String>,
    /// The layout this widget is added to, when that differs from its
    /// visual parent.
    pub parent_layout: Option<String>,
    pub extra: BTreeMap<String, String>,
    pub mount_point: bool,
}

/// A reactive value bound to one or more widget properties.
#[derive(Debug, Clone)]
pub struct DataVar {
    pub name: String,
    pub ty: VarType,
    pub default: Option<String>,
    /// One forwarding statement per distinct property expression reading
    /// this variable; all fire on every update.
    pub handlers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RefRecord {
    pub name: String,
    pub inner_name: String,
    pub type_name: String,
    pub widget_class: WidgetClass,
}

/// One signal-to-handler connection. Kept per signal line; deduplication
/// by handler name happens at render time.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub inner_name: String,
    pub inner_method_name: String,
    pub widget_type: String,
    pub signal_name: String,
    pub args: Vec<String>,
    pub handler_name: String,
}

#[derive(Debug, Clone)]
pub struct MountRecord {
    pub name: String,
    pub is_list: bool,
}

/// A registered property of one widget, static or dynamic.
#[derive(Debug, Clone)]
pub struct PropRecord {
    pub key: String,
    pub inner_name: String,
    pub prop_name: String,
    pub static_value: Option<String>,
    pub handler: Option<String>,
}

/// The fully built intermediate model of one template, consumed by the
/// code generator. Iteration order of every collection is
/// first-registration order.
#[derive(Debug, Clone, Default)]
pub struct CompiledModel {
    pub widgets: Vec<WidgetRecord>,
    pub data: Vec<DataVar>,
    pub refs: Vec<RefRecord>,
    pub methods: Vec<MethodRecord>,
    pub mounting_points: Vec<MountRecord>,
    pub props: Vec<PropRecord>,
    pub includes: BTreeSet<String>,
    /// Construction + attachment statements in traversal order, resolved
    /// by the placement engine at build time so structural errors surface
    /// here and never produce partial output.
    pub init_widgets: Vec<String>,
}

/// Build the intermediate model for one parsed template.
pub fn build_model(
    root: &Node,
    path: &str,
    classes: &PropertyClasses,
    no_auto_includes: &HashSet<String>,
) -> Result<CompiledModel, EfError> {
    let mut model = CompiledModel::default();
    walk(root, None, None, &mut model, classes, no_auto_includes);
    model.init_widgets = placement::resolve_initialization(&model.widgets)
        .map_err(|message| EfError::Structural {
            path: path.to_string(),
            message,
        })?;
    Ok(model)
}

fn walk(
    node: &Node,
    parent: Option<&str>,
    parent_layout: Option<&str>,
    model: &mut CompiledModel,
    classes: &PropertyClasses,
    no_auto_includes: &HashSet<String>,
) {
    match node {
        Node::Widget(decl) => {
            let (actual, widget_class) = classify_widget(&decl.type_name);
            let inner_name = format!("__widget_{}", model.widgets.len());
            model.widgets.push(WidgetRecord {
                type_name: actual.clone(),
                widget_class,
                inner_name: inner_name.clone(),
                parent: parent.map(str::to_string),
                parent_layout: parent_layout.map(str::to_string),
                extra: decl.extra_attrs.clone(),
                mount_point: false,
            });

            if actual.starts_with('Q') && !no_auto_includes.contains(&actual) {
                model.includes.insert(format!("<{actual}>"));
            }
            if let Some(alias) = &decl.ref_alias {
                model.refs.push(RefRecord {
                    name: alias.clone(),
                    inner_name: inner_name.clone(),
                    type_name: actual.clone(),
                    widget_class,
                });
            }

            register_props(&decl.properties, &inner_name, classes, model);

            for signal in &decl.signals {
                model.methods.push(MethodRecord {
                    inner_name: inner_name.clone(),
                    inner_method_name: format!("__handler_{}", signal.handler),
                    widget_type: actual.clone(),
                    signal_name: signal.name.clone(),
                    args: signal.args.clone(),
                    handler_name: signal.handler.clone(),
                });
            }

            // A layout becomes the parent-layout of its subtree but does
            // not change the structural parent handed down.
            let (child_parent, child_parent_layout) = if widget_class == WidgetClass::Layout {
                (parent, Some(inner_name.as_str()))
            } else {
                (Some(inner_name.as_str()), None)
            };
            for child in &decl.children {
                walk(
                    child,
                    child_parent,
                    child_parent_layout,
                    model,
                    classes,
                    no_auto_includes,
                );
            }
        }
        Node::MountingPoint(mp) => {
            model.mounting_points.push(MountRecord {
                name: mp.name.clone(),
                is_list: mp.is_list,
            });
            // Placeholder arena entry so attachment logic sees mounting
            // points uniformly.
            model.widgets.push(WidgetRecord {
                type_name: String::new(),
                widget_class: WidgetClass::Widget,
                inner_name: mp.name.clone(),
                parent: parent.map(str::to_string),
                parent_layout: parent_layout.map(str::to_string),
                extra: BTreeMap::new(),
                mount_point: true,
            });
        }
    }
}

/// Register one widget's properties, merging data-variable obligations:
/// handlers accumulate, the most recent explicit type annotation wins, and
/// the first default literal seen wins.
fn register_props(
    properties: &[(String, PropValue)],
    inner_name: &str,
    classes: &PropertyClasses,
    model: &mut CompiledModel,
) {
    for (prop_name, value) in properties {
        let key = format!("__{inner_name}_{prop_name}");
        if !model.props.iter().any(|p| p.key == key) {
            model.props.push(PropRecord {
                key: key.clone(),
                inner_name: inner_name.to_string(),
                prop_name: prop_name.clone(),
                static_value: None,
                handler: None,
            });
        }
        let Some(record) = model.props.iter_mut().find(|p| p.key == key) else {
            continue;
        };

        match value {
            PropValue::Static(text) => {
                record.static_value = Some(text.clone());
            }
            PropValue::Dynamic(dv) => {
                if record.handler.is_none() {
                    record.handler =
                        Some(bindings::dynamic_handler(inner_name, prop_name, dv, classes));
                }
                let handler = match &record.handler {
                    Some(handler) => handler.clone(),
                    None => continue,
                };

                for var in &dv.vars {
                    let (name, explicit_ty) = bindings::parse_var_name(&var.path);
                    if !model.data.iter().any(|d| d.name == name) {
                        let ty = explicit_ty
                            .clone()
                            .unwrap_or_else(|| classes.type_for(prop_name));
                        model.data.push(DataVar {
                            name: name.clone(),
                            ty,
                            default: None,
                            handlers: Vec::new(),
                        });
                    }
                    let Some(entry) = model.data.iter_mut().find(|d| d.name == name) else {
                        continue;
                    };
                    if let Some(ty) = explicit_ty {
                        entry.ty = ty;
                    }
                    if entry.default.is_none() {
                        if let Some(default) = &var.default {
                            entry.default = Some(default.clone());
                        }
                    }
                    entry.handlers.push(handler.clone());
                }
            }
        }
    }
}

/// Directives recovered from the raw source lines preceding the first
/// content line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMetadata {
    pub includes: Vec<String>,
    pub usings: Vec<String>,
    pub namespace: Option<String>,
    pub class_name: Option<String>,
}

/// Scan directive lines from raw template text: `;include`, `;namespace`,
/// `;classname`, `;using`. Scanning stops at the first content marker.
pub fn scan_metadata(source: &str) -> TemplateMetadata {
    let mut meta = TemplateMetadata::default();
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('>') {
            break;
        }
        if let Some(rest) = trimmed.strip_prefix(";include ") {
            let value = rest.to_string();
            if !meta.includes.contains(&value) {
                meta.includes.push(value);
            }
        } else if let Some(rest) = trimmed.strip_prefix(";namespace ") {
            meta.namespace = Some(rest.to_string());
        } else if let Some(rest) = trimmed.strip_prefix(";classname ") {
            meta.class_name = Some(rest.to_string());
        } else if let Some(rest) = trimmed.strip_prefix(";using ") {
            let value = rest.to_string();
            if !meta.usings.contains(&value) {
                meta.usings.push(value);
            }
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;

    fn build(src: &str) -> CompiledModel {
        let root = parse_template(src).expect("parse").expect("root");
        build_model(&root, "test.ef", &PropertyClasses::default(), &HashSet::new())
            .expect("build")
    }

    #[test]
    fn widgets_are_named_in_traversal_order() {
        let model = build(">QWidget\n\t>QVBoxLayout\n\t\t>QLabel\n\t\t>QLabel\n");
        let names: Vec<_> = model.widgets.iter().map(|w| w.inner_name.clone()).collect();
        assert_eq!(names, vec!["__widget_0", "__widget_1", "__widget_2", "__widget_3"]);
    }

    #[test]
    fn layout_keeps_structural_parent_for_grandchildren() {
        let model = build(">QWidget\n\t>QVBoxLayout\n\t\t>QLabel\n");
        let label = &model.widgets[2];
        assert_eq!(label.parent.as_deref(), Some("__widget_0"));
        assert_eq!(label.parent_layout.as_deref(), Some("__widget_1"));
    }

    #[test]
    fn variable_in_two_properties_accumulates_two_handlers() {
        let model = build(
            ">QWidget\n\t#windowTitle = {{title}}\n\t>QLabel\n\t\t#text = {{title}}\n",
        );
        assert_eq!(model.data.len(), 1);
        let var = &model.data[0];
        assert_eq!(var.handlers.len(), 2);
        assert_eq!(var.ty, VarType::string());
        assert!(var.handlers[0].contains("setWindowTitle"));
        assert!(var.handlers[1].contains("setText"));
    }

    #[test]
    fn first_default_wins() {
        let model = build(
            ">QWidget\n\t#windowTitle = {{title = First}}\n\t>QLabel\n\t\t#text = {{title = Second}}\n",
        );
        assert_eq!(model.data[0].default.as_deref(), Some("First"));
    }

    #[test]
    fn later_explicit_type_wins() {
        let model = build(
            ">QWidget\n\t#windowTitle = {{title}}\n\t>QLabel\n\t\t#text = {{(QStringList)title}}\n",
        );
        assert_eq!(model.data[0].ty.wrapper, "EFVar<QStringList>");
    }

    #[test]
    fn mounting_point_registers_twice() {
        let model = build(">QWidget\n\t-content\n");
        assert_eq!(model.mounting_points.len(), 1);
        assert!(!model.mounting_points[0].is_list);
        let placeholder = &model.widgets[1];
        assert!(placeholder.mount_point);
        assert_eq!(placeholder.inner_name, "content");
        assert_eq!(placeholder.parent.as_deref(), Some("__widget_0"));
        assert!(model
            .init_widgets
            .contains(&"content.__set_widget(__widget_0);".to_string()));
    }

    #[test]
    fn refs_and_auto_includes_register() {
        let model = build(">QWidget\n\t>QPushButton#ok\n");
        assert_eq!(model.refs.len(), 1);
        assert_eq!(model.refs[0].name, "ok");
        assert_eq!(model.refs[0].type_name, "QPushButton");
        assert!(model.includes.contains("<QWidget>"));
        assert!(model.includes.contains("<QPushButton>"));
    }

    #[test]
    fn suppressed_types_get_no_auto_include() {
        let root = parse_template(">QWidget\n\t>QCustomPlot\n")
            .expect("parse")
            .expect("root");
        let suppressed: HashSet<String> = ["QCustomPlot".to_string()].into_iter().collect();
        let model = build_model(&root, "test.ef", &PropertyClasses::default(), &suppressed)
            .expect("build");
        assert!(!model.includes.contains("<QCustomPlot>"));
    }

    #[test]
    fn structural_error_carries_the_path() {
        let root = parse_template(">QWidget\n\t>QAction\n\t\t>QLabel\n")
            .expect("parse")
            .expect("root");
        let err = build_model(&root, "menu.ef", &PropertyClasses::default(), &HashSet::new())
            .expect_err("must fail");
        match err {
            EfError::Structural { path, .. } => assert_eq!(path, "menu.ef"),
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn metadata_scan_stops_at_content() {
        let meta = scan_metadata(
            ";include <QDialog>\n;using namespace std\n;namespace Forms\n;classname Login\n>QWidget\n;include <QFrame>\n",
        );
        assert_eq!(meta.includes, vec!["<QDialog>".to_string()]);
        assert_eq!(meta.usings, vec!["namespace std".to_string()]);
        assert_eq!(meta.namespace.as_deref(), Some("Forms"));
        assert_eq!(meta.class_name.as_deref(), Some("Login"));
    }
}
