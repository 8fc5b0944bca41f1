//! Code generator: renders a built [`CompiledModel`] into C++ class text
//! and aggregates compiled units into one translation unit.
//!
//! Rendering is deterministic and order-preserving: variables, refs,
//! methods and properties iterate in first-registration order, widgets in
//! traversal order. Trailing whitespace is stripped from every emitted
//! line so the output hashes stably.

use crate::bindings::{capitalize_first, escape_cpp_string, PropertyClasses};
use crate::builder::CompiledModel;
use crate::driver::CompiledUnit;

/// Identity of the unit being rendered: resolved class name, namespace and
/// the directives recovered from the template's metadata lines.
#[derive(Debug, Clone)]
pub struct UnitContext<'a> {
    pub file_path: &'a str,
    pub file_hash: &'a str,
    pub class_name: &'a str,
    pub namespace: &'a str,
    pub custom_usings: &'a [String],
}

/// Render one compiled model as a complete class definition, wrapped in
/// its `ef::ui` namespace and prefixed with the manifest line
/// (`// source: path:hash`).
pub fn render_class(ctx: &UnitContext<'_>, model: &CompiledModel, classes: &PropertyClasses) -> String {
    let class_name = ctx.class_name;
    let proto = model
        .widgets
        .first()
        .map(|w| w.type_name.as_str())
        .unwrap_or("QWidget");
    let namespace = if ctx.namespace.is_empty() {
        "ef::ui".to_string()
    } else {
        format!("ef::ui::{}", ctx.namespace)
    };

    let mut out = String::new();
    let mut line = |depth: usize, text: &str| {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push_str(text);
        out.push('\n');
    };

    line(0, &format!("// source: {}:{}", ctx.file_path, ctx.file_hash));
    line(0, &format!("namespace {namespace} {{"));
    line(1, "// Custom using");
    for using in ctx.custom_usings {
        line(1, &format!("using {using};"));
    }
    line(1, &format!("class {class_name}: public {proto} {{"));
    line(1, "public:");

    line(2, "// Data variables");
    line(2, "struct {");
    for var in &model.data {
        line(3, &format!("{} {};", var.ty.wrapper, var.name));
    }
    line(2, "} $data;");
    line(0, "");

    line(2, "// Widget references");
    line(2, "struct {");
    for r in &model.refs {
        if !r.widget_class.is_virtual() {
            line(3, &format!("{} *{};", r.type_name, r.name));
        }
    }
    line(2, "} $refs;");
    line(0, "");

    line(2, "// Signal handling methods");
    line(2, "struct {");
    let mut seen = Vec::new();
    for method in &model.methods {
        if seen.contains(&method.handler_name) {
            continue;
        }
        seen.push(method.handler_name.clone());
        let args = if method.args.is_empty() {
            String::new()
        } else {
            format!(", {}", method.args.join(", "))
        };
        line(
            3,
            &format!(
                "std::function<void({class_name}&{args})> {};",
                method.handler_name
            ),
        );
    }
    line(2, "} $methods;");
    line(0, "");

    line(2, "// Mounting Points");
    for mp in &model.mounting_points {
        let ty = if mp.is_list {
            "EFListMountingPoint"
        } else {
            "EFMountingPoint"
        };
        line(2, &format!("{ty} {};", mp.name));
    }
    line(0, "");

    line(1, "private:");
    line(2, "// Internal widget names");
    for widget in &model.widgets {
        if !widget.mount_point && !widget.widget_class.is_virtual() {
            line(2, &format!("{} *{};", widget.type_name, widget.inner_name));
        }
    }
    line(0, "");

    line(2, "// Internal signal handlers");
    let mut seen = Vec::new();
    for method in &model.methods {
        if seen.contains(&method.handler_name) {
            continue;
        }
        seen.push(method.handler_name.clone());
        let params = method
            .args
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("{ty} __v{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let forwarded = (0..method.args.len())
            .map(|i| format!(", __v{i}"))
            .collect::<String>();
        line(2, &format!("void {}({params}) {{", method.inner_method_name));
        line(3, &format!("if ($methods.{})", method.handler_name));
        line(
            4,
            &format!("$methods.{}(*this{forwarded});", method.handler_name),
        );
        line(2, "}");
        line(0, "");
    }

    line(2, "void __init_widgets() {");
    for stmt in &model.init_widgets {
        line(3, stmt);
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init_refs() {");
    for r in &model.refs {
        if !r.widget_class.is_virtual() {
            line(3, &format!("$refs.{} = {};", r.name, r.inner_name));
        }
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init_value_subscribers() {");
    for var in &model.data {
        line(
            3,
            &format!(
                "$data.{}.subscribe(std::make_shared<std::function<void({})>>(",
                var.name, var.ty.base
            ),
        );
        line(4, "[this](auto _){");
        for handler in &var.handlers {
            line(5, handler);
        }
        line(4, "}");
        line(3, "));");
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init_methods() {");
    line(3, "using namespace std::placeholders;");
    for method in &model.methods {
        let placeholders = (1..=method.args.len())
            .map(|i| format!(", _{i}"))
            .collect::<String>();
        line(
            3,
            &format!(
                "QObject::connect({}, &{}::{}, std::bind(&{class_name}::{}, this{placeholders}));",
                method.inner_name, method.widget_type, method.signal_name, method.inner_method_name
            ),
        );
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init_data() {");
    for var in &model.data {
        if let Some(default) = &var.default {
            if var.ty.is_stringish() {
                line(
                    3,
                    &format!("$data.{} = tr(\"{}\");", var.name, escape_cpp_string(default)),
                );
            } else {
                line(3, &format!("$data.{} = {default};", var.name));
            }
        }
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init_props() {");
    for prop in &model.props {
        if let Some(value) = &prop.static_value {
            let setter = capitalize_first(&prop.prop_name);
            if classes.is_string_prop(&prop.prop_name) {
                line(
                    3,
                    &format!(
                        "{}->set{setter}(tr(\"{}\"));",
                        prop.inner_name,
                        escape_cpp_string(value)
                    ),
                );
            } else {
                line(3, &format!("{}->set{setter}({value});", prop.inner_name));
            }
        }
    }
    line(2, "}");
    line(0, "");

    line(2, "void __init() {");
    line(3, "__init_widgets();");
    line(3, "__init_refs();");
    line(3, "__init_value_subscribers();");
    line(3, "__init_methods();");
    line(3, "__init_data();");
    line(3, "__init_props();");
    line(2, "}");
    line(0, "");

    line(1, "public:");
    line(2, &format!("{class_name}() {{"));
    line(3, "__init();");
    line(2, "}");
    line(0, "");
    line(2, "template <typename... Args>");
    let proto_ctor = proto.rsplit("::").next().unwrap_or(proto);
    line(
        2,
        &format!(
            "{class_name}(Args... __args) : {proto}::{proto_ctor}(std::forward<Args>(__args)...) {{"
        ),
    );
    line(3, "__init();");
    line(2, "}");
    line(1, "};");
    line(0, "}");

    out
}

/// Aggregate compiled units into one translation unit: forward
/// declarations, deduplicated auto-detected and user-declared include
/// blocks, then every class body. Units whose template was empty
/// contribute only their manifest line.
pub fn render_translation_unit(units: &[&CompiledUnit]) -> String {
    let mut auto_includes = std::collections::BTreeSet::new();
    let mut custom_includes = Vec::new();
    for unit in units {
        auto_includes.extend(unit.includes.iter().cloned());
        for include in &unit.custom_includes {
            if !custom_includes.contains(include) {
                custom_includes.push(include.clone());
            }
        }
    }

    let mut out = String::new();
    out.push_str("\n#pragma once\n\n#include <QtGui>\n#include \"ef_core.hpp\"\n\nnamespace ef::ui {\n");
    for unit in units {
        if unit.empty {
            continue;
        }
        if unit.namespace.is_empty() {
            out.push_str(&format!("\tclass {};\n", unit.class_name));
        } else {
            out.push_str(&format!(
                "\tnamespace {} {{\n\t\tclass {};\n\t}}\n",
                unit.namespace, unit.class_name
            ));
        }
    }
    out.push_str("}\n\n// Auto generated includes\n");
    for include in &auto_includes {
        out.push_str(&format!("#include {include}\n"));
    }
    out.push_str("// User defined includes\n");
    for include in &custom_includes {
        out.push_str(&format!("#include {include}\n"));
    }
    out.push_str("\nusing namespace ef::core;\n\n");
    for unit in units {
        out.push_str(&unit.class_text);
        out.push('\n');
    }

    strip_trailing_spaces(&out)
}

fn strip_trailing_spaces(source: &str) -> String {
    source
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
