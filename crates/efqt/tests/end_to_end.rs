use efqt::{
    compile_template, render_output, GeneratorConfig, TemplateInput, GENERATOR_VERSION,
};

fn input(rel_path: &str, class_name: &str, source: &str) -> TemplateInput {
    TemplateInput {
        rel_path: rel_path.to_string(),
        class_name: class_name.to_string(),
        namespace: String::new(),
        source: source.to_string(),
    }
}

#[test]
fn container_with_bound_button_generates_the_full_wiring() {
    let config = GeneratorConfig::default();
    let tpl = input(
        "app.ef",
        "App",
        ">QWidget\n\t>QPushButton\n\t\t#text = {{title = Hi}}\n",
    );
    let unit = compile_template(&tpl, &config).expect("compile");
    let text = &unit.class_text;

    // String-typed storage field, initialized from the default.
    assert!(text.contains("EFVar<QString> title;"));
    assert!(text.contains("$data.title = tr(\"Hi\");"));

    // One widget-tree statement parenting the button to the container.
    assert!(text.contains("__widget_0 = this;"));
    assert!(text.contains("__widget_1 = new QPushButton(__widget_0);"));

    // One subscription calling the text setter on every update.
    assert!(text.contains(
        "$data.title.subscribe(std::make_shared<std::function<void(const QString&)>>("
    ));
    assert_eq!(text.matches("__widget_1->setText(*$data.title);").count(), 1);

    // Subscriptions are installed before defaults are assigned.
    let subscribers = text.find("__init_value_subscribers();").expect("phase");
    let data = text.find("__init_data();").expect("phase");
    assert!(subscribers < data);

    // Both widget types are auto-included.
    assert!(unit.includes.contains("<QWidget>"));
    assert!(unit.includes.contains("<QPushButton>"));
}

#[test]
fn compiling_the_same_source_twice_is_byte_identical() {
    let config = GeneratorConfig::default();
    let source = "\
;include \"my_widgets.hpp\"
>QWidget
\t#windowTitle = {{title = Hello}}
\t>QVBoxLayout
\t\t>QLabel
\t\t\t#text = {{title}}
\t\t>QPushButton#quitButton
\t\t\t#text = Quit
\t\t\t@clicked = onQuit
";
    let first = compile_template(&input("hello.ef", "Hello", source), &config).expect("compile");
    let second = compile_template(&input("hello.ef", "Hello", source), &config).expect("compile");
    assert_eq!(
        render_output(&[&first]),
        render_output(&[&second])
    );
}

#[test]
fn translation_unit_carries_version_stamp_and_manifest_lines() {
    let config = GeneratorConfig::default();
    let unit = compile_template(&input("app.ef", "App", ">QWidget\n"), &config).expect("compile");
    let output = render_output(&[&unit]);

    let mut lines = output.lines();
    assert_eq!(
        lines.next(),
        Some(format!("// Generated by efqt {GENERATOR_VERSION}").as_str())
    );
    assert!(output.contains("#pragma once"));
    assert!(output.contains("#include <QtGui>"));
    assert!(output.contains("#include \"ef_core.hpp\""));
    assert!(output.contains(&format!("// source: app.ef:{}", unit.source_hash)));
    assert!(output.contains("using namespace ef::core;"));
    assert!(output.contains("\tclass App;"));
}

#[test]
fn structural_failure_produces_no_unit_at_all() {
    let config = GeneratorConfig::default();
    let result = compile_template(
        &input(
            "bad.ef",
            "Bad",
            ">QWidget\n\t>QVBoxLayout\n\t\t>QGridLayout\n\t\t\t>QLabel\n",
        ),
        &config,
    );
    assert!(result.is_err());
}

#[test]
fn menu_tree_generates_menu_wiring() {
    let config = GeneratorConfig::default();
    let source = "\
>QMainWindow
\t>QMenuBar
\t\t>QMenu
\t\t\t#title = File
\t\t\t>QAction#openAction
\t\t\t\t#text = Open
\t\t\t>EFSeparator
\t\t\t>QAction
\t\t\t\t#text = Exit
";
    let unit = compile_template(&input("win.ef", "Win", source), &config).expect("compile");
    let text = &unit.class_text;
    assert!(text.contains("__widget_1->addMenu(__widget_2);"));
    assert!(text.contains("__widget_2->addAction(__widget_3);"));
    assert!(text.contains("__widget_2->addSeparator();"));
    assert!(text.contains("__widget_2->addAction(__widget_5);"));
    // The separator is virtual: no field, no constructor.
    assert!(!text.contains("EFSeparator *"));
    assert!(!text.contains("new EFSeparator"));
    // The ref points at the declared action.
    assert!(text.contains("QAction *openAction;"));
    assert!(text.contains("$refs.openAction = __widget_3;"));
}
