use std::fs;
use std::path::Path;

use efqt::{
    needs_regeneration, read_manifest, scan_templates, write_output, GenOptions, GeneratorConfig,
    Session, TemplateInput, GENERATOR_VERSION,
};

fn compile_dir(session: &mut Session, dir: &Path, config: &GeneratorConfig) {
    let scanned = scan_templates(dir, &[]).expect("scan");
    for tpl in &scanned {
        let source = fs::read_to_string(&tpl.abs_path).expect("read template");
        let input = TemplateInput {
            rel_path: tpl.rel_path.clone(),
            class_name: tpl.class_name.clone(),
            namespace: tpl.namespace.clone(),
            source,
        };
        session.compile(&input, config).expect("compile");
    }
}

#[test]
fn edit_one_of_three_recompiles_only_the_edited_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).expect("mkdir");
    fs::write(src.join("a.ef"), ">QWidget\n").expect("write a");
    fs::write(src.join("b.ef"), ">QDialog\n").expect("write b");
    fs::write(src.join("c.ef"), ">QFrame\n").expect("write c");
    let out = tmp.path().join("ef.hpp");
    let opts = GenOptions::default();
    let config = GeneratorConfig::default();

    let mut session = Session::new();
    compile_dir(&mut session, &src, &config);
    write_output(&out, &session.render(), &opts).expect("write");

    // The freshly written output stands: nothing to regenerate.
    assert!(
        !needs_regeneration(&out, &session.manifest_entries(), GENERATOR_VERSION, false, &opts)
            .expect("check")
    );

    // Edit one file; the cache flips for exactly that reason.
    fs::write(src.join("b.ef"), ">QDialog\n\t#windowTitle = {{t}}\n").expect("edit b");
    let new_source = fs::read_to_string(src.join("b.ef")).expect("read b");
    let edited_sources: Vec<(String, String)> = session
        .manifest_entries()
        .into_iter()
        .map(|(path, hash)| {
            if path == "b.ef" {
                (path, efqt::source_hash(&new_source))
            } else {
                (path, hash)
            }
        })
        .collect();
    assert!(
        needs_regeneration(&out, &edited_sources, GENERATOR_VERSION, false, &opts)
            .expect("check")
    );

    // One incremental pass recompiles b.ef only; a and c are reused.
    let a_before = session.get("a.ef").expect("a").class_text.clone();
    let c_before = session.get("c.ef").expect("c").class_text.clone();
    session
        .compile(
            &TemplateInput {
                rel_path: "b.ef".to_string(),
                class_name: "B".to_string(),
                namespace: String::new(),
                source: new_source,
            },
            &config,
        )
        .expect("recompile b");
    assert_eq!(session.get("a.ef").expect("a").class_text, a_before);
    assert_eq!(session.get("c.ef").expect("c").class_text, c_before);
    assert!(session.get("b.ef").expect("b").class_text.contains("EFVar<QString> t;"));

    write_output(&out, &session.render(), &opts).expect("rewrite");
    assert!(
        !needs_regeneration(&out, &session.manifest_entries(), GENERATOR_VERSION, false, &opts)
            .expect("check")
    );
}

#[test]
fn removing_a_template_evicts_its_unit_from_the_output() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).expect("mkdir");
    fs::write(src.join("a.ef"), ">QWidget\n").expect("write a");
    fs::write(src.join("b.ef"), ">QDialog\n").expect("write b");
    let config = GeneratorConfig::default();

    let mut session = Session::new();
    compile_dir(&mut session, &src, &config);
    assert!(session.render().contains("class B;"));

    assert!(session.remove("b.ef"));
    let output = session.render();
    assert!(!output.contains("class B;"));
    assert!(!output.contains("// source: b.ef:"));
    assert!(output.contains("class A;"));
}

#[test]
fn manifest_round_trips_through_the_written_header() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir_all(src.join("forms")).expect("mkdir");
    fs::write(src.join("app.ef"), ">QWidget\n").expect("write");
    fs::write(src.join("forms/login.ef"), ">QDialog\n").expect("write");
    let out = tmp.path().join("gen/ef.hpp");
    let opts = GenOptions::default();
    let config = GeneratorConfig::default();

    let mut session = Session::new();
    compile_dir(&mut session, &src, &config);
    write_output(&out, &session.render(), &opts).expect("write");

    let manifest = read_manifest(&out).expect("read").expect("present");
    assert_eq!(manifest.version, GENERATOR_VERSION);
    let entries = session.manifest_entries();
    assert_eq!(manifest.hashes.len(), entries.len());
    for (path, hash) in entries {
        assert_eq!(manifest.hashes.get(&path), Some(&hash));
    }
}

#[test]
fn full_regeneration_is_reproducible() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).expect("mkdir");
    fs::write(
        src.join("app.ef"),
        ">QWidget\n\t#windowTitle = {{title = Hi}}\n\t>QPushButton\n\t\t@clicked = onGo\n",
    )
    .expect("write");
    let config = GeneratorConfig::default();

    let mut first = Session::new();
    compile_dir(&mut first, &src, &config);
    let mut second = Session::new();
    compile_dir(&mut second, &src, &config);
    assert_eq!(first.render(), second.render());
}
