use std::fs;
use std::path::{Path, PathBuf};

use efqt::{
    compile_template, needs_regeneration, render_output, scan_templates, separate_output_path,
    source_hash, template_identity, write_output, write_scaffold, EfError, GenOptions,
    GeneratorConfig, Session, TemplateInput, DEFAULT_CONFIG_PATH, GENERATOR_VERSION,
};

use crate::{consume_flag, consume_gen_options, consume_multi_value_flag, consume_value_flag};

pub(crate) fn load_config(
    path: Option<&str>,
    opts: &GenOptions,
) -> Result<GeneratorConfig, EfError> {
    match path {
        Some(path) => GeneratorConfig::load(Path::new(path), false, opts.verbose),
        None => GeneratorConfig::load(Path::new(DEFAULT_CONFIG_PATH), true, opts.verbose),
    }
}

pub(crate) fn cmd_init(args: &[String]) -> Result<(), EfError> {
    let (overwrite_long, rest) = consume_flag("--overwrite", args);
    let (overwrite_short, rest) = consume_flag("-o", &rest);
    if rest.len() > 1 {
        return Err(EfError::InvalidCommand(format!(
            "unexpected init argument {}",
            rest[1]
        )));
    }
    let dest = PathBuf::from(rest.first().map(String::as_str).unwrap_or("."));
    write_scaffold(&dest, overwrite_long || overwrite_short)?;
    println!("ef.qt project has been generated in `{}'", dest.display());
    Ok(())
}

pub(crate) fn cmd_generate(args: &[String]) -> Result<(), EfError> {
    let (opts, rest) = consume_gen_options(args);
    let (dir, rest) = consume_value_flag(&["--dir", "-d"], &rest)?;
    let (out, rest) = consume_value_flag(&["--out", "-o"], &rest)?;
    let (mut ignores, rest) = consume_multi_value_flag(&["--ignore", "-i"], &rest)?;
    let (separate, rest) = consume_flag("--separate", &rest);
    let (config_path, rest) = consume_value_flag(&["--config"], &rest)?;
    if let Some(unexpected) = rest.first() {
        return Err(EfError::InvalidCommand(format!(
            "unexpected generate argument {unexpected}"
        )));
    }

    let dir = PathBuf::from(dir.unwrap_or_else(|| ".".to_string()));
    let mut out = out.unwrap_or_else(|| "ef.hpp".to_string());
    if separate {
        if out == "ef.hpp" {
            out = ".efgenerated/ef".to_string();
        }
        // Never re-scan our own output tree.
        if let Some(first) = Path::new(&out).components().next() {
            ignores.push(first.as_os_str().to_string_lossy().into_owned());
        }
    }

    if opts.verbose || opts.dry_run {
        eprintln!("[V] Scan dir: {}", dir.display());
        eprintln!("[V] Output path: {out}");
        eprintln!("[V] Separate headers: {separate}");
        eprintln!("[V] Ignored folder(s): {ignores:?}");
    }

    let config = load_config(config_path.as_deref(), &opts)?;
    if separate {
        generate_separate(&dir, Path::new(&out), &ignores, &config, &opts)
    } else {
        generate_aggregate(&dir, Path::new(&out), &ignores, &config, &opts)
    }
}

fn generate_aggregate(
    dir: &Path,
    out: &Path,
    ignores: &[String],
    config: &GeneratorConfig,
    opts: &GenOptions,
) -> Result<(), EfError> {
    let scanned = scan_templates(dir, ignores)?;
    let mut inputs = Vec::new();
    let mut failed = 0usize;
    for tpl in &scanned {
        if opts.verbose || opts.dry_run {
            eprintln!("[V] Reading file: {}", tpl.abs_path.display());
        }
        match fs::read_to_string(&tpl.abs_path) {
            Ok(source) => inputs.push(TemplateInput {
                rel_path: tpl.rel_path.clone(),
                class_name: tpl.class_name.clone(),
                namespace: tpl.namespace.clone(),
                source,
            }),
            Err(err) => {
                eprintln!("{}: {err}", tpl.abs_path.display());
                failed += 1;
            }
        }
    }

    let sources: Vec<(String, String)> = inputs
        .iter()
        .map(|input| (input.rel_path.clone(), source_hash(&input.source)))
        .collect();
    if !needs_regeneration(out, &sources, GENERATOR_VERSION, false, opts)? {
        println!("Nothing changed, no need to update `{}'.", out.display());
        return finish(failed);
    }

    let mut session = Session::new();
    for input in &inputs {
        println!("Processing {} ...", input.rel_path);
        if let Err(err) = session.compile(input, config) {
            eprintln!("{err}");
            failed += 1;
        }
    }
    write_output(out, &session.render(), opts)?;
    if !opts.dry_run {
        println!("Done: header generated in `{}'.", out.display());
    }
    finish(failed)
}

fn generate_separate(
    dir: &Path,
    out_dir: &Path,
    ignores: &[String],
    config: &GeneratorConfig,
    opts: &GenOptions,
) -> Result<(), EfError> {
    let scanned = scan_templates(dir, ignores)?;
    let mut failed = 0usize;
    for tpl in &scanned {
        let source = match fs::read_to_string(&tpl.abs_path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{}: {err}", tpl.abs_path.display());
                failed += 1;
                continue;
            }
        };
        let input = TemplateInput {
            rel_path: tpl.rel_path.clone(),
            class_name: tpl.class_name.clone(),
            namespace: tpl.namespace.clone(),
            source,
        };
        let dest = out_dir.join(separate_output_path(&tpl.rel_path, "hpp"));
        let sources = vec![(input.rel_path.clone(), source_hash(&input.source))];
        if !needs_regeneration(&dest, &sources, GENERATOR_VERSION, false, opts)? {
            if opts.verbose {
                eprintln!("[V] Nothing changed in `{}', skipped", input.rel_path);
            }
            continue;
        }
        println!("Processing {} ...", input.rel_path);
        match compile_template(&input, config) {
            Ok(unit) => {
                write_output(&dest, &render_output(&[&unit]), opts)?;
                if !opts.dry_run {
                    println!("Done: header generated in `{}'.", dest.display());
                }
            }
            Err(err) => {
                eprintln!("{err}");
                failed += 1;
            }
        }
    }
    finish(failed)
}

pub(crate) fn cmd_compile(args: &[String]) -> Result<(), EfError> {
    let (opts, rest) = consume_gen_options(args);
    let (out, rest) = consume_value_flag(&["--out", "-o"], &rest)?;
    let (base, rest) = consume_value_flag(&["--base"], &rest)?;
    let (config_path, rest) = consume_value_flag(&["--config"], &rest)?;
    let Some(input_path) = rest.first() else {
        return Err(EfError::InvalidCommand(
            "compile expects an input file".to_string(),
        ));
    };
    if rest.len() > 1 {
        return Err(EfError::InvalidCommand(format!(
            "unexpected compile argument {}",
            rest[1]
        )));
    }

    let input_path = PathBuf::from(input_path);
    let base = base
        .map(PathBuf::from)
        .or_else(|| input_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let (rel_path, class_name, namespace) = template_identity(&base, &input_path);
    let out = out.map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(separate_output_path(&input_path.display().to_string(), "hpp"))
    });

    if opts.verbose || opts.dry_run {
        eprintln!("[V] Input file: {}", input_path.display());
        eprintln!("[V] Output file: {}", out.display());
        eprintln!("[V] Relative input path: {rel_path}");
        eprintln!("[V] Generated class name: {class_name}");
        eprintln!("[V] Generated namespace: {namespace}");
    }

    let config = load_config(config_path.as_deref(), &opts)?;
    let source = fs::read_to_string(&input_path)?;
    let input = TemplateInput {
        rel_path: rel_path.clone(),
        class_name,
        namespace,
        source,
    };
    let sources = vec![(rel_path, source_hash(&input.source))];
    if !needs_regeneration(&out, &sources, GENERATOR_VERSION, false, &opts)? {
        println!("Nothing changed, no need to update `{}'.", out.display());
        return Ok(());
    }
    let unit = compile_template(&input, &config)?;
    write_output(&out, &render_output(&[&unit]), &opts)?;
    if !opts.dry_run {
        println!("Done: header generated in `{}'.", out.display());
    }
    Ok(())
}

fn finish(failed: usize) -> Result<(), EfError> {
    if failed > 0 {
        Err(EfError::Failed(failed))
    } else {
        Ok(())
    }
}
