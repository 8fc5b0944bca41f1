use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use efqt::{
    is_template_path, render_output, scan_templates, separate_output_path, template_identity,
    write_output, EfError, GenOptions, GeneratorConfig, Session, TemplateInput,
};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};

use crate::commands::load_config;
use crate::{consume_flag, consume_gen_options, consume_multi_value_flag, consume_value_flag};

struct WatchArgs {
    dir: PathBuf,
    out: PathBuf,
    ignores: Vec<String>,
    separate: bool,
    debounce: Duration,
    opts: GenOptions,
}

pub(crate) fn cmd_watch(args: &[String]) -> Result<(), EfError> {
    let (opts, rest) = consume_gen_options(args);
    let (dir, rest) = consume_value_flag(&["--dir", "-d"], &rest)?;
    let (out, rest) = consume_value_flag(&["--out", "-o"], &rest)?;
    let (mut ignores, rest) = consume_multi_value_flag(&["--ignore", "-i"], &rest)?;
    let (separate, rest) = consume_flag("--separate", &rest);
    let (debounce_ms, rest) = consume_value_flag(&["--debounce-ms"], &rest)?;
    let (config_path, rest) = consume_value_flag(&["--config"], &rest)?;
    if let Some(unexpected) = rest.first() {
        return Err(EfError::InvalidCommand(format!(
            "unexpected watch argument {unexpected}"
        )));
    }

    let dir = PathBuf::from(dir.unwrap_or_else(|| ".".to_string()));
    let mut out = out.unwrap_or_else(|| "ef.hpp".to_string());
    if separate {
        if out == "ef.hpp" {
            out = ".efgenerated/ef".to_string();
        }
        if let Some(first) = Path::new(&out).components().next() {
            ignores.push(first.as_os_str().to_string_lossy().into_owned());
        }
    }
    let debounce_ms = match debounce_ms {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| EfError::InvalidCommand(format!("--debounce-ms expects milliseconds, got {raw}")))?,
        None => 500,
    };

    let config = load_config(config_path.as_deref(), &opts)?;
    run_watch(
        WatchArgs {
            dir,
            out: PathBuf::from(out),
            ignores,
            separate,
            debounce: Duration::from_millis(debounce_ms),
            opts,
        },
        &config,
    )
}

/// Watch the template directory and regenerate on every quiet period: one
/// debounced event batch becomes exactly one regeneration pass that
/// recompiles only the files in the batch and reuses every cached unit.
fn run_watch(w: WatchArgs, config: &GeneratorConfig) -> Result<(), EfError> {
    let mut session = Session::new();

    // Full initial pass so the watch loop starts from a complete result
    // map even when the previous output is stale or missing.
    let scanned = scan_templates(&w.dir, &w.ignores)?;
    for tpl in &scanned {
        let source = match fs::read_to_string(&tpl.abs_path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("\x1b[1;31m[watch]\x1b[0m {}: {err}", tpl.abs_path.display());
                continue;
            }
        };
        let input = TemplateInput {
            rel_path: tpl.rel_path.clone(),
            class_name: tpl.class_name.clone(),
            namespace: tpl.namespace.clone(),
            source,
        };
        if let Err(err) = session.compile(&input, config) {
            eprintln!("\x1b[1;31m[watch]\x1b[0m {err}");
        }
    }
    let initial: Vec<String> = session
        .units()
        .iter()
        .map(|unit| unit.rel_path.clone())
        .collect();
    write_changed(&mut session, &w, &initial, &[]);

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(w.debounce, tx)
        .map_err(|e| EfError::Io(std::io::Error::other(format!("watcher init: {e}"))))?;
    debouncer
        .watcher()
        .watch(&w.dir, RecursiveMode::Recursive)
        .map_err(|e| EfError::Io(std::io::Error::other(format!("watch: {e}"))))?;

    eprintln!(
        "\x1b[1;36m[watch]\x1b[0m watching {} for changes…",
        w.dir.display()
    );

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let batch = template_events(&events);
                if batch.is_empty() {
                    continue;
                }
                process_batch(&mut session, config, &w, &batch);
            }
            Ok(Err(err)) => {
                eprintln!("\x1b[1;33m[watch]\x1b[0m watcher error: {err:?}");
            }
            Err(mpsc::RecvError) => {
                return Err(EfError::Io(std::io::Error::other(
                    "file watcher disconnected",
                )));
            }
        }
    }
}

/// Template paths named by one debounced batch, deduplicated.
fn template_events(events: &[DebouncedEvent]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for event in events {
        if event.kind == DebouncedEventKind::Any
            && is_template_path(&event.path)
            && !paths.contains(&event.path)
        {
            paths.push(event.path.clone());
        }
    }
    paths
}

/// One regeneration pass. Per-file failures are reported and leave the
/// previous unit in place; the watch session always survives.
fn process_batch(session: &mut Session, config: &GeneratorConfig, w: &WatchArgs, batch: &[PathBuf]) {
    let mut changed = Vec::new();
    let mut removed = Vec::new();

    for path in batch {
        let (rel_path, class_name, namespace) = template_identity(&w.dir, path);
        if path.exists() {
            eprintln!("\x1b[1;36m[watch]\x1b[0m change detected: {rel_path}");
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("\x1b[1;31m[watch]\x1b[0m {rel_path}: {err}");
                    continue;
                }
            };
            let input = TemplateInput {
                rel_path: rel_path.clone(),
                class_name,
                namespace,
                source,
            };
            match session.compile(&input, config) {
                Ok(_) => changed.push(rel_path),
                Err(err) => {
                    eprintln!("\x1b[1;31m[watch]\x1b[0m {err} (keeping previous output)");
                }
            }
        } else if session.remove(&rel_path) {
            eprintln!("\x1b[1;36m[watch]\x1b[0m removed: {rel_path}");
            removed.push(rel_path);
        }
    }

    if changed.is_empty() && removed.is_empty() {
        return;
    }
    write_changed(session, w, &changed, &removed);
    eprintln!(
        "\x1b[1;32m[watch]\x1b[0m regenerated ({} changed, {} removed)",
        changed.len(),
        removed.len()
    );
}

/// Exactly one write per completed batch. In separate mode each changed
/// template maps to its own output file and deletions remove the
/// corresponding generated file.
fn write_changed(session: &mut Session, w: &WatchArgs, changed: &[String], removed: &[String]) {
    if w.separate {
        for rel_path in changed {
            let Some(unit) = session.get(rel_path) else {
                continue;
            };
            let dest = w.out.join(separate_output_path(rel_path, "hpp"));
            if let Err(err) = write_output(&dest, &render_output(&[unit]), &w.opts) {
                eprintln!("\x1b[1;31m[watch]\x1b[0m {}: {err}", dest.display());
            }
        }
        for rel_path in removed {
            let dest = w.out.join(separate_output_path(rel_path, "hpp"));
            if w.opts.dry_run {
                continue;
            }
            match fs::remove_file(&dest) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => eprintln!("\x1b[1;31m[watch]\x1b[0m {}: {err}", dest.display()),
            }
        }
    } else if let Err(err) = write_output(&w.out, &session.render(), &w.opts) {
        eprintln!("\x1b[1;31m[watch]\x1b[0m {}: {err}", w.out.display());
    }
}
