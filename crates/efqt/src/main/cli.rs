use std::env;
use std::process::ExitCode;

use efqt::{EfError, GenOptions, GENERATOR_VERSION};

mod commands;
mod watch;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EfError> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "-h" | "--help" | "help" => {
            print_help();
            Ok(())
        }
        "-V" | "--version" | "version" => {
            println!("efqt {GENERATOR_VERSION}");
            Ok(())
        }
        "init" | "new" => commands::cmd_init(&rest),
        "generate" | "gen" => commands::cmd_generate(&rest),
        "compile" => commands::cmd_compile(&rest),
        "watch" => watch::cmd_watch(&rest),
        _ => {
            print_help();
            Err(EfError::InvalidCommand(command))
        }
    }
}

fn print_help() {
    println!(
        "efqt {GENERATOR_VERSION}\n\nUSAGE:\n  efqt <COMMAND>\n\nCOMMANDS:\n  init [dest] [--overwrite|-o]\n  generate [--dir|-d <dir>] [--out|-o <file>] [--ignore|-i <dir>]... [--separate] [--config <file>]\n  compile <input> [--out|-o <file>] [--base <dir>] [--config <file>]\n  watch [--dir|-d <dir>] [--out|-o <file>] [--ignore|-i <dir>]... [--separate] [--debounce-ms <n>] [--config <file>]\n  version\n\nGLOBAL FLAGS:\n  --verbose, -v   verbose logging\n  --dry-run       perform all computation, skip all writes\n  -h, --help\n  -V, --version"
    );
}

pub(crate) fn consume_flag(flag: &str, args: &[String]) -> (bool, Vec<String>) {
    let mut enabled = false;
    let mut out = Vec::new();
    for arg in args {
        if arg == flag {
            enabled = true;
        } else {
            out.push(arg.clone());
        }
    }
    (enabled, out)
}

pub(crate) fn consume_value_flag(
    flags: &[&str],
    args: &[String],
) -> Result<(Option<String>, Vec<String>), EfError> {
    let mut value = None;
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < args.len() {
        let arg = &args[i];
        if flags.contains(&arg.as_str()) {
            let Some(next) = args.get(i + 1) else {
                return Err(EfError::InvalidCommand(format!("{arg} expects a value")));
            };
            value = Some(next.clone());
            i += 2;
            continue;
        }
        out.push(arg.clone());
        i += 1;
    }
    Ok((value, out))
}

pub(crate) fn consume_multi_value_flag(
    flags: &[&str],
    args: &[String],
) -> Result<(Vec<String>, Vec<String>), EfError> {
    let mut values = Vec::new();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < args.len() {
        let arg = &args[i];
        if flags.contains(&arg.as_str()) {
            let Some(next) = args.get(i + 1) else {
                return Err(EfError::InvalidCommand(format!("{arg} expects a value")));
            };
            values.push(next.clone());
            i += 2;
            continue;
        }
        out.push(arg.clone());
        i += 1;
    }
    Ok((values, out))
}

pub(crate) fn consume_gen_options(args: &[String]) -> (GenOptions, Vec<String>) {
    let (verbose_long, rest) = consume_flag("--verbose", args);
    let (verbose_short, rest) = consume_flag("-v", &rest);
    let (dry_run, rest) = consume_flag("--dry-run", &rest);
    (
        GenOptions {
            verbose: verbose_long || verbose_short,
            dry_run,
        },
        rest,
    )
}
