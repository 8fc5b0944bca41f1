//! Incremental build cache: the generated header doubles as the build
//! manifest. Its first line carries the generator version stamp and every
//! unit body starts with a `// source: path:hash` line; recovering those
//! is all the state needed to decide whether regeneration is necessary.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::driver::GenOptions;
use crate::EfError;

/// Content hash of one template source, hex-encoded SHA-256.
pub fn source_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// The previous run's output as far as the cache cares: its version stamp
/// and the per-source content hashes it was generated from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub hashes: HashMap<String, String>,
}

/// Recover the manifest from a previously generated header. `None` when
/// the file does not exist.
pub fn read_manifest(dest: &Path) -> Result<Option<Manifest>, EfError> {
    let text = match fs::read_to_string(dest) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(EfError::Io(err)),
    };
    Ok(Some(parse_manifest(&text)))
}

fn parse_manifest(text: &str) -> Manifest {
    let mut lines = text.lines();
    // First line: `// Generated by efqt v0.1.0`.
    let version = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(4))
        .unwrap_or_default()
        .to_string();
    let mut hashes = HashMap::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix("// source: ") {
            if let Some((path, hash)) = rest.rsplit_once(':') {
                hashes.insert(path.to_string(), hash.to_string());
            }
        }
    }
    Manifest { version, hashes }
}

/// Decide whether the previous output still stands. Regeneration is
/// required when the destination is missing, the version stamp differs,
/// any current source hash differs from (or is absent from) the recovered
/// table, or the caller forces it (watch mode).
pub fn needs_regeneration(
    dest: &Path,
    sources: &[(String, String)],
    version: &str,
    forced: bool,
    opts: &GenOptions,
) -> Result<bool, EfError> {
    if forced {
        return Ok(true);
    }
    let Some(manifest) = read_manifest(dest)? else {
        return Ok(true);
    };
    if manifest.version != version {
        if opts.verbose || opts.dry_run {
            eprintln!(
                "[V] Last generated efqt version {} does not match current version {version}, regenerate...",
                manifest.version
            );
        }
        return Ok(true);
    }
    for (path, hash) in sources {
        if manifest.hashes.get(path) != Some(hash) {
            if opts.verbose || opts.dry_run {
                eprintln!("[V] Found hash mismatch in `{path}', regenerate...");
            }
            return Ok(true);
        }
    }
    Ok(false)
}

/// Write the rendered output, creating the destination directory first and
/// going through a sibling temp file + rename so readers never observe a
/// half-written header. Dry runs skip the write entirely.
pub fn write_output(dest: &Path, content: &str, opts: &GenOptions) -> Result<(), EfError> {
    if opts.verbose || opts.dry_run {
        eprintln!("[V] Writing generated header to: {}", dest.display());
    }
    if opts.dry_run {
        println!("Done: header NOT generated in `{}'.  (--dry-run)", dest.display());
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_name = match dest.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!(".{name}.tmp"),
        None => return Err(EfError::InvalidPath(dest.display().to_string())),
    };
    let tmp = dest.with_file_name(tmp_name);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: &str = "v0.1.0";

    fn header(entries: &[(&str, &str)]) -> String {
        let mut out = format!("// Generated by efqt {VERSION}\n\n#pragma once\n");
        for (path, hash) in entries {
            out.push_str(&format!("// source: {path}:{hash}\n"));
        }
        out
    }

    #[test]
    fn missing_destination_regenerates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        let sources = vec![("a.ef".to_string(), source_hash("x"))];
        assert!(
            needs_regeneration(&dest, &sources, VERSION, false, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn matching_manifest_stands() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        let hash = source_hash("x");
        std::fs::write(&dest, header(&[("a.ef", &hash)])).expect("write");
        let sources = vec![("a.ef".to_string(), hash)];
        assert!(
            !needs_regeneration(&dest, &sources, VERSION, false, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn one_changed_byte_flips_the_decision() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        std::fs::write(&dest, header(&[("a.ef", &source_hash("x"))])).expect("write");
        let sources = vec![("a.ef".to_string(), source_hash("y"))];
        assert!(
            needs_regeneration(&dest, &sources, VERSION, false, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn version_mismatch_regenerates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        let hash = source_hash("x");
        std::fs::write(
            &dest,
            format!("// Generated by efqt v0.0.9\n// source: a.ef:{hash}\n"),
        )
        .expect("write");
        let sources = vec![("a.ef".to_string(), hash)];
        assert!(
            needs_regeneration(&dest, &sources, VERSION, false, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn unknown_source_regenerates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        std::fs::write(&dest, header(&[("a.ef", &source_hash("x"))])).expect("write");
        let sources = vec![
            ("a.ef".to_string(), source_hash("x")),
            ("b.ef".to_string(), source_hash("new")),
        ];
        assert!(
            needs_regeneration(&dest, &sources, VERSION, false, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn forced_check_always_regenerates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        let hash = source_hash("x");
        std::fs::write(&dest, header(&[("a.ef", &hash)])).expect("write");
        let sources = vec![("a.ef".to_string(), hash)];
        assert!(
            needs_regeneration(&dest, &sources, VERSION, true, &GenOptions::default())
                .expect("check")
        );
    }

    #[test]
    fn manifest_paths_may_contain_colons() {
        let manifest = parse_manifest("// Generated by efqt v0.1.0\n// source: dir:with:colons/a.ef:abc123\n");
        assert_eq!(
            manifest.hashes.get("dir:with:colons/a.ef").map(String::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn write_creates_parent_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("deep/nested/ef.hpp");
        write_output(&dest, "content\n", &GenOptions::default()).expect("write");
        assert_eq!(std::fs::read_to_string(&dest).expect("read"), "content\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("ef.hpp");
        let opts = GenOptions {
            verbose: false,
            dry_run: true,
        };
        write_output(&dest, "content\n", &opts).expect("write");
        assert!(!dest.exists());
    }
}
