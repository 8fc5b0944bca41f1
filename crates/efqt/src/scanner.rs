//! Directory scanning and class naming: finds template files under a
//! project root and derives each one's class name and namespace from its
//! relative path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::EfError;

/// File extensions recognized as templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["ef", "eft", "efml"];

/// One template found under the scan root, with its derived identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTemplate {
    pub abs_path: PathBuf,
    pub rel_path: String,
    pub class_name: String,
    pub namespace: String,
}

pub fn is_template_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

/// Recursively collect template files under `dir`, skipping hidden
/// directories and any directory whose name is listed in `ignores`.
/// Results are sorted by path so scan order is deterministic.
pub fn scan_templates(dir: &Path, ignores: &[String]) -> Result<Vec<ScannedTemplate>, EfError> {
    if !dir.is_dir() {
        return Err(EfError::InvalidPath(dir.display().to_string()));
    }
    let mut paths = Vec::new();
    collect_templates(dir, ignores, &mut paths)?;
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|path| {
            let (rel_path, class_name, namespace) = template_identity(dir, &path);
            ScannedTemplate {
                abs_path: path,
                rel_path,
                class_name,
                namespace,
            }
        })
        .collect())
}

fn collect_templates(dir: &Path, ignores: &[String], paths: &mut Vec<PathBuf>) -> Result<(), EfError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if entry_path.is_dir() {
            if name.starts_with('.') || ignores.iter().any(|i| i == name.as_ref()) {
                continue;
            }
            collect_templates(&entry_path, ignores, paths)?;
            continue;
        }
        if is_template_path(&entry_path) {
            paths.push(entry_path);
        }
    }
    Ok(())
}

/// Derive (relative path, class name, namespace) for one template. The
/// class name is the PascalCase file stem; the namespace joins the
/// PascalCase relative directory segments with `::`.
pub fn template_identity(base: &Path, path: &Path) -> (String, String, String) {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let rel_path = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let class_name = pascal_case(&stem);
    let namespace = rel
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| pascal_case(&c.as_os_str().to_string_lossy()))
                .collect::<Vec<_>>()
                .join("::")
        })
        .unwrap_or_default();
    (rel_path, class_name, namespace)
}

/// PascalCase conversion over `-`, `_`, `.` and space separators:
/// `login-dialog` -> `LoginDialog`.
fn pascal_case(name: &str) -> String {
    name.split(['-', '_', '.', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Map a template's relative path to its own output file in separate
/// mode, swapping the extension: `forms/login.ef` -> `forms/login.hpp`.
pub fn separate_output_path(rel_path: &str, extension: &str) -> String {
    match rel_path.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.{extension}"),
        None => format!("{rel_path}.{extension}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_derives_class_and_namespace() {
        let base = Path::new("/proj");
        let (rel, class, ns) = template_identity(base, Path::new("/proj/forms/auth/login-dialog.ef"));
        assert_eq!(rel, "forms/auth/login-dialog.ef");
        assert_eq!(class, "LoginDialog");
        assert_eq!(ns, "Forms::Auth");
    }

    #[test]
    fn root_level_template_has_no_namespace() {
        let base = Path::new("/proj");
        let (rel, class, ns) = template_identity(base, Path::new("/proj/main_window.eft"));
        assert_eq!(rel, "main_window.eft");
        assert_eq!(class, "MainWindow");
        assert_eq!(ns, "");
    }

    #[test]
    fn separate_path_swaps_the_extension() {
        assert_eq!(separate_output_path("forms/login.ef", "hpp"), "forms/login.hpp");
        assert_eq!(separate_output_path("plain", "hpp"), "plain.hpp");
    }

    #[test]
    fn scan_skips_ignored_and_hidden_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        std::fs::create_dir_all(root.join("forms")).expect("mkdir");
        std::fs::create_dir_all(root.join("build")).expect("mkdir");
        std::fs::create_dir_all(root.join(".git")).expect("mkdir");
        std::fs::write(root.join("app.ef"), ">QWidget\n").expect("write");
        std::fs::write(root.join("forms/login.eft"), ">QDialog\n").expect("write");
        std::fs::write(root.join("build/out.ef"), ">QWidget\n").expect("write");
        std::fs::write(root.join(".git/hidden.ef"), ">QWidget\n").expect("write");
        std::fs::write(root.join("notes.txt"), "not a template").expect("write");

        let found =
            scan_templates(root, &["build".to_string()]).expect("scan");
        let rels: Vec<_> = found.iter().map(|t| t.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["app.ef", "forms/login.eft"]);
        assert_eq!(found[1].class_name, "Login");
        assert_eq!(found[1].namespace, "Forms");
    }

    #[test]
    fn scanning_a_missing_directory_fails() {
        let err = scan_templates(Path::new("/definitely/not/here"), &[]).expect_err("must fail");
        assert!(matches!(err, EfError::InvalidPath(_)));
    }
}
