//! Starter-project scaffold, embedded at compile time and copied into the
//! destination directory by `efqt init`.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir, DirEntry};

use crate::EfError;

static TEMPLATE_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Copy the embedded starter project into `dest`, refusing to clobber
/// existing files unless `overwrite` is set. Returns the written paths.
pub fn write_scaffold(dest: &Path, overwrite: bool) -> Result<Vec<PathBuf>, EfError> {
    fs::create_dir_all(dest)?;
    let mut written = Vec::new();
    copy_entries(TEMPLATE_DIR.entries(), dest, overwrite, &mut written)?;
    Ok(written)
}

fn copy_entries(
    entries: &[DirEntry<'_>],
    dest: &Path,
    overwrite: bool,
    written: &mut Vec<PathBuf>,
) -> Result<(), EfError> {
    for entry in entries {
        match entry {
            DirEntry::Dir(dir) => copy_entries(dir.entries(), dest, overwrite, written)?,
            DirEntry::File(file) => {
                let target = dest.join(file.path());
                if target.exists() && !overwrite {
                    return Err(EfError::Io(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        format!("refusing to overwrite {}", target.display()),
                    )));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, file.contents())?;
                written.push(target);
            }
        }
    }
    Ok(())
}
