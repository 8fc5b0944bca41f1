//! Optional user configuration extending the property-classification sets
//! and the auto-include suppression set.
//!
//! The default config path (`.efextraconfig`) may be absent, in which case
//! the built-in sets apply unchanged; an explicitly named config file must
//! exist, and a malformed file is always reported.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::bindings::PropertyClasses;
use crate::EfError;

pub const DEFAULT_CONFIG_PATH: &str = ".efextraconfig";

/// Raw shape of `.efextraconfig`: every key optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtraConfig {
    #[serde(default, rename = "STRPROPS")]
    pub str_props: Vec<String>,
    #[serde(default, rename = "BOOLPROPS")]
    pub bool_props: Vec<String>,
    #[serde(default, rename = "FLOATPROPS")]
    pub float_props: Vec<String>,
    #[serde(default, rename = "DOUBLEPROPS")]
    pub double_props: Vec<String>,
    #[serde(default, rename = "NOAUTOINCLUDES")]
    pub no_auto_includes: Vec<String>,
}

/// Read and parse an extra-config file. `optional` tolerates a missing
/// file (the default-path case) by returning `None`.
pub fn load_extra_config(path: &Path, optional: bool) -> Result<Option<ExtraConfig>, EfError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && optional => return Ok(None),
        Err(err) => return Err(EfError::Io(err)),
    };
    let config: ExtraConfig = serde_json::from_str(&text)
        .map_err(|err| EfError::Config(format!("{}: {err}", path.display())))?;
    Ok(Some(config))
}

/// Everything the compiler needs injected per run: classification sets for
/// the binding resolver plus the include-suppression set.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub classes: PropertyClasses,
    pub no_auto_includes: HashSet<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            classes: PropertyClasses::default(),
            no_auto_includes: HashSet::new(),
        }
    }
}

impl GeneratorConfig {
    /// Built-in defaults extended by the user's extra config, when present.
    pub fn load(path: &Path, optional: bool, verbose: bool) -> Result<GeneratorConfig, EfError> {
        let mut config = GeneratorConfig::default();
        if verbose {
            eprintln!("[V] Reading extra config: {}", path.display());
        }
        match load_extra_config(path, optional)? {
            Some(extra) => config.apply(&extra),
            None if verbose => eprintln!("[V] Default extra config read failed, skipped"),
            None => {}
        }
        Ok(config)
    }

    pub fn apply(&mut self, extra: &ExtraConfig) {
        self.classes.extend(
            &extra.str_props,
            &extra.bool_props,
            &extra.float_props,
            &extra.double_props,
        );
        self.no_auto_includes
            .extend(extra.no_auto_includes.iter().cloned());
    }
}
