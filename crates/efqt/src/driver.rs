//! High-level compile entry points: one-template compilation and the
//! incremental session the generate and watch flows share.

use std::collections::BTreeSet;

use crate::builder::{build_model, scan_metadata};
use crate::cache::source_hash;
use crate::codegen::{render_class, render_translation_unit, UnitContext};
use crate::config::GeneratorConfig;
use crate::parser::parse_template;
use crate::EfError;

/// Version stamp embedded in the first output line and compared by the
/// build cache.
pub const GENERATOR_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Global run flags shared across commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    pub verbose: bool,
    pub dry_run: bool,
}

/// One template handed to the compiler, identity already derived from its
/// path (and overridable by `;classname`/`;namespace` directives).
#[derive(Debug, Clone)]
pub struct TemplateInput {
    pub rel_path: String,
    pub class_name: String,
    pub namespace: String,
    pub source: String,
}

/// One template's compiled output plus the metadata the aggregator needs.
/// Superseded wholesale when its template recompiles.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub rel_path: String,
    pub source_hash: String,
    pub class_name: String,
    pub namespace: String,
    /// Rendered class body, starting with the `// source: path:hash`
    /// manifest line.
    pub class_text: String,
    pub includes: BTreeSet<String>,
    pub custom_includes: Vec<String>,
    /// True for templates that parsed to nothing; such units only carry
    /// their manifest line.
    pub empty: bool,
}

/// Compile one template: scan directives, parse, build, render. A
/// whitespace-only template yields a valid empty unit.
pub fn compile_template(
    input: &TemplateInput,
    config: &GeneratorConfig,
) -> Result<CompiledUnit, EfError> {
    let hash = source_hash(&input.source);
    let meta = scan_metadata(&input.source);
    let class_name = meta
        .class_name
        .clone()
        .unwrap_or_else(|| input.class_name.clone());
    let namespace = meta
        .namespace
        .clone()
        .unwrap_or_else(|| input.namespace.clone());

    let root = parse_template(&input.source).map_err(|err| EfError::Parse {
        path: input.rel_path.clone(),
        line: err.line,
        message: err.message,
    })?;
    let Some(root) = root else {
        return Ok(CompiledUnit {
            rel_path: input.rel_path.clone(),
            source_hash: hash.clone(),
            class_name,
            namespace,
            class_text: format!("// source: {}:{hash}\n", input.rel_path),
            includes: BTreeSet::new(),
            custom_includes: meta.includes,
            empty: true,
        });
    };

    let model = build_model(
        &root,
        &input.rel_path,
        &config.classes,
        &config.no_auto_includes,
    )?;
    let ctx = UnitContext {
        file_path: &input.rel_path,
        file_hash: &hash,
        class_name: &class_name,
        namespace: &namespace,
        custom_usings: &meta.usings,
    };
    let class_text = render_class(&ctx, &model, &config.classes);
    Ok(CompiledUnit {
        rel_path: input.rel_path.clone(),
        source_hash: hash,
        class_name,
        namespace,
        class_text,
        includes: model.includes,
        custom_includes: meta.includes,
        empty: false,
    })
}

/// Prefix the aggregated translation unit with the version stamp the
/// build cache reads back.
pub fn render_output(units: &[&CompiledUnit]) -> String {
    format!(
        "// Generated by efqt {GENERATOR_VERSION}\n{}",
        render_translation_unit(units)
    )
}

/// The in-memory result map of an incremental run: compiled units keyed
/// by relative path, kept in first-seen order. The watch orchestrator
/// recompiles only changed templates and re-renders from here; a failed
/// recompile leaves the previous unit in place so one bad edit never
/// corrupts its siblings.
#[derive(Debug, Default)]
pub struct Session {
    units: Vec<CompiledUnit>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn units(&self) -> Vec<&CompiledUnit> {
        self.units.iter().collect()
    }

    pub fn get(&self, rel_path: &str) -> Option<&CompiledUnit> {
        self.units.iter().find(|u| u.rel_path == rel_path)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Compile one template and store the unit, replacing any previous
    /// unit for the same path in place.
    pub fn compile(
        &mut self,
        input: &TemplateInput,
        config: &GeneratorConfig,
    ) -> Result<&CompiledUnit, EfError> {
        let unit = compile_template(input, config)?;
        match self.units.iter().position(|u| u.rel_path == unit.rel_path) {
            Some(at) => {
                self.units[at] = unit;
                Ok(&self.units[at])
            }
            None => {
                self.units.push(unit);
                match self.units.last() {
                    Some(unit) => Ok(unit),
                    None => Err(EfError::InvalidPath(input.rel_path.clone())),
                }
            }
        }
    }

    /// Evict a removed template's unit. Returns whether one was present.
    pub fn remove(&mut self, rel_path: &str) -> bool {
        let before = self.units.len();
        self.units.retain(|u| u.rel_path != rel_path);
        self.units.len() != before
    }

    /// Render the aggregated output from every stored unit.
    pub fn render(&self) -> String {
        render_output(&self.units())
    }

    /// `(path, hash)` pairs for the cache decision.
    pub fn manifest_entries(&self) -> Vec<(String, String)> {
        self.units
            .iter()
            .map(|u| (u.rel_path.clone(), u.source_hash.clone()))
            .collect()
    }
}
