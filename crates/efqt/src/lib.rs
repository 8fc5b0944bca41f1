#![deny(clippy::unwrap_used)]

//! efqt compiles declarative `.ef` UI templates into C++ classes built on
//! the Qt object model. The pipeline per template is parse -> build ->
//! render; an embedded manifest in the generated header decides when a
//! rebuild is actually necessary.

pub mod ast;
mod bindings;
mod builder;
mod cache;
mod codegen;
mod config;
mod driver;
mod parser;
mod placement;
mod scaffold;
mod scanner;

pub use bindings::{PropertyClasses, VarType};
pub use builder::{
    build_model, scan_metadata, CompiledModel, DataVar, MethodRecord, MountRecord, PropRecord,
    RefRecord, TemplateMetadata, WidgetRecord,
};
pub use cache::{needs_regeneration, read_manifest, source_hash, write_output, Manifest};
pub use codegen::{render_class, render_translation_unit, UnitContext};
pub use config::{load_extra_config, ExtraConfig, GeneratorConfig, DEFAULT_CONFIG_PATH};
pub use driver::{
    compile_template, render_output, CompiledUnit, GenOptions, Session, TemplateInput,
    GENERATOR_VERSION,
};
pub use parser::{parse_template, ParseError};
pub use placement::{classify_widget, resolve_initialization, WidgetClass};
pub use scaffold::write_scaffold;
pub use scanner::{
    is_template_path, scan_templates, separate_output_path, template_identity, ScannedTemplate,
    TEMPLATE_EXTENSIONS,
};

#[derive(Debug, thiserror::Error)]
pub enum EfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("{path}:{line}: parse error: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
    #[error("{path}: {message}")]
    Structural { path: String, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0} template(s) failed to compile")]
    Failed(usize),
}
