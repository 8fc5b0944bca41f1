//! Line-oriented grammar for `.ef` templates.
//!
//! The template language is indentation-nested. Each content line is one
//! of:
//!
//! ```text
//! >QWidget              widget node (optional `!Override`, `#refAlias`)
//! #text = hello {{v}}   property (dynamic when it interpolates variables)
//! %width = 3            free-form extra attribute
//! @clicked:bool = onOk  signal binding with optional argument types
//! -slot                 single mounting point
//! +rows                 list mounting point
//! ```
//!
//! Lines whose first non-blank character is `;` are directives or comments
//! and are invisible to the grammar (the semantic builder scans them from
//! the raw source). A blank or whitespace-only template parses to
//! "nothing", which callers treat as a valid empty unit.

use crate::ast::{DynamicValue, MountingPointDecl, Node, PropValue, SignalDecl, VarRef, WidgetDecl};
use std::collections::BTreeMap;

/// A grammar-level failure with the 1-based source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse one template source into its root node, or `None` when the
/// template has no content lines at all.
pub fn parse_template(source: &str) -> Result<Option<Node>, ParseError> {
    let mut indent_unit: Option<String> = None;
    // Stack of open widgets, innermost last, each with its nesting depth.
    let mut stack: Vec<(usize, WidgetDecl)> = Vec::new();
    let mut root: Option<Node> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        let depth = line_depth(raw_line, &mut indent_unit)
            .map_err(|message| ParseError { line: line_no, message })?;

        if trimmed.starts_with('>') {
            let decl = parse_widget_line(trimmed, line_no)?;
            if depth == 0 {
                if root.is_some() || !stack.is_empty() {
                    return Err(ParseError {
                        line: line_no,
                        message: "template has more than one root node".to_string(),
                    });
                }
            } else {
                fold_to_depth(&mut stack, depth - 1, line_no)?;
            }
            stack.push((depth, decl));
            continue;
        }

        // Everything else belongs to the widget one level up.
        if depth == 0 {
            return Err(ParseError {
                line: line_no,
                message: "template root must be a widget (`>Type`)".to_string(),
            });
        }
        fold_to_depth(&mut stack, depth - 1, line_no)?;
        let Some((_, owner)) = stack.last_mut() else {
            return Err(ParseError {
                line: line_no,
                message: "line is not nested under any widget".to_string(),
            });
        };

        match trimmed.as_bytes()[0] {
            b'#' => {
                let (name, value) = parse_assignment(&trimmed[1..], line_no, "property")?;
                owner.properties.push((name, parse_prop_value(&value, line_no)?));
            }
            b'%' => {
                let (name, value) = parse_assignment(&trimmed[1..], line_no, "attribute")?;
                owner.extra_attrs.insert(name, value);
            }
            b'@' => {
                owner.signals.push(parse_signal_line(&trimmed[1..], line_no)?);
            }
            b'-' | b'+' => {
                let name = trimmed[1..].trim();
                if name.is_empty() {
                    return Err(ParseError {
                        line: line_no,
                        message: "mounting point needs a name".to_string(),
                    });
                }
                owner.children.push(Node::MountingPoint(MountingPointDecl {
                    name: name.to_string(),
                    is_list: trimmed.starts_with('+'),
                }));
            }
            _ => {
                return Err(ParseError {
                    line: line_no,
                    message: format!("unrecognized line `{trimmed}`"),
                });
            }
        }
    }

    // Close every still-open widget into its parent, bottom up.
    while let Some((_, decl)) = stack.pop() {
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(Node::Widget(decl)),
            None => root = Some(Node::Widget(decl)),
        }
    }

    Ok(root)
}

/// Compute the nesting depth of a line, learning the indent unit from the
/// first indented line seen.
fn line_depth(raw_line: &str, indent_unit: &mut Option<String>) -> Result<usize, String> {
    let content_start = raw_line.len() - raw_line.trim_start().len();
    let leading = &raw_line[..content_start];
    if leading.is_empty() {
        return Ok(0);
    }
    if leading.contains('\t') && leading.contains(' ') {
        return Err("indentation mixes tabs and spaces".to_string());
    }
    let unit = indent_unit.get_or_insert_with(|| leading.to_string());
    if leading.len() % unit.len() != 0 || !leading.chars().all(|c| unit.contains(c)) {
        return Err(format!(
            "indentation is not a whole repetition of the first indent ({:?})",
            unit
        ));
    }
    Ok(leading.len() / unit.len())
}

/// Pop completed widgets until the innermost open widget sits at `depth`.
fn fold_to_depth(
    stack: &mut Vec<(usize, WidgetDecl)>,
    depth: usize,
    line_no: usize,
) -> Result<(), ParseError> {
    while stack.len() > 1 {
        match stack.last() {
            Some((d, _)) if *d > depth => {
                if let Some((_, decl)) = stack.pop() {
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.children.push(Node::Widget(decl));
                    }
                }
            }
            _ => break,
        }
    }
    match stack.last() {
        Some((d, _)) if *d == depth => Ok(()),
        _ => Err(ParseError {
            line: line_no,
            message: "line is indented too deep for its parent".to_string(),
        }),
    }
}

fn parse_widget_line(trimmed: &str, line_no: usize) -> Result<WidgetDecl, ParseError> {
    let rest = trimmed[1..].trim();
    let (type_name, ref_alias) = match rest.split_once('#') {
        Some((ty, alias)) => (ty.trim(), Some(alias.trim())),
        None => (rest, None),
    };
    if type_name.is_empty() {
        return Err(ParseError {
            line: line_no,
            message: "widget line needs a type name".to_string(),
        });
    }
    if let Some(alias) = ref_alias {
        if alias.is_empty() {
            return Err(ParseError {
                line: line_no,
                message: "reference alias after `#` must not be empty".to_string(),
            });
        }
    }
    Ok(WidgetDecl {
        type_name: type_name.to_string(),
        ref_alias: ref_alias.map(|a| a.to_string()),
        properties: Vec::new(),
        signals: Vec::new(),
        extra_attrs: BTreeMap::new(),
        children: Vec::new(),
    })
}

/// Split `name = value`, keeping the value verbatim apart from the single
/// space conventionally following `=`.
fn parse_assignment(
    rest: &str,
    line_no: usize,
    what: &str,
) -> Result<(String, String), ParseError> {
    let Some((name, value)) = rest.split_once('=') else {
        return Err(ParseError {
            line: line_no,
            message: format!("{what} line needs `name = value`"),
        });
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError {
            line: line_no,
            message: format!("{what} name must not be empty"),
        });
    }
    Ok((name.to_string(), value.strip_prefix(' ').unwrap_or(value).to_string()))
}

fn parse_signal_line(rest: &str, line_no: usize) -> Result<SignalDecl, ParseError> {
    let (def, handler) = parse_assignment(rest, line_no, "signal")?;
    let handler = handler.trim().to_string();
    if handler.is_empty() {
        return Err(ParseError {
            line: line_no,
            message: "signal line needs a handler name".to_string(),
        });
    }
    let (name, args) = match def.split_once(':') {
        Some((name, args)) => (
            name.trim().to_string(),
            args.split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        ),
        None => (def.trim().to_string(), Vec::new()),
    };
    if name.is_empty() {
        return Err(ParseError {
            line: line_no,
            message: "signal line needs a signal name".to_string(),
        });
    }
    Ok(SignalDecl { name, args, handler })
}

/// Parse a property value into its static or dynamic form. `{{path}}`,
/// `{{path = default}}`, and `{{(type)path}}` interpolations make the
/// value dynamic; everything else is a static literal.
fn parse_prop_value(raw: &str, line_no: usize) -> Result<PropValue, ParseError> {
    if !raw.contains("{{") {
        return Ok(PropValue::Static(raw.to_string()));
    }

    let mut segments = Vec::new();
    let mut vars = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;
    loop {
        match rest.find("{{") {
            None => {
                literal.push_str(rest);
                break;
            }
            Some(at) => {
                literal.push_str(&rest[..at]);
                let after = &rest[at + 2..];
                let Some(end) = after.find("}}") else {
                    return Err(ParseError {
                        line: line_no,
                        message: "unterminated `{{` in property value".to_string(),
                    });
                };
                let inner = &after[..end];
                let (path, default) = match inner.split_once('=') {
                    Some((path, default)) => (path.trim(), Some(default.trim().to_string())),
                    None => (inner.trim(), None),
                };
                if path.is_empty() {
                    return Err(ParseError {
                        line: line_no,
                        message: "empty variable reference".to_string(),
                    });
                }
                segments.push(std::mem::take(&mut literal));
                vars.push(VarRef {
                    path: path.to_string(),
                    default,
                });
                rest = &after[end + 2..];
            }
        }
    }
    segments.push(literal);
    Ok(PropValue::Dynamic(DynamicValue { segments, vars }))
}
