//! Layout placement: widget-class inference and the attachment calls that
//! wire each widget to its structural parent.
//!
//! Classification is an ordered rule table over the lowercased declared
//! type name; an explicit `!Override` suffix on the declaration beats
//! every rule. Attachment is a single preorder pass over the widget arena
//! with per-layout position state (grid cell counters, form label/field
//! alternation).

use std::collections::{BTreeMap, HashMap};

use crate::builder::WidgetRecord;

/// Structural category of a widget, governing how children attach to it.
/// Distinct from the declared toolkit type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetClass {
    Widget,
    Layout,
    Item,
    Action,
    Separator,
    MenuBar,
    Menu,
}

impl WidgetClass {
    /// Suffix of the attachment method named after this class
    /// (`addWidget`, `addLayout`, `setWidget`, ...).
    pub fn method_suffix(self) -> &'static str {
        match self {
            WidgetClass::Widget => "Widget",
            WidgetClass::Layout => "Layout",
            WidgetClass::Item => "Item",
            WidgetClass::Action => "Action",
            WidgetClass::Separator => "Separator",
            WidgetClass::MenuBar => "MenuBar",
            WidgetClass::Menu => "Menu",
        }
    }

    /// Decorative classes have no instance field, no constructor call and
    /// no ref entry in the generated class.
    pub fn is_virtual(self) -> bool {
        matches!(self, WidgetClass::Separator)
    }

    fn from_override(name: &str) -> Option<WidgetClass> {
        match name {
            "Widget" => Some(WidgetClass::Widget),
            "Layout" => Some(WidgetClass::Layout),
            "Item" => Some(WidgetClass::Item),
            "Action" => Some(WidgetClass::Action),
            "Separator" | "EFSeparator" => Some(WidgetClass::Separator),
            "MenuBar" => Some(WidgetClass::MenuBar),
            "Menu" => Some(WidgetClass::Menu),
            _ => None,
        }
    }
}

/// Substring rules evaluated top to bottom; first match wins. "menubar"
/// must precede "menu".
const CLASS_RULES: &[(&str, WidgetClass)] = &[
    ("item", WidgetClass::Item),
    ("layout", WidgetClass::Layout),
    ("action", WidgetClass::Action),
    ("efseparator", WidgetClass::Separator),
    ("menubar", WidgetClass::MenuBar),
    ("menu", WidgetClass::Menu),
];

/// Split a declared type name into the actual toolkit type and its
/// inferred widget class. `QFrame!Layout` forces the class; otherwise the
/// rule table decides, defaulting to `Widget`.
pub fn classify_widget(declared: &str) -> (String, WidgetClass) {
    if let Some((name, suffix)) = declared.split_once('!') {
        if let Some(class) = WidgetClass::from_override(suffix) {
            return (name.to_string(), class);
        }
        return (name.to_string(), heuristic_class(name));
    }
    (declared.to_string(), heuristic_class(declared))
}

fn heuristic_class(name: &str) -> WidgetClass {
    let lowered = name.to_lowercase();
    for (needle, class) in CLASS_RULES {
        if lowered.contains(needle) {
            return *class;
        }
    }
    WidgetClass::Widget
}

/// Layout-specific mutable counters advanced as children attach.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PositionState {
    Plain,
    Grid { index: usize, width: Option<usize> },
    Form { index: usize, label_next: bool },
}

#[derive(Debug, Clone)]
struct PlacedWidget {
    class: WidgetClass,
    state: PositionState,
}

fn placed_state(type_name: &str, extra: &BTreeMap<String, String>) -> Result<PositionState, String> {
    if type_name == "QFormLayout" {
        return Ok(PositionState::Form {
            index: 0,
            label_next: true,
        });
    }
    if type_name == "QGridLayout" {
        let width = match extra.get("width") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| format!("grid `width` must be an integer, got `{raw}`"))?,
            ),
            None => None,
        };
        return Ok(PositionState::Grid { index: 0, width });
    }
    Ok(PositionState::Plain)
}

/// Compute the attachment statement for one child, advancing the parent's
/// position state. `None` means the child is legally left unattached
/// (plain widget children are parented by their constructor; invalid menu
/// children are dropped).
fn attachment_call(
    parent_inner: &str,
    parent: &mut PlacedWidget,
    child_inner: &str,
    child_class: WidgetClass,
    child_extra: &BTreeMap<String, String>,
) -> Result<Option<String>, String> {
    let suffix = child_class.method_suffix();
    match parent.class {
        WidgetClass::Item | WidgetClass::Action | WidgetClass::Separator => Err(format!(
            "`{child_inner}` cannot be attached: {}-class widget `{parent_inner}` takes no children",
            parent.class.method_suffix()
        )),
        WidgetClass::Layout => match &mut parent.state {
            PositionState::Grid { index, width } => {
                let explicit = child_extra.get("position");
                let stmt = match (explicit, width.as_ref()) {
                    (Some(position), _) => {
                        format!("{parent_inner}->add{suffix}({child_inner}, {position});")
                    }
                    (None, Some(width)) => {
                        let row = *index / *width;
                        let col = *index - row * *width;
                        format!("{parent_inner}->add{suffix}({child_inner}, {row}, {col});")
                    }
                    (None, None) => {
                        return Err(
                            "grid layout needs a `width` attribute, or an explicit `position` on each child"
                                .to_string(),
                        );
                    }
                };
                *index += 1;
                Ok(Some(stmt))
            }
            PositionState::Form { index, label_next } => {
                if let Some(position) = child_extra.get("position") {
                    return Ok(Some(format!(
                        "{parent_inner}->set{suffix}({position}, {child_inner});"
                    )));
                }
                let row = *index;
                let role = if *label_next {
                    "QFormLayout::ItemRole::LabelRole"
                } else {
                    "QFormLayout::ItemRole::FieldRole"
                };
                if !*label_next {
                    *index += 1;
                }
                *label_next = !*label_next;
                Ok(Some(format!(
                    "{parent_inner}->set{suffix}({row}, {role}, {child_inner});"
                )))
            }
            PositionState::Plain => Ok(Some(format!("{parent_inner}->add{suffix}({child_inner});"))),
        },
        WidgetClass::Widget => {
            if child_class == WidgetClass::Layout {
                Ok(Some(format!("{parent_inner}->set{suffix}({child_inner});")))
            } else {
                Ok(None)
            }
        }
        WidgetClass::MenuBar | WidgetClass::Menu => match child_class {
            WidgetClass::Separator => Ok(Some(format!("{parent_inner}->addSeparator();"))),
            WidgetClass::Menu | WidgetClass::Action => {
                Ok(Some(format!("{parent_inner}->add{suffix}({child_inner});")))
            }
            _ => Ok(None),
        },
    }
}

/// Walk the widget arena in traversal order and derive the full
/// `__init_widgets` statement sequence: construction plus attachment for
/// every widget, `__set_widget` for every mounting point. The first
/// widget of the tree is the class instance itself and is never attached.
pub fn resolve_initialization(widgets: &[WidgetRecord]) -> Result<Vec<String>, String> {
    let mut placements: HashMap<String, PlacedWidget> = HashMap::new();
    let mut stmts = Vec::new();
    let mut top_initialized = false;

    for widget in widgets {
        if widget.mount_point {
            let parent = widget.parent.as_deref().unwrap_or("this");
            stmts.push(format!("{}.__set_widget({parent});", widget.inner_name));
            continue;
        }

        let state = placed_state(&widget.type_name, &widget.extra)?;

        if !top_initialized {
            stmts.push(format!("{} = this;", widget.inner_name));
            placements.insert(
                widget.inner_name.clone(),
                PlacedWidget {
                    class: widget.widget_class,
                    state,
                },
            );
            top_initialized = true;
            continue;
        }

        let previous_layer = widget.parent_layout.clone().or_else(|| widget.parent.clone());
        let previous_class = previous_layer
            .as_ref()
            .and_then(|name| placements.get(name))
            .map(|placed| placed.class);

        if !widget.widget_class.is_virtual() {
            let ctor = if widget.type_name.contains("Spacer") {
                format!("{} = new {}(0, 0);", widget.inner_name, widget.type_name)
            } else if previous_class == Some(WidgetClass::Layout)
                && widget.widget_class == WidgetClass::Layout
            {
                // A layout nested in a layout has no widget parent to adopt it.
                format!("{} = new {}();", widget.inner_name, widget.type_name)
            } else {
                format!(
                    "{} = new {}({});",
                    widget.inner_name,
                    widget.type_name,
                    widget.parent.as_deref().unwrap_or("")
                )
            };
            stmts.push(ctor);
        }

        if let Some(layer) = &previous_layer {
            if let Some(parent_entry) = placements.get_mut(layer) {
                if let Some(stmt) = attachment_call(
                    layer,
                    parent_entry,
                    &widget.inner_name,
                    widget.widget_class,
                    &widget.extra,
                )? {
                    stmts.push(stmt);
                }
            }
        }

        placements.insert(
            widget.inner_name.clone(),
            PlacedWidget {
                class: widget.widget_class,
                state,
            },
        );
    }

    Ok(stmts)
}
