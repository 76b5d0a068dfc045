//! Build a [`Schema`] from schema markup.
//!
//! The document root holds `<class>` elements plus one configuration block per
//! backend (any other top-level element, keyed by its lower-cased name).
//! Inside a class:
//!
//! ```text
//! class -> attribute -> primitive | classRef | list -> primitive | classRef
//!       -> initialValue
//! ```
//!
//! Classes are registered when their end tag is seen. A `list` with a
//! `countFieldName` links the matching, already-declared primitive of the same
//! class as its dynamic length field. A missing match is a warning, not an error:
//! the count field may be inherited, and [`crate::validate`] decides.

use crate::ast::{
    BackendConfig, ElementType, FieldDef, FieldKind, InitialValue, PrimitiveField, Schema, SchemaClass,
};
use crate::markup::{self, Attribute, MarkupError, MarkupHandler, WalkError};
use crate::validate::{Diagnostic, DiagnosticKind};
use tracing::{debug, warn};

/// Loader output: the schema plus warnings raised while loading.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fatal loading failure; nothing is validated or generated after one of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    Markup(#[from] MarkupError),
    #[error("line {line}: <{element}> is not allowed inside <{context}>")]
    UnexpectedElement {
        element: String,
        context: String,
        line: usize,
    },
    #[error("line {line}: <{element}> requires attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: String,
        line: usize,
    },
    #[error("line {line}: class `{name}` is defined more than once")]
    DuplicateClass { name: String, line: usize },
    #[error("line {line}: {class}.{field} has no type element")]
    MissingFieldType {
        class: String,
        field: String,
        line: usize,
    },
    #[error("line {line}: {class}.{field} has more than one type element")]
    MultipleFieldTypes {
        class: String,
        field: String,
        line: usize,
    },
    #[error("line {line}: list type `{value}` (expected `fixed` or `variable`)")]
    InvalidListType { value: String, line: usize },
    #[error("line {line}: attribute `{attribute}` = `{value}` (expected `true` or `false`)")]
    InvalidBoolean {
        attribute: String,
        value: String,
        line: usize,
    },
}

/// Parse schema text into a class registry and backend configuration.
pub fn load_schema(source: &str) -> Result<LoadedSchema, LoadError> {
    let mut handler = SchemaHandler::default();
    markup::walk(source, &mut handler).map_err(|e| match e {
        WalkError::Markup(m) => LoadError::Markup(m),
        WalkError::Handler(h) => h,
    })?;
    debug!(
        classes = handler.schema.registry.len(),
        backends = handler.schema.backends.len(),
        "schema loaded"
    );
    Ok(LoadedSchema {
        schema: handler.schema,
        diagnostics: handler.diagnostics,
    })
}

const CLASS: &str = "class";
const ATTRIBUTE: &str = "attribute";
const PRIMITIVE: &str = "primitive";
const CLASS_REF: &str = "classRef";
const LIST: &str = "list";
const INITIAL_VALUE: &str = "initialValue";
const SCHEMA_ELEMENTS: [&str; 6] = [CLASS, ATTRIBUTE, PRIMITIVE, CLASS_REF, LIST, INITIAL_VALUE];

/// Schema element names match regardless of case; anything else passes through.
fn schema_element(name: &str) -> &str {
    SCHEMA_ELEMENTS
        .iter()
        .find(|e| e.eq_ignore_ascii_case(name))
        .copied()
        .unwrap_or(name)
}

/// Where an open element sits in the schema structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Backend,
    Class,
    Field,
    List,
    Leaf,
    Ignored,
}

#[derive(Debug)]
struct FieldCursor {
    def: FieldDef,
    has_type: bool,
    line: usize,
}

#[derive(Debug)]
struct ListCursor {
    variable: bool,
    length: usize,
    count_field: Option<String>,
    could_be_string: bool,
    element: Option<ElementType>,
}

/// Parser cursor, alive for one `load_schema` call.
#[derive(Default)]
struct SchemaHandler {
    schema: Schema,
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<Scope>,
    class: Option<SchemaClass>,
    field: Option<FieldCursor>,
    list: Option<ListCursor>,
}

impl MarkupHandler for SchemaHandler {
    type Error = LoadError;

    fn start_element(&mut self, name: &str, attributes: &[Attribute], line: usize) -> Result<(), LoadError> {
        let el = schema_element(name);
        let scope = match self.scopes.last().copied() {
            None => Scope::Root,
            Some(Scope::Root) if el == CLASS => {
                self.begin_class(attributes, line)?;
                Scope::Class
            }
            Some(Scope::Root) => {
                self.backend_block(name, attributes);
                Scope::Backend
            }
            Some(Scope::Class) if el == ATTRIBUTE => {
                self.begin_field(attributes, line)?;
                Scope::Field
            }
            Some(Scope::Class) if el == INITIAL_VALUE => {
                let field = required(name, attributes, "name", line)?;
                let value = required(name, attributes, "value", line)?;
                if let Some(class) = self.class.as_mut() {
                    class.initial_values.push(InitialValue { field, value });
                }
                Scope::Leaf
            }
            Some(Scope::Field) if el == PRIMITIVE || el == CLASS_REF => {
                let kind = if el == PRIMITIVE {
                    FieldKind::Primitive(PrimitiveField {
                        type_name: required(name, attributes, "type", line)?,
                        default_value: attr(attributes, "defaultValue").map(str::to_string),
                        counted_list: None,
                    })
                } else {
                    FieldKind::ClassRef {
                        class_name: required(name, attributes, "name", line)?,
                    }
                };
                self.set_field_type(kind, line)?;
                Scope::Leaf
            }
            Some(Scope::Field) if el == LIST => {
                self.begin_list(attributes, line)?;
                Scope::List
            }
            Some(Scope::List) if el == PRIMITIVE || el == CLASS_REF => {
                let element = if el == PRIMITIVE {
                    ElementType::Primitive(required(name, attributes, "type", line)?)
                } else {
                    ElementType::Class(required(name, attributes, "name", line)?)
                };
                if self.list.as_ref().map(|l| l.element.is_some()).unwrap_or(false) {
                    return Err(self.multiple_types(line));
                }
                let list = self.list.as_mut().ok_or_else(|| unexpected(name, LIST, line))?;
                list.element = Some(element);
                Scope::Leaf
            }
            Some(Scope::Backend) | Some(Scope::Leaf) | Some(Scope::Ignored) => Scope::Ignored,
            Some(context) => {
                if SCHEMA_ELEMENTS.contains(&el) {
                    return Err(unexpected(name, scope_name(context), line));
                }
                debug!(element = name, line, "ignoring unknown element");
                Scope::Ignored
            }
        };
        self.scopes.push(scope);
        Ok(())
    }

    fn end_element(&mut self, _name: &str, line: usize) -> Result<(), LoadError> {
        match self.scopes.pop() {
            Some(Scope::Class) => self.finish_class(line),
            Some(Scope::Field) => self.finish_field(),
            Some(Scope::List) => self.finish_list(line),
            _ => Ok(()),
        }
    }
}

impl SchemaHandler {
    fn begin_class(&mut self, attributes: &[Attribute], line: usize) -> Result<(), LoadError> {
        let mut class = SchemaClass::new(required(CLASS, attributes, "name", line)?);
        if let Some(parent) = attr(attributes, "inheritsFrom") {
            class.parent = parent.to_string();
        }
        class.comment = attr(attributes, "comment").map(str::to_string);
        class.xml_root_element = boolean(attributes, "xmlRootElement", line)?;
        self.class = Some(class);
        Ok(())
    }

    fn finish_class(&mut self, line: usize) -> Result<(), LoadError> {
        let Some(class) = self.class.take() else {
            return Ok(());
        };
        debug!(class = %class.name, fields = class.fields.len(), "class loaded");
        self.schema
            .registry
            .insert(class)
            .map_err(|dup| LoadError::DuplicateClass { name: dup.name, line })
    }

    fn begin_field(&mut self, attributes: &[Attribute], line: usize) -> Result<(), LoadError> {
        let name = required(ATTRIBUTE, attributes, "name", line)?;
        self.field = Some(FieldCursor {
            def: FieldDef {
                name,
                comment: attr(attributes, "comment").map(str::to_string),
                // Placeholder until the type element arrives.
                kind: FieldKind::ClassRef { class_name: String::new() },
            },
            has_type: false,
            line,
        });
        Ok(())
    }

    fn set_field_type(&mut self, kind: FieldKind, line: usize) -> Result<(), LoadError> {
        let multiple = self.multiple_types(line);
        let field = self.field.as_mut().ok_or_else(|| unexpected(PRIMITIVE, ATTRIBUTE, line))?;
        if field.has_type {
            return Err(multiple);
        }
        field.def.kind = kind;
        field.has_type = true;
        Ok(())
    }

    fn finish_field(&mut self) -> Result<(), LoadError> {
        let Some(field) = self.field.take() else {
            return Ok(());
        };
        let class = self.class.as_mut().ok_or_else(|| unexpected(ATTRIBUTE, "document", field.line))?;
        if !field.has_type {
            return Err(LoadError::MissingFieldType {
                class: class.name.clone(),
                field: field.def.name,
                line: field.line,
            });
        }
        class.fields.push(field.def);
        Ok(())
    }

    fn begin_list(&mut self, attributes: &[Attribute], line: usize) -> Result<(), LoadError> {
        if self.field.as_ref().map(|f| f.has_type).unwrap_or(false) {
            return Err(self.multiple_types(line));
        }
        let kind = required(LIST, attributes, "type", line)?;
        let variable = match kind.as_str() {
            "fixed" => false,
            "variable" => true,
            _ => return Err(LoadError::InvalidListType { value: kind, line }),
        };
        let could_be_string = boolean(attributes, "couldBeString", line)?;
        let mut list = ListCursor {
            variable,
            length: 0,
            count_field: None,
            could_be_string,
            element: None,
        };
        if variable {
            let count_field = required(LIST, attributes, "countFieldName", line)?;
            self.link_count_field(&count_field);
            list.count_field = Some(count_field);
        } else {
            list.length = self.list_length(attributes);
        }
        if let Some(field) = self.field.as_mut() {
            field.has_type = true;
        }
        self.list = Some(list);
        Ok(())
    }

    fn list_length(&mut self, attributes: &[Attribute]) -> usize {
        let raw = attr(attributes, "length").unwrap_or("");
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                let (class, field) = self.cursor_names();
                warn!(class = %class, field = %field, length = raw, "invalid fixed list length, using 0");
                0
            }
        }
    }

    /// Mark the same-class count field as the dynamic length of the list being declared.
    fn link_count_field(&mut self, count_field: &str) {
        let (class_name, field_name) = self.cursor_names();
        let Some(class) = self.class.as_mut() else {
            return;
        };
        // The list lands at the end of the field list when its attribute closes.
        let list_index = class.fields.len();
        let linked = class
            .fields
            .iter_mut()
            .find(|f| f.name == count_field)
            .and_then(|f| match &mut f.kind {
                FieldKind::Primitive(p) => {
                    p.counted_list = Some(list_index);
                    Some(())
                }
                _ => None,
            });
        if linked.is_none() {
            warn!(
                class = %class_name,
                field = %field_name,
                count_field,
                "count field not declared earlier in class; not linked as dynamic length"
            );
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::UnresolvedCountFieldLink,
                &class_name,
                Some(&field_name),
                format!("count field `{}` is not an earlier primitive of this class", count_field),
            ));
        }
    }

    fn finish_list(&mut self, line: usize) -> Result<(), LoadError> {
        let Some(list) = self.list.take() else {
            return Ok(());
        };
        let (class, field_name) = self.cursor_names();
        let element = list.element.ok_or(LoadError::MissingFieldType {
            class,
            field: field_name,
            line,
        })?;
        let kind = if list.variable {
            FieldKind::VariableList {
                element,
                count_field: list.count_field.unwrap_or_default(),
                could_be_string: list.could_be_string,
            }
        } else {
            FieldKind::FixedList {
                element,
                length: list.length,
                could_be_string: list.could_be_string,
            }
        };
        if let Some(field) = self.field.as_mut() {
            field.def.kind = kind;
        }
        Ok(())
    }

    fn backend_block(&mut self, name: &str, attributes: &[Attribute]) {
        let config = self
            .schema
            .backends
            .entry(name.to_ascii_lowercase())
            .or_insert_with(BackendConfig::new);
        for a in attributes {
            config.set(a.name.clone(), a.value.clone());
        }
    }

    fn cursor_names(&self) -> (String, String) {
        (
            self.class.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
            self.field.as_ref().map(|f| f.def.name.clone()).unwrap_or_default(),
        )
    }

    fn multiple_types(&self, line: usize) -> LoadError {
        let (class, field) = self.cursor_names();
        LoadError::MultipleFieldTypes { class, field, line }
    }
}

fn scope_name(scope: Scope) -> &'static str {
    match scope {
        Scope::Root => "document",
        Scope::Backend => "backend",
        Scope::Class => CLASS,
        Scope::Field => ATTRIBUTE,
        Scope::List => LIST,
        Scope::Leaf | Scope::Ignored => "element",
    }
}

fn unexpected(element: &str, context: &str, line: usize) -> LoadError {
    LoadError::UnexpectedElement {
        element: element.to_string(),
        context: context.to_string(),
        line,
    }
}

fn attr<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
}

fn required(element: &str, attributes: &[Attribute], name: &str, line: usize) -> Result<String, LoadError> {
    match attr(attributes, name) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(LoadError::MissingAttribute {
            element: element.to_string(),
            attribute: name.to_string(),
            line,
        }),
    }
}

fn boolean(attributes: &[Attribute], name: &str, line: usize) -> Result<bool, LoadError> {
    match attr(attributes, name).map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(LoadError::InvalidBoolean {
            attribute: name.to_string(),
            value: v.to_string(),
            line,
        }),
    }
}
