use serde_json::{Map, Value};
use thiserror::Error;

use crate::locale::Locale;
use crate::record::RecordFilter;

/// Declarative description of one content kind.
///
/// Every kind shares the same lifecycle; what differs between them is which
/// fields they carry, which of those are required, and which hold file
/// references. Services, repositories and the HTTP layer all read this
/// descriptor instead of hard-coding per-kind rules.
#[derive(Debug)]
pub struct KindSchema {
    /// Route segment and persisted kind tag (e.g. `"leader"`).
    pub name: &'static str,
    /// Key used for listings in response bodies (e.g. `"leaders"`).
    pub plural: &'static str,
    /// Human-readable label used in response messages.
    pub label: &'static str,
    pub localized: &'static [LocalizedField],
    pub scalars: &'static [ScalarField],
    pub attachments: &'static [AttachmentField],
    pub order: ListOrder,
    /// Boolean scalar that must be `true` for a record to appear in the
    /// public (localized) listing.
    pub public_gate: Option<&'static str>,
}

/// A semantic field stored once per locale as `<name>_<locale>`.
#[derive(Debug)]
pub struct LocalizedField {
    pub name: &'static str,
    pub required: bool,
    /// Key used in projected views when it differs from `name`.
    pub view_key: Option<&'static str>,
}

impl LocalizedField {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            view_key: None,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            view_key: None,
        }
    }

    pub const fn viewed_as(mut self, key: &'static str) -> Self {
        self.view_key = Some(key);
        self
    }

    pub fn view_key(&self) -> &'static str {
        self.view_key.unwrap_or(self.name)
    }

    pub fn stored_key(&self, locale: Locale) -> String {
        format!("{}_{}", self.name, locale.tag())
    }
}

#[derive(Debug)]
pub struct ScalarField {
    pub name: &'static str,
    pub kind: ScalarKind,
    pub required: bool,
}

impl ScalarField {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ScalarKind::Text,
            required: false,
        }
    }

    pub const fn flag(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: ScalarKind::Flag { default },
            required: false,
        }
    }

    pub const fn choice(name: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: ScalarKind::Choice(options),
            required: false,
        }
    }

    pub const fn require(mut self) -> Self {
        self.required = true;
        self
    }

    /// Flags and choices can be used as exact-match listing filters.
    pub fn is_filterable(&self) -> bool {
        !matches!(self.kind, ScalarKind::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Flag { default: bool },
    Choice(&'static [&'static str]),
}

#[derive(Debug)]
pub struct AttachmentField {
    pub name: &'static str,
    pub cardinality: Cardinality,
    /// Subdirectory of the uploads root that new files are committed into.
    pub directory: &'static str,
    /// Request key listing gallery entries to drop on update.
    pub removal_key: Option<&'static str>,
}

impl AttachmentField {
    pub const fn single(name: &'static str, directory: &'static str) -> Self {
        Self {
            name,
            cardinality: Cardinality::Single,
            directory,
            removal_key: None,
        }
    }

    pub const fn gallery(
        name: &'static str,
        directory: &'static str,
        removal_key: &'static str,
    ) -> Self {
        Self {
            name,
            cardinality: Cardinality::Gallery,
            directory,
            removal_key: Some(removal_key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Gallery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// Oldest record first.
    Insertion,
    NewestFirst,
}

/// Validation failure for inbound field values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field '{field}' is required in all locales (missing '{key}')")]
    MissingLocale { field: &'static str, key: String },
    #[error("Field '{0}' is required")]
    Missing(&'static str),
    #[error("Field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("Field '{field}' must be one of: {allowed}")]
    NotAllowed { field: String, allowed: String },
    #[error("Field '{0}' does not accept file uploads")]
    UnexpectedUpload(String),
    #[error("Field '{0}' accepts a single file")]
    TooManyUploads(&'static str),
    #[error("Cannot filter by '{0}'")]
    NotFilterable(String),
}

/// Whether a missing value should be treated as an error or filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

impl KindSchema {
    pub fn attachment(&self, name: &str) -> Option<&AttachmentField> {
        self.attachments.iter().find(|a| a.name == name)
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarField> {
        self.scalars.iter().find(|s| s.name == name)
    }

    /// Attachment field whose removal list is sent under `key`.
    pub fn removal_target(&self, key: &str) -> Option<&AttachmentField> {
        self.attachments
            .iter()
            .find(|a| a.removal_key == Some(key))
    }

    /// Validate and normalize the textual fields of a new record.
    ///
    /// Unknown keys and attachment keys are dropped: attachments can only be
    /// set through uploads.
    pub fn normalize_create(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>, FieldError> {
        self.normalize(raw, Mode::Create)
    }

    /// Validate a partial update. Absent keys are left out of the result so
    /// the stored values survive.
    pub fn normalize_update(&self, raw: &Map<String, Value>) -> Result<Map<String, Value>, FieldError> {
        self.normalize(raw, Mode::Update)
    }

    fn normalize(&self, raw: &Map<String, Value>, mode: Mode) -> Result<Map<String, Value>, FieldError> {
        let mut out = Map::new();

        for field in self.localized {
            for locale in Locale::ALL {
                let key = field.stored_key(locale);
                match raw.get(&key).map(|v| text_value(&key, v)).transpose()? {
                    Some(text) if !text.trim().is_empty() => {
                        out.insert(key, Value::String(text));
                    }
                    Some(text) => {
                        if field.required {
                            return Err(FieldError::MissingLocale {
                                field: field.name,
                                key,
                            });
                        }
                        out.insert(key, Value::String(text));
                    }
                    None if field.required && mode == Mode::Create => {
                        return Err(FieldError::MissingLocale {
                            field: field.name,
                            key,
                        });
                    }
                    None => {}
                }
            }
        }

        for scalar in self.scalars {
            let value = match raw.get(scalar.name) {
                Some(Value::Null) | None => None,
                Some(v) => Some(scalar_value(scalar, v)?),
            };

            match value {
                Some(Value::String(s)) if s.trim().is_empty() && scalar.required => {
                    return Err(FieldError::Missing(scalar.name));
                }
                Some(v) => {
                    out.insert(scalar.name.to_string(), v);
                }
                None if mode == Mode::Create => {
                    if scalar.required {
                        return Err(FieldError::Missing(scalar.name));
                    }
                    if let ScalarKind::Flag { default } = scalar.kind {
                        out.insert(scalar.name.to_string(), Value::Bool(default));
                    }
                }
                None => {}
            }
        }

        Ok(out)
    }

    /// Build an exact-match filter from query parameters.
    pub fn parse_filter<'a, I>(&self, params: I) -> Result<RecordFilter, FieldError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = RecordFilter::default();
        for (key, raw) in params {
            let scalar = self
                .scalar(key)
                .filter(|s| s.is_filterable())
                .ok_or_else(|| FieldError::NotFilterable(key.to_string()))?;
            let value = scalar_value(scalar, &Value::String(raw.to_string()))?;
            filter.insert(scalar.name, value);
        }
        Ok(filter)
    }
}

fn text_value(key: &str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FieldError::WrongType {
            field: key.to_string(),
            expected: "a string",
        }),
    }
}

fn scalar_value(field: &ScalarField, value: &Value) -> Result<Value, FieldError> {
    match field.kind {
        ScalarKind::Text => text_value(field.name, value).map(Value::String),
        ScalarKind::Flag { .. } => parse_flag(value).map(Value::Bool).ok_or_else(|| {
            FieldError::WrongType {
                field: field.name.to_string(),
                expected: "a boolean",
            }
        }),
        ScalarKind::Choice(options) => {
            let text = text_value(field.name, value)?;
            if options.contains(&text.as_str()) {
                Ok(Value::String(text))
            } else {
                Err(FieldError::NotAllowed {
                    field: field.name.to_string(),
                    allowed: options.join(", "),
                })
            }
        }
    }
}

/// Multipart bodies carry booleans as text.
fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}
