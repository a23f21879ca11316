use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::ContentRecord;
use crate::schema::KindSchema;

/// Locales every localized field is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    Uz,
    Ru,
    En,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Uz, Locale::Ru, Locale::En];

    pub fn tag(self) -> &'static str {
        match self {
            Locale::Uz => "uz",
            Locale::Ru => "ru",
            Locale::En => "en",
        }
    }

    /// Resolve a client-supplied locale tag. Anything outside the supported
    /// set, including no tag at all, falls back to Uzbek.
    pub fn resolve(requested: Option<&str>) -> Locale {
        requested
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocale;

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uz" => Ok(Locale::Uz),
            "ru" => Ok(Locale::Ru),
            "en" => Ok(Locale::En),
            _ => Err(UnknownLocale),
        }
    }
}

/// Read-time flattening of a record to one locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedView {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project `record` onto a single locale.
///
/// Each localized field appears once under its view key, holding the value
/// stored for the resolved locale (`null` when that locale was never set).
/// Scalars and attachment fields pass through; keys the schema does not
/// declare are not exposed.
pub fn project(schema: &KindSchema, record: &ContentRecord, requested: Option<&str>) -> ProjectedView {
    let locale = Locale::resolve(requested);
    let mut fields = Map::new();

    for field in schema.localized {
        let value = record
            .fields
            .get(&field.stored_key(locale))
            .cloned()
            .unwrap_or(Value::Null);
        fields.insert(field.view_key().to_string(), value);
    }

    let passthrough = schema
        .scalars
        .iter()
        .map(|s| s.name)
        .chain(schema.attachments.iter().map(|a| a.name));
    for key in passthrough {
        if let Some(value) = record.fields.get(key) {
            fields.insert(key.to_string(), value.clone());
        }
    }

    ProjectedView {
        id: record.id.clone(),
        fields,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}
