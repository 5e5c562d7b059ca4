//! Run-time record types built from user field descriptors.
//!
//! A [`RecordType`] is an ordered list of attribute names, each holding an
//! optional text value. A [`ContainerType`] wraps it as a sequence under
//! [`LISTINGS_KEY`], which is the shape the extraction model is asked to fill
//! and the key every consumer reads the records back from.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Attribute under which the container holds its records.
pub const LISTINGS_KEY: &str = "listings";

/// Schema name reported to the extraction service.
pub const CONTAINER_SCHEMA_NAME: &str = "DynamicListingsContainer";

/// Turn a free-text field descriptor into an attribute name.
///
/// Trims, lower-cases, collapses whitespace runs into `_` and drops
/// anything that is not alphanumeric or `_`.
pub fn sanitize_field_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut pending_space = false;

    for c in field.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        for lower in c.to_lowercase() {
            if !(lower.is_alphanumeric() || lower == '_') {
                continue;
            }
            if pending_space && !name.is_empty() {
                name.push('_');
            }
            pending_space = false;
            name.push(lower);
        }
    }

    name
}

/// Record type with one optional text attribute per field descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordType {
    attributes: Vec<Attribute>,
}

/// One optional text slot of a [`RecordType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Sanitized attribute name.
    pub name: String,
    /// Descriptor the user typed.
    pub label: String,
}

impl RecordType {
    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when the record type has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// JSON Schema for a single record, in the strict form structured
    /// output requires: every property listed as required, nullable strings.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .attributes
            .iter()
            .map(|a| {
                (
                    a.name.clone(),
                    json!({ "type": ["string", "null"], "description": a.label }),
                )
            })
            .collect();
        let required: Vec<&str> = self.names().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check one JSON object against this record type.
    fn parse_record(&self, index: usize, value: Value) -> Result<Record> {
        let Value::Object(mut object) = value else {
            return Err(Error::ExtractionFailed(format!(
                "{LISTINGS_KEY}[{index}] is not an object"
            )));
        };

        let mut fields = IndexMap::with_capacity(self.attributes.len());
        for attribute in &self.attributes {
            let slot = match object.remove(&attribute.name) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s),
                Some(other) => {
                    return Err(Error::ExtractionFailed(format!(
                        "{LISTINGS_KEY}[{index}].{} is not text: {other}",
                        attribute.name
                    )))
                }
            };
            fields.insert(attribute.name.clone(), slot);
        }

        if !object.is_empty() {
            debug!(
                index,
                extra = ?object.keys().collect::<Vec<_>>(),
                "Ignoring undeclared attributes"
            );
        }

        Ok(Record { fields })
    }
}

/// Build a record type from an ordered list of field descriptors.
///
/// Blank descriptors are skipped. A descriptor with no usable characters
/// fails with [`Error::Validation`], and two descriptors that sanitize to
/// the same name are rejected with [`Error::FieldCollision`].
pub fn build_record_type<S: AsRef<str>>(field_names: &[S]) -> Result<RecordType> {
    let mut attributes: Vec<Attribute> = Vec::with_capacity(field_names.len());

    for field in field_names {
        let label = field.as_ref();
        if label.trim().is_empty() {
            debug!("Skipping blank field descriptor");
            continue;
        }
        let name = sanitize_field_name(label);
        if name.is_empty() {
            return Err(Error::Validation {
                message: format!("field {label:?} has no letters, digits or '_'"),
            });
        }
        if let Some(existing) = attributes.iter().find(|a| a.name == name) {
            return Err(Error::FieldCollision {
                field: label.to_string(),
                existing: existing.label.clone(),
                name,
            });
        }
        attributes.push(Attribute {
            name,
            label: label.trim().to_string(),
        });
    }

    Ok(RecordType { attributes })
}

/// Ordered sequence of records of one [`RecordType`], held under [`LISTINGS_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerType {
    record: RecordType,
}

/// Wrap a record type in a listings container.
pub fn build_container_type(record_type: RecordType) -> ContainerType {
    ContainerType {
        record: record_type,
    }
}

impl ContainerType {
    /// Attribute the records live under. Always [`LISTINGS_KEY`].
    pub fn key(&self) -> &'static str {
        LISTINGS_KEY
    }

    /// The wrapped record type.
    pub fn record_type(&self) -> &RecordType {
        &self.record
    }

    /// Strict JSON Schema describing the whole container.
    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                LISTINGS_KEY: {
                    "type": "array",
                    "items": self.record.json_schema(),
                },
            },
            "required": [LISTINGS_KEY],
            "additionalProperties": false,
        })
    }

    /// Validate a JSON value against the container and turn it into [`Listings`].
    pub fn parse(&self, value: Value) -> Result<Listings> {
        let Value::Object(mut object) = value else {
            return Err(Error::ExtractionFailed(
                "response is not a JSON object".into(),
            ));
        };

        let items = match object.remove(LISTINGS_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::ExtractionFailed(format!(
                    "`{LISTINGS_KEY}` is not an array: {other}"
                )))
            }
            None => {
                return Err(Error::ExtractionFailed(format!(
                    "response has no `{LISTINGS_KEY}` attribute"
                )))
            }
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| self.record.parse_record(i, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Listings {
            columns: self.record.names().map(str::to_string).collect(),
            records,
        })
    }

    /// Parse a JSON document (as returned by the model) into [`Listings`].
    pub fn parse_str(&self, text: &str) -> Result<Listings> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::ExtractionFailed(format!("response is not valid JSON: {e}")))?;
        self.parse(value)
    }
}

/// One extracted record: attribute name to optional text, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Option<String>>,
}

impl Record {
    /// Value of an attribute; `None` when absent or null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_deref())
    }

    /// Attribute/value pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

/// Parsed value of a [`ContainerType`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listings {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Listings {
    /// Attribute names of the record type, in declared order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Extracted records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for Listings {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(LISTINGS_KEY, &self.records)?;
        map.end()
    }
}
