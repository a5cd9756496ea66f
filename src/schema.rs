//! Types that describe resource kinds to the reconciliation engine.
//!
//! A [ResourceDescriptor] is static data: the engine has a single code path for every resource
//! kind, and descriptors supply everything that varies between kinds, i.e. the remote endpoint,
//! the field schema, and whether the kind is a plain object or an association.
//!
//! Descriptors are declared as `static` values in [crate::resources] with the `const`
//! constructors on [Field].

use crate::identity::IdentityScheme;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// A set of attributes keyed by schema field name, in schema order.
pub type Attributes = IndexMap<String, Value>;

/// The configuration the front end wants for one resource instance.
pub type DesiredState = Attributes;

/// The last confirmed remote representation of one resource instance.
pub type ObservedState = Attributes;

/// A remote object exactly as the API returned it, keyed by remote field name.
pub type Instance = Map<String, Value>;

/// The value that replaces sensitive fields in log output.
pub const REDACTED: &str = "<redacted>";

/// The type of a field's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Bool,

    /// A reference to another object's numeric ID, carried as a string in desired state.
    ///
    /// Sent to the API as an integer, or `null` when empty. Read back as the decimal string, or
    /// `""` when the API reports `null`.
    IdString,
}

/// Whether the front end must, may, or cannot set a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,

    /// Set only by the remote API. Never sent.
    Computed,

    /// Always sent as the declared default. The front end may leave it unset or repeat the
    /// default, nothing else.
    Fixed,
}

/// A field's declared default, in a form that can live in a `static`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DefaultValue {
    Null,
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Str(s) => Value::from(s),
            DefaultValue::Int(i) => Value::from(i),
            DefaultValue::Bool(b) => Value::from(b),
        }
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// One field in a resource kind's schema.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Field {
    /// The field's name in desired and observed state.
    pub name: &'static str,

    /// The field's name in the remote API's representation. Usually the same as [Self::name].
    pub remote: &'static str,

    /// The remote object the field is nested in, e.g. a credential's `inputs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<&'static str>,

    #[serde(rename = "type")]
    pub kind: FieldType,

    pub presence: Presence,

    /// The value sent to the API when the front end leaves an optional field unset.
    pub default: DefaultValue,

    /// Sensitive values never appear in logs or diagnostics.
    pub sensitive: bool,

    /// Changing this field requires the resource to be deleted and recreated.
    pub force_new: bool,
}

impl Field {
    const fn new(name: &'static str, kind: FieldType, presence: Presence) -> Self {
        Field {
            name,
            remote: name,
            parent: None,
            kind,
            presence,
            default: DefaultValue::Null,
            sensitive: false,
            force_new: false,
        }
    }

    pub const fn required(name: &'static str, kind: FieldType) -> Self {
        Field::new(name, kind, Presence::Required)
    }

    pub const fn optional(name: &'static str, kind: FieldType, default: DefaultValue) -> Self {
        let mut field = Field::new(name, kind, Presence::Optional);
        field.default = default;
        field
    }

    pub const fn computed(name: &'static str, kind: FieldType) -> Self {
        Field::new(name, kind, Presence::Computed)
    }

    pub const fn fixed(name: &'static str, kind: FieldType, value: DefaultValue) -> Self {
        let mut field = Field::new(name, kind, Presence::Fixed);
        field.default = value;
        field
    }

    /// Sets the remote field name.
    pub const fn remote(mut self, remote: &'static str) -> Self {
        self.remote = remote;
        self
    }

    /// Nests the field inside the remote object `parent`.
    pub const fn within(mut self, parent: &'static str) -> Self {
        self.parent = Some(parent);
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Converts a desired-state value to the value sent to the API.
    ///
    /// `value` must already be non-null; defaults are applied by [ResourceDescriptor::payload].
    pub fn to_remote(&self, value: &Value) -> Result<Value, FieldError> {
        match (self.kind, value) {
            (FieldType::String, Value::String(_))
            | (FieldType::Bool, Value::Bool(_)) => Ok(value.clone()),
            (FieldType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            (FieldType::IdString, Value::Number(n)) => n
                .as_u64()
                .map(Value::from)
                .ok_or_else(|| FieldError::new(self.name, format!("{n} is not a numeric ID"))),
            (FieldType::IdString, Value::String(s)) if s.is_empty() => Ok(Value::Null),
            (FieldType::IdString, Value::String(s)) => s
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| FieldError::new(self.name, format!("{s:?} is not a numeric ID"))),
            (kind, value) => Err(FieldError::new(
                self.name,
                format!("expected {kind:?} but got {}", type_name(value)),
            )),
        }
    }

    /// Converts a remote value back to the observed-state value for this field.
    ///
    /// A missing or `null` remote value maps to the field's declared default.
    pub fn from_remote(&self, value: Option<&Value>) -> Value {
        match (self.kind, value) {
            (FieldType::IdString, Some(Value::Number(n))) => Value::from(n.to_string()),
            (FieldType::IdString, None | Some(Value::Null)) => Value::from(""),
            (_, None | Some(Value::Null)) => self.default.to_value(),
            (_, Some(value)) => value.clone(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A desired-state value that does not fit the field schema.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("field {field:?}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// How an association resource maps onto the remote API.
///
/// The remote API models an association as a related list on the owner, e.g.
/// `job_templates/<owner>/credentials/`, that members are attached to and detached from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Association {
    /// Schema field holding the owner's ID.
    pub owner_field: &'static str,

    /// Collection endpoint of the owner kind.
    pub owner_endpoint: &'static str,

    /// Schema field holding the member's ID.
    pub member_field: &'static str,

    /// Collection endpoint of the member kind.
    pub member_endpoint: &'static str,

    /// Name of the owner's related list.
    pub relation: &'static str,

    /// Field on the owner's own record that references a member, if the API has one.
    ///
    /// Import populates the member field from it.
    pub owner_reference: Option<&'static str>,
}

/// Whether a resource kind is a standalone object or an association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "shape")]
pub enum Shape {
    Object,
    Association(Association),
}

/// Static description of one resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResourceDescriptor {
    /// The name the front end uses for this kind, e.g. `awx_job_template`.
    pub name: &'static str,

    /// Remote collection endpoint, e.g. `job_templates`. For associations, the owner's endpoint.
    pub endpoint: &'static str,

    #[serde(flatten)]
    pub shape: Shape,

    pub fields: &'static [Field],
}

impl ResourceDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn scheme(&self) -> IdentityScheme {
        match self.shape {
            Shape::Object => IdentityScheme::Simple,
            Shape::Association(_) => IdentityScheme::Composite,
        }
    }

    pub fn association(&self) -> Option<&Association> {
        match &self.shape {
            Shape::Object => None,
            Shape::Association(association) => Some(association),
        }
    }

    /// Builds the full remote payload for a desired state.
    ///
    /// Every non-computed field is sent. Unset or `null` optional fields take their declared
    /// default, so the API always receives the same values for the same desired state. Values
    /// for computed fields are ignored. Fixed fields always carry their declared value.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, a value has the wrong type, or the
    /// desired state names a field that is not in the schema.
    pub fn payload(&self, desired: &DesiredState) -> Result<Instance, FieldError> {
        if let Some(unknown) = desired.keys().find(|name| self.field(name).is_none()) {
            return Err(FieldError::new(
                unknown.as_str(),
                format!("not a field of {}", self.name),
            ));
        }

        let mut payload = Instance::new();
        for field in self.fields {
            let value = match (field.presence, desired.get(field.name)) {
                (Presence::Computed, _) => continue,
                (Presence::Fixed, Some(value)) if !value.is_null() => {
                    let fixed = field.to_remote_default();
                    if field.to_remote(value)? != fixed {
                        return Err(FieldError::new(field.name, format!("must be {fixed}")));
                    }
                    fixed
                }
                (_, Some(value)) if !value.is_null() => field.to_remote(value)?,
                (Presence::Required, _) => {
                    return Err(FieldError::new(field.name, "required field is not set"))
                }
                (Presence::Optional | Presence::Fixed, _) => field.to_remote_default(),
            };
            match field.parent {
                None => {
                    payload.insert(field.remote.to_owned(), value);
                }
                Some(parent) => {
                    let nested = payload
                        .entry(parent)
                        .or_insert_with(|| Value::Object(Instance::new()));
                    if let Value::Object(nested) = nested {
                        nested.insert(field.remote.to_owned(), value);
                    }
                }
            }
        }
        Ok(payload)
    }

    /// Maps a remote instance onto this kind's schema, producing a complete observed state.
    pub fn observe(&self, instance: &Instance) -> ObservedState {
        self.fields
            .iter()
            .map(|field| {
                (
                    field.name.to_owned(),
                    field.from_remote(remote_value(instance, field)),
                )
            })
            .collect()
    }

    /// Returns a copy of `payload` that is safe to log.
    pub fn redacted(&self, payload: &Instance) -> Instance {
        let mut redacted = payload.clone();
        for field in self.fields.iter().filter(|field| field.sensitive) {
            let value = match field.parent {
                None => redacted.get_mut(field.remote),
                Some(parent) => redacted
                    .get_mut(parent)
                    .and_then(Value::as_object_mut)
                    .and_then(|nested| nested.get_mut(field.remote)),
            };
            if let Some(value) = value {
                *value = Value::from(REDACTED);
            }
        }
        redacted
    }
}

fn remote_value<'a>(instance: &'a Instance, field: &Field) -> Option<&'a Value> {
    match field.parent {
        None => instance.get(field.remote),
        Some(parent) => instance
            .get(parent)
            .and_then(Value::as_object)
            .and_then(|nested| nested.get(field.remote)),
    }
}

impl Field {
    fn to_remote_default(&self) -> Value {
        match (self.kind, self.default) {
            (FieldType::IdString, DefaultValue::Str("")) => Value::Null,
            (_, default) => default.to_value(),
        }
    }
}

#[cfg(test)]
mod test;
