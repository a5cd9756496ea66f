//! Resolution of a remote object from an explicit ID or a name.
//!
//! An explicit ID is authoritative: the object is fetched directly and the collection is never
//! listed. Otherwise the whole collection is listed once and scanned for an exact,
//! case-sensitive name match. When several objects share the name, the first one in listing
//! order wins and the number of other matches is reported alongside it.

use crate::api::{instance_id, RemoteApi};
use crate::diagnostic::{Context, Operation, ReconcileError};
use crate::identity::{decode_simple, RemoteId};
use crate::schema::{DesiredState, FieldError, Instance, ResourceDescriptor};
use serde_json::Value;
use tracing::{debug, warn};

/// What to look an object up by.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    pub id: Option<RemoteId>,
    pub name: Option<String>,
}

impl Selector {
    pub fn by_id(id: RemoteId) -> Self {
        Selector {
            id: Some(id),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Selector {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Reads the `id` and `name` fields of a data source's desired state.
    ///
    /// `id` may be an integer or a decimal string. `null` and the empty string count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is neither a non-negative integer nor a decimal string, or if
    /// `name` is not a string.
    pub fn from_desired(desired: &DesiredState) -> Result<Self, FieldError> {
        let id = match desired.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(
                decode_simple(s).map_err(|e| FieldError::new("id", e.reason.to_string()))?,
            ),
            Some(Value::Number(n)) => Some(
                n.as_u64()
                    .ok_or_else(|| FieldError::new("id", format!("{n} is not a valid ID")))?,
            ),
            Some(_) => return Err(FieldError::new("id", "expected an integer")),
        };

        let name = match desired.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(FieldError::new("name", "expected a string")),
        };

        Ok(Selector { id, name })
    }

    /// Reads a command-line argument: a decimal ID if it is one, a name otherwise.
    pub fn parse(arg: &str) -> Self {
        match decode_simple(arg) {
            Ok(id) => Selector::by_id(id),
            Err(_) => Selector::by_name(arg),
        }
    }

    /// The selector as a data source's desired state.
    pub fn to_desired(&self) -> DesiredState {
        let mut desired = DesiredState::new();
        if let Some(id) = self.id {
            desired.insert("id".to_owned(), Value::from(id));
        }
        if let Some(name) = &self.name {
            desired.insert("name".to_owned(), Value::from(name.as_str()));
        }
        desired
    }

    /// The key that diagnostics identify the lookup by.
    pub fn key(&self) -> String {
        match (self.id, &self.name) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }
}

/// The result of a successful lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub instance: Instance,

    /// How many other objects in the collection have the same name. Always zero for ID lookups.
    pub duplicates: usize,
}

/// Finds the first instance named exactly `name`, and counts the other instances with that name.
pub fn find_by_name<'a>(instances: &'a [Instance], name: &str) -> Option<(&'a Instance, usize)> {
    let mut matches = instances
        .iter()
        .filter(|instance| instance.get("name").and_then(Value::as_str) == Some(name));
    let first = matches.next()?;
    Some((first, matches.count()))
}

/// Resolves `selector` against the descriptor's collection.
///
/// # Errors
///
/// Returns [ReconcileError::MissingSelector] if the selector is empty, [ReconcileError::NotFound]
/// if nothing matches, or [ReconcileError::RemoteCallFailure] if a remote call fails.
pub async fn resolve(
    api: &dyn RemoteApi,
    descriptor: &ResourceDescriptor,
    selector: &Selector,
    operation: Operation,
) -> Result<Resolved, ReconcileError> {
    let context = Context::new(operation, descriptor.name, selector.key());

    if let Some(id) = selector.id {
        debug!(resource = descriptor.name, id, "resolving by ID");
        let target = format!("{}/{id}", descriptor.endpoint);
        let instance = api
            .get(descriptor.endpoint, id)
            .await
            .map_err(|e| ReconcileError::from_api(context, target, e))?;
        return Ok(Resolved {
            instance,
            duplicates: 0,
        });
    }

    let Some(name) = &selector.name else {
        return Err(ReconcileError::MissingSelector { context });
    };

    debug!(resource = descriptor.name, name = name.as_str(), "resolving by name");
    let instances = api
        .list(descriptor.endpoint, &[])
        .await
        .map_err(|e| ReconcileError::from_api(context.clone(), descriptor.endpoint, e))?;

    let Some((instance, duplicates)) = find_by_name(&instances, name) else {
        return Err(ReconcileError::NotFound {
            context,
            target: format!("an object named {name:?}"),
            source: None,
        });
    };

    if duplicates > 0 {
        warn!(
            resource = descriptor.name,
            name = name.as_str(),
            id = ?instance_id(instance),
            duplicates,
            "name is not unique; using the first match"
        );
    }

    Ok(Resolved {
        instance: instance.clone(),
        duplicates,
    })
}
