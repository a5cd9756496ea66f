//! The reconciliation engine.
//!
//! One [Engine] serves every resource kind. Each operation takes the kind's [ResourceDescriptor]
//! and moves one resource instance between [StateId::Absent] and [StateId::Present]:
//!
//! | Operation | From      | To        | Remote calls                                    |
//! |-----------|-----------|-----------|-------------------------------------------------|
//! | Create    | `Absent`  | `Present` | create, then get                                |
//! | Read      | `Present` | `Present` | get                                             |
//! | Update    | `Present` | `Present` | get (precondition), update, then get            |
//! | Delete    | `Present` | `Absent`  | get (precondition), delete                      |
//! | Import    | raw ID    | `Present` | get                                             |
//! | Lookup    | selector  | `Present` | get by ID, or one list scanned by name          |
//!
//! Association kinds use the same entry points; see [association] for how their calls differ.
//!
//! Every operation returns an [Outcome] rather than a [Result], because failures are not
//! all-or-nothing: a create whose follow-up read fails has still created something, and the
//! caller must track it.

use crate::api::{instance_id, RemoteApi};
use crate::diagnostic::{Context, Diagnostic, Operation, ReconcileError};
use crate::identity::{Identity, MalformedIdentity, RemoteId, StateId};
use crate::lookup::{self, Selector};
use crate::schema::{DesiredState, ObservedState, ResourceDescriptor, Shape};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

pub mod association;

/// The result of one engine operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Outcome {
    /// The identity the caller should persist. Serializes as the persisted identity string.
    pub state: StateId,

    /// The new observed state. `None` means the caller's previous observed state stands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedState>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn present(identity: Identity, observed: ObservedState) -> Self {
        Outcome {
            state: StateId::Present(identity),
            observed: Some(observed),
            diagnostics: Vec::new(),
        }
    }

    pub fn absent() -> Self {
        Outcome::default()
    }

    /// A failed operation. `state` is what the caller should keep persisting.
    pub fn failed(state: StateId, error: ReconcileError) -> Self {
        debug!(%error, "operation failed");
        Outcome {
            state,
            observed: None,
            diagnostics: vec![error.to_diagnostic()],
        }
    }

    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        self.diagnostics.push(warning);
        self
    }

    /// Returns `true` unless a diagnostic is an error. Warnings do not count.
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Returns the first error diagnostic, if any.
    pub fn error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    /// The identity string the front end persists. Empty when absent.
    pub fn persisted(&self) -> String {
        self.state.to_persisted()
    }
}

impl From<Result<Outcome, ReconcileError>> for Outcome {
    fn from(result: Result<Outcome, ReconcileError>) -> Self {
        result.unwrap_or_else(|error| Outcome::failed(StateId::Absent, error))
    }
}

/// Reconciles desired state against the remote API.
///
/// Holds nothing but a shared handle to the API client, so one engine may serve any number of
/// concurrent operations on different identities.
#[derive(Clone)]
pub struct Engine {
    api: Arc<dyn RemoteApi>,
}

impl Engine {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Engine { api }
    }

    pub fn api(&self) -> &dyn RemoteApi {
        self.api.as_ref()
    }

    /// Creates the remote object described by `desired`, then reads it back.
    ///
    /// If the create succeeds but the read does not, the returned [Outcome] still carries the new
    /// identity alongside the error, so that the caller tracks the object it now owns.
    #[instrument(skip_all, fields(resource = descriptor.name))]
    pub async fn create(&self, descriptor: &ResourceDescriptor, desired: &DesiredState) -> Outcome {
        match &descriptor.shape {
            Shape::Object => self.create_object(descriptor, desired).await,
            Shape::Association(association) => {
                association::create(self, descriptor, association, desired).await
            }
        }
    }

    async fn create_object(
        &self,
        descriptor: &ResourceDescriptor,
        desired: &DesiredState,
    ) -> Outcome {
        let context = Context::new(Operation::Create, descriptor.name, name_of(desired));

        let payload = match descriptor.payload(desired) {
            Ok(payload) => payload,
            Err(e) => {
                return Outcome::failed(StateId::Absent, ReconcileError::invalid(context, e))
            }
        };
        trace!(payload = ?descriptor.redacted(&payload), "creating");

        let created = match self.api.create(descriptor.endpoint, &payload).await {
            Ok(created) => created,
            Err(e) => {
                let error = ReconcileError::from_api(context, descriptor.endpoint, e);
                return Outcome::failed(StateId::Absent, error);
            }
        };
        let Some(id) = instance_id(&created) else {
            let error = ReconcileError::RemoteCallFailure {
                context,
                source: crate::api::ApiError::Decode {
                    url: descriptor.endpoint.to_owned(),
                    message: "created object has no ID".to_owned(),
                },
            };
            return Outcome::failed(StateId::Absent, error);
        };
        debug!(id, "created");

        let state = StateId::Present(Identity::Simple(id));
        let context = Context::new(Operation::Create, descriptor.name, id.to_string());
        match self.fetch(descriptor, id, context).await {
            Ok(observed) => Outcome::present(Identity::Simple(id), observed),
            Err(error) => Outcome::failed(state, error),
        }
    }

    /// Refreshes observed state from the remote API.
    ///
    /// A remote not-found is reported as [ReconcileError::NotFound] and the identity is kept;
    /// whether to drop the resource from state is the caller's decision.
    #[instrument(skip_all, fields(resource = descriptor.name, id = %state.to_persisted()))]
    pub async fn read(&self, descriptor: &ResourceDescriptor, state: StateId) -> Outcome {
        let Some(identity) = state.identity() else {
            return Outcome::absent();
        };
        let context = Context::new(Operation::Read, descriptor.name, identity.to_string());

        let result = match &descriptor.shape {
            Shape::Object => match expect_simple(identity, &context) {
                Ok(id) => self
                    .fetch(descriptor, id, context)
                    .await
                    .map(|observed| Outcome::present(identity, observed)),
                Err(e) => Err(e),
            },
            Shape::Association(association) => {
                association::read(self, descriptor, association, identity, context).await
            }
        };
        result.unwrap_or_else(|error| Outcome::failed(state, error))
    }

    /// Sends the full canonicalized desired state to an existing object, then reads it back.
    ///
    /// A failed update leaves observed state untouched. Associations cannot be updated; every
    /// field of an association forces replacement.
    #[instrument(skip_all, fields(resource = descriptor.name, id = %state.to_persisted()))]
    pub async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        state: StateId,
        desired: &DesiredState,
    ) -> Outcome {
        self.try_update(descriptor, state, desired)
            .await
            .unwrap_or_else(|error| Outcome::failed(state, error))
    }

    async fn try_update(
        &self,
        descriptor: &ResourceDescriptor,
        state: StateId,
        desired: &DesiredState,
    ) -> Result<Outcome, ReconcileError> {
        let context = Context::new(Operation::Update, descriptor.name, state.to_persisted());

        if descriptor.association().is_some() {
            return Err(ReconcileError::InvalidDesiredState {
                context,
                reason: "associations cannot be updated in place; replace the resource instead"
                    .to_owned(),
                source: None,
            });
        }
        let Some(identity) = state.identity() else {
            return Err(ReconcileError::InvalidDesiredState {
                context,
                reason: "resource has no identity to update".to_owned(),
                source: None,
            });
        };
        let id = expect_simple(identity, &context)?;
        let payload = descriptor
            .payload(desired)
            .map_err(|e| ReconcileError::invalid(context.clone(), e))?;

        // Fail fast if the object has gone away.
        self.fetch(descriptor, id, context.clone()).await?;

        trace!(payload = ?descriptor.redacted(&payload), "updating");
        let target = format!("{}/{id}", descriptor.endpoint);
        self.api
            .update(descriptor.endpoint, id, &payload)
            .await
            .map_err(|e| ReconcileError::from_api(context.clone(), target, e))?;

        let observed = self.fetch(descriptor, id, context).await?;
        Ok(Outcome::present(identity, observed))
    }

    /// Deletes the remote object and clears the identity.
    ///
    /// Not-found at either the precondition read or the delete itself counts as success. Any
    /// other failure is reported and the identity is kept.
    #[instrument(skip_all, fields(resource = descriptor.name, id = %state.to_persisted()))]
    pub async fn delete(&self, descriptor: &ResourceDescriptor, state: StateId) -> Outcome {
        let Some(identity) = state.identity() else {
            return Outcome::absent();
        };
        let context = Context::new(Operation::Delete, descriptor.name, identity.to_string());

        let result = match &descriptor.shape {
            Shape::Object => self.delete_object(descriptor, identity, context).await,
            Shape::Association(association) => {
                association::delete(self, association, identity, context).await
            }
        };
        match result {
            Ok(()) => Outcome::absent(),
            Err(error) => Outcome::failed(state, error),
        }
    }

    async fn delete_object(
        &self,
        descriptor: &ResourceDescriptor,
        identity: Identity,
        context: Context,
    ) -> Result<(), ReconcileError> {
        let id = expect_simple(identity, &context)?;
        match self.fetch(descriptor, id, context.clone()).await {
            Err(e) if e.is_not_found() => {
                debug!(id, "already gone");
                return Ok(());
            }
            Err(e) => return Err(e),
            Ok(_) => {}
        }

        let target = format!("{}/{id}", descriptor.endpoint);
        match self.api.delete(descriptor.endpoint, id).await {
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ReconcileError::from_api(context, target, e)),
            Ok(()) => Ok(()),
        }
    }

    /// Adopts an existing remote object by its raw identity string.
    #[instrument(skip_all, fields(resource = descriptor.name, raw = %raw))]
    pub async fn import(&self, descriptor: &ResourceDescriptor, raw: &str) -> Outcome {
        let context = Context::new(Operation::Import, descriptor.name, raw);
        let identity = match descriptor.scheme().decode(raw) {
            Ok(identity) => identity,
            Err(source) => {
                let error = ReconcileError::MalformedIdentity { context, source };
                return Outcome::failed(StateId::Absent, error);
            }
        };

        let result = match (&descriptor.shape, identity) {
            (Shape::Object, Identity::Simple(id)) => self
                .fetch(descriptor, id, context)
                .await
                .map(|observed| Outcome::present(identity, observed)),
            (Shape::Association(association), Identity::Composite { owner, member }) => {
                association::import(self, descriptor, association, owner, member, context).await
            }
            (_, identity) => Err(mismatched(identity, context)),
        };
        result.into()
    }

    /// Reads a data source: resolves the selector in `desired` and maps the object found.
    ///
    /// Duplicate names resolve to the first match and add a warning to the [Outcome].
    #[instrument(skip_all, fields(resource = descriptor.name))]
    pub async fn lookup(&self, descriptor: &ResourceDescriptor, desired: &DesiredState) -> Outcome {
        self.try_lookup(descriptor, desired).await.into()
    }

    async fn try_lookup(
        &self,
        descriptor: &ResourceDescriptor,
        desired: &DesiredState,
    ) -> Result<Outcome, ReconcileError> {
        let selector = Selector::from_desired(desired).map_err(|e| {
            ReconcileError::invalid(Context::new(Operation::Lookup, descriptor.name, ""), e)
        })?;
        let resolved =
            lookup::resolve(self.api.as_ref(), descriptor, &selector, Operation::Lookup).await?;

        let Some(id) = instance_id(&resolved.instance) else {
            return Err(ReconcileError::RemoteCallFailure {
                context: Context::new(Operation::Lookup, descriptor.name, selector.key()),
                source: crate::api::ApiError::Decode {
                    url: descriptor.endpoint.to_owned(),
                    message: "object has no ID".to_owned(),
                },
            });
        };

        let observed = descriptor.observe(&resolved.instance);
        let outcome = Outcome::present(Identity::Simple(id), observed);
        Ok(match resolved.duplicates {
            0 => outcome,
            n => outcome.with_warning(Diagnostic::warning(
                format!("Duplicate {} name", descriptor.name),
                format!(
                    "{n} other object(s) are named {:?}; using the first match, ID {id}",
                    selector.key()
                ),
            )),
        })
    }

    /// Fetches one object and maps it onto the descriptor's schema.
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        id: RemoteId,
        context: Context,
    ) -> Result<ObservedState, ReconcileError> {
        let target = format!("{}/{id}", descriptor.endpoint);
        let instance = self
            .api
            .get(descriptor.endpoint, id)
            .await
            .map_err(|e| ReconcileError::from_api(context, target, e))?;
        Ok(descriptor.observe(&instance))
    }
}

fn name_of(desired: &DesiredState) -> String {
    desired
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn expect_simple(identity: Identity, context: &Context) -> Result<RemoteId, ReconcileError> {
    match identity {
        Identity::Simple(id) => Ok(id),
        other => Err(mismatched(other, context.clone())),
    }
}

fn expect_composite(
    identity: Identity,
    context: &Context,
) -> Result<(RemoteId, RemoteId), ReconcileError> {
    match identity {
        Identity::Composite { owner, member } => Ok((owner, member)),
        other => Err(mismatched(other, context.clone())),
    }
}

fn mismatched(identity: Identity, context: Context) -> ReconcileError {
    let reason = match identity {
        Identity::Simple(_) => "expected <owner_id>/<member_id>",
        Identity::Composite { .. } => "expected a single numeric ID",
    };
    warn!(%identity, "identity does not match the resource kind");
    ReconcileError::MalformedIdentity {
        context,
        source: MalformedIdentity::new(&identity.to_string(), reason),
    }
}
