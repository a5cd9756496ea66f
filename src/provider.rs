//! The front-end contract: resource types by name, identities as persisted strings.
//!
//! [Provider] is what a declarative front end talks to. It looks up the descriptor for a
//! resource type name, decodes the persisted identity string, runs the [Engine] and hands back a
//! [Response] whose `state` is again a persisted string. The front end stores `state` verbatim
//! and replaces its observed state with `observed` when that is present.

use crate::api::RemoteApi;
use crate::config::ProviderConfig;
use crate::diagnostic::{Context, Diagnostic, Operation, ReconcileError};
use crate::engine::{Engine, Outcome};
use crate::identity::StateId;
use crate::resources::{self, DATA_SOURCES, RESOURCES};
use crate::schema::{DesiredState, ObservedState, ResourceDescriptor};
use crate::transport;
use serde::Serialize;
use std::sync::Arc;

/// What the front end gets back from every entry point.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Response {
    /// The persisted identity string. Empty when the resource is absent.
    pub state: String,

    /// The new observed state, or `None` if the previous one stands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedState>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    // A failure before the engine ran. The persisted string is handed back untouched.
    fn rejected(persisted: &str, error: ReconcileError) -> Self {
        Response {
            state: persisted.to_owned(),
            observed: None,
            diagnostics: vec![error.to_diagnostic()],
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        Response {
            state: outcome.persisted(),
            observed: outcome.observed,
            diagnostics: outcome.diagnostics,
        }
    }
}

/// The provider's schema: every resource type and data source with its fields.
#[derive(Clone, Debug, Serialize)]
pub struct Schema {
    pub resources: Vec<&'static ResourceDescriptor>,
    pub data_sources: Vec<&'static ResourceDescriptor>,
}

pub fn schema() -> Schema {
    Schema {
        resources: RESOURCES.to_vec(),
        data_sources: DATA_SOURCES.to_vec(),
    }
}

#[derive(Clone)]
pub struct Provider {
    engine: Engine,
}

impl Provider {
    /// Connects to AWX and checks that the credentials work.
    ///
    /// # Errors
    ///
    /// Returns [ReconcileError::ConfigurationError] if the transport cannot be built or
    /// authentication fails.
    pub async fn configure(config: &ProviderConfig) -> Result<Self, ReconcileError> {
        let client = transport::connect(config).await?;
        Ok(Provider::with_api(Arc::new(client)))
    }

    /// Wraps an already-configured API client.
    pub fn with_api(api: Arc<dyn RemoteApi>) -> Self {
        Provider {
            engine: Engine::new(api),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn create(&self, type_name: &str, desired: &DesiredState) -> Response {
        match resource(Operation::Create, type_name) {
            Ok(descriptor) => self.engine.create(descriptor, desired).await.into(),
            Err(e) => Response::rejected("", e),
        }
    }

    pub async fn read(&self, type_name: &str, persisted: &str) -> Response {
        match decode(Operation::Read, type_name, persisted) {
            Ok((descriptor, state)) => self.engine.read(descriptor, state).await.into(),
            Err(e) => Response::rejected(persisted, e),
        }
    }

    pub async fn update(
        &self,
        type_name: &str,
        persisted: &str,
        desired: &DesiredState,
    ) -> Response {
        match decode(Operation::Update, type_name, persisted) {
            Ok((descriptor, state)) => self.engine.update(descriptor, state, desired).await.into(),
            Err(e) => Response::rejected(persisted, e),
        }
    }

    pub async fn delete(&self, type_name: &str, persisted: &str) -> Response {
        match decode(Operation::Delete, type_name, persisted) {
            Ok((descriptor, state)) => self.engine.delete(descriptor, state).await.into(),
            Err(e) => Response::rejected(persisted, e),
        }
    }

    /// Adopts an existing object. `raw` is what the user typed, e.g. `42` or `5/7`.
    pub async fn import(&self, type_name: &str, raw: &str) -> Response {
        match resource(Operation::Import, type_name) {
            Ok(descriptor) => self.engine.import(descriptor, raw).await.into(),
            Err(e) => Response::rejected("", e),
        }
    }

    pub async fn read_data_source(&self, type_name: &str, desired: &DesiredState) -> Response {
        match resources::data_source(type_name) {
            Some(descriptor) => self.engine.lookup(descriptor, desired).await.into(),
            None => Response::rejected("", unknown(Operation::Lookup, type_name, "data source")),
        }
    }
}

fn resource(
    operation: Operation,
    type_name: &str,
) -> Result<&'static ResourceDescriptor, ReconcileError> {
    resources::resource(type_name).ok_or_else(|| unknown(operation, type_name, "resource type"))
}

fn decode(
    operation: Operation,
    type_name: &str,
    persisted: &str,
) -> Result<(&'static ResourceDescriptor, StateId), ReconcileError> {
    let descriptor = resource(operation, type_name)?;
    let state = StateId::from_persisted(persisted, descriptor.scheme()).map_err(|source| {
        ReconcileError::MalformedIdentity {
            context: Context::new(operation, type_name, persisted),
            source,
        }
    })?;
    Ok((descriptor, state))
}

fn unknown(operation: Operation, type_name: &str, what: &str) -> ReconcileError {
    ReconcileError::InvalidDesiredState {
        context: Context::new(operation, type_name, ""),
        reason: format!("unknown {what} {type_name:?}"),
        source: None,
    }
}
