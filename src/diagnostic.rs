//! Classification of reconciliation failures into diagnostics for the front end.
//!
//! Every failure the engine can produce is a [ReconcileError]. Each variant maps onto exactly one
//! [ErrorKind], and [ReconcileError::to_diagnostic] turns it into the [Diagnostic] the front end
//! displays. Details name the operation, the resource kind and the identifying key; they never
//! contain passwords or private key material.

use crate::api::ApiError;
use crate::identity::MalformedIdentity;
use crate::schema::FieldError;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// The failure taxonomy shared by every resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A lookup named neither an ID nor a name.
    MissingSelector,

    /// The target object does not exist remotely.
    NotFound,

    /// A persisted or imported identity string could not be decoded.
    MalformedIdentity,

    /// A remote call failed for any reason other than not-found.
    RemoteCallFailure,

    /// The remote API refused to attach a member to an owner.
    AssociationConflict,

    /// Provider configuration is unusable, e.g. bad certificate material or failed authentication.
    ConfigurationError,

    /// The desired state does not fit the resource kind's schema, or asks for an operation the
    /// kind does not support.
    InvalidDesiredState,
}

/// A message for the front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Absent for warnings that are not failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,

    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind: None,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}: {}: {}", self.summary, self.detail)
    }
}

/// The engine operation that was running when a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Lookup,
    Configure,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::Lookup => "lookup",
            Operation::Configure => "configure",
        };
        f.write_str(name)
    }
}

/// Where a failure happened: the operation, the resource kind, and the identifying key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    pub operation: Operation,
    pub resource: String,

    /// A name, ID, or persisted identity string. Empty when there is none yet.
    pub key: String,
}

impl Context {
    pub fn new(operation: Operation, resource: impl Into<String>, key: impl Into<String>) -> Self {
        Context {
            operation,
            resource: resource.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key.is_empty() {
            true => write!(f, "{} {}", self.operation, self.resource),
            false => write!(f, "{} {} {:?}", self.operation, self.resource, self.key),
        }
    }
}

/// A classified reconciliation failure.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{context}: either an ID or a name is required")]
    MissingSelector { context: Context },

    /// `target` names what was missing, e.g. `job_templates/5` or `name "beta"`.
    #[error("{context}: {target} does not exist")]
    NotFound {
        context: Context,
        target: String,
        #[source]
        source: Option<ApiError>,
    },

    #[error("{context}: {source}")]
    MalformedIdentity {
        context: Context,
        #[source]
        source: MalformedIdentity,
    },

    #[error("{context}: {source}")]
    RemoteCallFailure {
        context: Context,
        #[source]
        source: ApiError,
    },

    #[error("{context}: could not attach member {member}: {source}")]
    AssociationConflict {
        context: Context,
        member: String,
        #[source]
        source: ApiError,
    },

    #[error("{context}: {summary}: {detail}")]
    ConfigurationError {
        context: Context,
        summary: String,
        detail: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("{context}: {reason}")]
    InvalidDesiredState {
        context: Context,
        reason: String,
        #[source]
        source: Option<FieldError>,
    },
}

impl ReconcileError {
    /// Classifies a failed remote call: not-found stays not-found, everything else is a remote
    /// call failure.
    pub fn from_api(context: Context, target: impl Into<String>, source: ApiError) -> Self {
        match source.is_not_found() {
            true => ReconcileError::NotFound {
                context,
                target: target.into(),
                source: Some(source),
            },
            false => ReconcileError::RemoteCallFailure { context, source },
        }
    }

    pub fn invalid(context: Context, source: FieldError) -> Self {
        ReconcileError::InvalidDesiredState {
            context,
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::MissingSelector { .. } => ErrorKind::MissingSelector,
            ReconcileError::NotFound { .. } => ErrorKind::NotFound,
            ReconcileError::MalformedIdentity { .. } => ErrorKind::MalformedIdentity,
            ReconcileError::RemoteCallFailure { .. } => ErrorKind::RemoteCallFailure,
            ReconcileError::AssociationConflict { .. } => ErrorKind::AssociationConflict,
            ReconcileError::ConfigurationError { .. } => ErrorKind::ConfigurationError,
            ReconcileError::InvalidDesiredState { .. } => ErrorKind::InvalidDesiredState,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            ReconcileError::MissingSelector { context }
            | ReconcileError::NotFound { context, .. }
            | ReconcileError::MalformedIdentity { context, .. }
            | ReconcileError::RemoteCallFailure { context, .. }
            | ReconcileError::AssociationConflict { context, .. }
            | ReconcileError::ConfigurationError { context, .. }
            | ReconcileError::InvalidDesiredState { context, .. } => context,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// A short, human-readable headline for the failure.
    pub fn summary(&self) -> String {
        let resource = &self.context().resource;
        match self {
            ReconcileError::MissingSelector { .. } => {
                format!("Missing ID or name for {resource}")
            }
            ReconcileError::NotFound { .. } => format!("{resource} not found"),
            ReconcileError::MalformedIdentity { .. } => format!("Malformed {resource} ID"),
            ReconcileError::RemoteCallFailure { context, .. } => {
                format!("Unable to {} {resource}", context.operation)
            }
            ReconcileError::AssociationConflict { .. } => {
                format!("Unable to associate {resource}")
            }
            ReconcileError::ConfigurationError { summary, .. } => summary.clone(),
            ReconcileError::InvalidDesiredState { .. } => format!("Invalid {resource}"),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let detail = match self {
            ReconcileError::ConfigurationError {
                context, detail, ..
            } => format!("{context}: {detail}"),
            other => other.to_string(),
        };
        Diagnostic {
            severity: Severity::Error,
            kind: Some(self.kind()),
            summary: self.summary(),
            detail,
        }
    }
}

impl From<ReconcileError> for Diagnostic {
    fn from(error: ReconcileError) -> Self {
        error.to_diagnostic()
    }
}
