//! Declarative management of AWX (Ansible Tower) objects.
//!
//! The crate reconciles a desired-state description of AWX objects (job templates, inventories,
//! projects, credentials attached to job templates, and so on) against what the AWX REST API
//! actually holds.
//!
//! # Program flow
//!
//! 1. A front end loads a [ProviderConfig] and calls [Provider::configure], which builds one
//!    shared HTTP client (see [transport]) and checks that it can authenticate.
//!
//! 2. For each resource instance, the front end calls one of the [Provider]'s entry points with
//!    the resource type name, the persisted identity string, and the desired state.
//!
//! 3. The provider looks up the type's static [schema::ResourceDescriptor] in [resources] and
//!    decodes the identity (see [identity]).
//!
//! 4. The [engine::Engine] runs the operation against the [api::RemoteApi]. The same code path
//!    serves every resource kind; descriptors supply what varies.
//!
//! 5. The result comes back as a [provider::Response]: the identity string to persist, the new
//!    observed state if there is one, and any [diagnostic::Diagnostic]s.

pub mod api;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod identity;
pub mod logging;
pub mod lookup;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod transport;

#[doc(inline)]
pub use config::ProviderConfig;

#[doc(inline)]
pub use provider::Provider;
