//! Encodes and decodes the identities of remote objects.
//!
//! Every object the remote API manages is identified by a non-negative integer that the API
//! issues on creation. Associations, which represent a relationship between two objects rather
//! than an object of their own, are identified by the pair of IDs they connect.
//!
//! The front end stores identities as strings between operations. This module is the only place
//! that converts between those strings and structured [Identity] values:
//!
//! | Scheme    | Structured                        | Persisted |
//! |-----------|-----------------------------------|-----------|
//! | Simple    | `Identity::Simple(42)`            | `"42"`    |
//! | Composite | `Identity::Composite { 5, 7 }`    | `"5/7"`   |
//!
//! No other separators or escaping are supported.

use serde::{Serialize, Serializer};
use std::fmt::{self, Display};
use thiserror::Error;

/// A numeric ID issued by the remote API.
pub type RemoteId = u64;

/// The separator between the owner and member halves of a composite identity.
pub const COMPOSITE_SEPARATOR: char = '/';

/// The structured identity of a remote object or association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A single object, e.g. a job template.
    Simple(RemoteId),

    /// An association between two objects, e.g. a credential attached to a job template.
    Composite { owner: RemoteId, member: RemoteId },
}

impl Identity {
    /// Returns the ID of the object itself, or the owner's ID for an association.
    pub fn primary(&self) -> RemoteId {
        match *self {
            Identity::Simple(id) => id,
            Identity::Composite { owner, .. } => owner,
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Identity::Simple(id) => f.write_str(&encode_simple(id)),
            Identity::Composite { owner, member } => f.write_str(&encode_composite(owner, member)),
        }
    }
}

/// Which identity scheme a resource kind uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScheme {
    Simple,
    Composite,
}

impl IdentityScheme {
    /// Decodes a persisted string according to this scheme.
    pub fn decode(&self, persisted: &str) -> Result<Identity, MalformedIdentity> {
        match self {
            IdentityScheme::Simple => decode_simple(persisted).map(Identity::Simple),
            IdentityScheme::Composite => decode_composite(persisted)
                .map(|(owner, member)| Identity::Composite { owner, member }),
        }
    }
}

/// A persisted identity string could not be decoded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("malformed identity {input:?}: {reason}")]
pub struct MalformedIdentity {
    /// The string that failed to decode.
    pub input: String,

    /// A short description of what was wrong with it.
    pub reason: &'static str,
}

impl MalformedIdentity {
    pub fn new(input: &str, reason: &'static str) -> Self {
        MalformedIdentity {
            input: input.to_owned(),
            reason,
        }
    }
}

/// Encodes a simple identity as a decimal string.
pub fn encode_simple(id: RemoteId) -> String {
    id.to_string()
}

/// Decodes a simple identity.
///
/// Only ASCII digits are accepted: no sign, no white space, no empty string. The value must fit
/// in a [RemoteId].
pub fn decode_simple(persisted: &str) -> Result<RemoteId, MalformedIdentity> {
    if persisted.is_empty() {
        return Err(MalformedIdentity::new(persisted, "identity is empty"));
    }
    if !persisted.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedIdentity::new(
            persisted,
            "expected a non-negative decimal integer",
        ));
    }
    persisted
        .parse()
        .map_err(|_| MalformedIdentity::new(persisted, "integer is out of range"))
}

/// Encodes a composite identity as `<owner>/<member>`.
pub fn encode_composite(owner: RemoteId, member: RemoteId) -> String {
    format!("{owner}{COMPOSITE_SEPARATOR}{member}")
}

/// Decodes a composite identity written as `<owner>/<member>`.
///
/// The string is split on the first separator. Both halves must decode with [decode_simple], so
/// `"5/6/7"` fails because `"6/7"` is not an integer.
pub fn decode_composite(persisted: &str) -> Result<(RemoteId, RemoteId), MalformedIdentity> {
    let (owner, member) = persisted
        .split_once(COMPOSITE_SEPARATOR)
        .ok_or_else(|| MalformedIdentity::new(persisted, "expected <owner_id>/<member_id>"))?;

    let owner = decode_simple(owner)
        .map_err(|_| MalformedIdentity::new(persisted, "owner ID is not an integer"))?;
    let member = decode_simple(member)
        .map_err(|_| MalformedIdentity::new(persisted, "member ID is not an integer"))?;
    Ok((owner, member))
}

/// Whether a resource instance exists in the front end's state.
///
/// The front end persists [StateId::Absent] as the empty string. That convention is confined to
/// [StateId::from_persisted] and [StateId::to_persisted]; inside the crate, an absent resource is
/// never confused with an identity that failed to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateId {
    /// No identity is stored; the resource does not exist in state.
    #[default]
    Absent,

    /// The resource is believed to exist remotely under this identity.
    Present(Identity),
}

impl StateId {
    /// Parses a persisted identity string. The empty string is [StateId::Absent].
    pub fn from_persisted(
        persisted: &str,
        scheme: IdentityScheme,
    ) -> Result<Self, MalformedIdentity> {
        if persisted.is_empty() {
            return Ok(StateId::Absent);
        }
        scheme.decode(persisted).map(StateId::Present)
    }

    /// Serializes this value for the front end. [StateId::Absent] becomes the empty string.
    pub fn to_persisted(&self) -> String {
        match self {
            StateId::Absent => String::new(),
            StateId::Present(identity) => identity.to_string(),
        }
    }

    /// Returns the identity, if present.
    pub fn identity(&self) -> Option<Identity> {
        match *self {
            StateId::Absent => None,
            StateId::Present(identity) => Some(identity),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, StateId::Present(_))
    }
}

impl Serialize for StateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_persisted())
    }
}
