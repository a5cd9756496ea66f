//! Reconciliation of association kinds, e.g. a credential attached to a job template.
//!
//! An association has no remote object of its own. It exists while the member is listed in the
//! owner's related list, its identity is the composite `<owner>/<member>`, and it is never
//! updated in place.
//!
//! - Create fetches the owner and then the member, and only then attaches. A missing owner fails
//!   before anything is attached.
//! - Read fetches the owner and lists its related members.
//! - Delete re-reads the owner and detaches from its canonical ID. A missing owner means the
//!   association is already gone.
//! - Import requires the owner to exist, and prefers the member the owner's own record
//!   references over the one in the raw identity.

use super::{expect_composite, Engine, Outcome};
use crate::api::instance_id;
use crate::diagnostic::{Context, Operation, ReconcileError};
use crate::identity::{encode_composite, Identity, RemoteId, StateId};
use crate::schema::{Association, DesiredState, FieldError, Instance, ObservedState, ResourceDescriptor};
use serde_json::Value;
use tracing::{debug, trace};

pub(super) async fn create(
    engine: &Engine,
    descriptor: &ResourceDescriptor,
    association: &Association,
    desired: &DesiredState,
) -> Outcome {
    let (owner, member) = match endpoints(descriptor, association, desired) {
        Ok(ids) => ids,
        Err(e) => {
            let context = Context::new(Operation::Create, descriptor.name, "");
            return Outcome::failed(StateId::Absent, ReconcileError::invalid(context, e));
        }
    };
    let key = encode_composite(owner, member);
    let context = Context::new(Operation::Create, descriptor.name, key);

    let attached = async {
        let record = fetch_owner(engine, association, owner, context.clone()).await?;
        let owner = instance_id(&record).unwrap_or(owner);
        let member_target = format!(
            "{} {}/{member}",
            association.member_field, association.member_endpoint
        );
        engine
            .api
            .get(association.member_endpoint, member)
            .await
            .map_err(|e| ReconcileError::from_api(context.clone(), member_target, e))?;

        trace!(owner, member, relation = association.relation, "associating");
        engine
            .api
            .associate(association.owner_endpoint, owner, association.relation, member)
            .await
            .map_err(|source| ReconcileError::AssociationConflict {
                context: context.clone(),
                member: format!("{}/{member}", association.member_endpoint),
                source,
            })?;
        Ok::<_, ReconcileError>(owner)
    };
    let owner = match attached.await {
        Ok(owner) => owner,
        Err(error) => return Outcome::failed(StateId::Absent, error),
    };
    debug!(owner, member, "associated");

    let identity = Identity::Composite { owner, member };
    match read(engine, descriptor, association, identity, context).await {
        Ok(outcome) => outcome,
        Err(error) => Outcome::failed(StateId::Present(identity), error),
    }
}

pub(super) async fn read(
    engine: &Engine,
    descriptor: &ResourceDescriptor,
    association: &Association,
    identity: Identity,
    context: Context,
) -> Result<Outcome, ReconcileError> {
    let (owner, member) = expect_composite(identity, &context)?;
    let record = fetch_owner(engine, association, owner, context.clone()).await?;
    let owner = instance_id(&record).unwrap_or(owner);

    let relation_target = format!(
        "{}/{owner}/{}",
        association.owner_endpoint, association.relation
    );
    let members = engine
        .api
        .list_associated(association.owner_endpoint, owner, association.relation)
        .await
        .map_err(|e| ReconcileError::from_api(context.clone(), relation_target.clone(), e))?;

    if !members.iter().any(|m| instance_id(m) == Some(member)) {
        return Err(ReconcileError::NotFound {
            context,
            target: format!("{}/{member} in {relation_target}", association.member_endpoint),
            source: None,
        });
    }

    Ok(Outcome::present(
        Identity::Composite { owner, member },
        observed(descriptor, association, owner, member),
    ))
}

pub(super) async fn delete(
    engine: &Engine,
    association: &Association,
    identity: Identity,
    context: Context,
) -> Result<(), ReconcileError> {
    let (owner, member) = expect_composite(identity, &context)?;
    let owner = match fetch_owner(engine, association, owner, context.clone()).await {
        Ok(record) => instance_id(&record).unwrap_or(owner),
        Err(e) if e.is_not_found() => {
            debug!(owner, "owner already gone");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let target = format!(
        "{}/{owner}/{}",
        association.owner_endpoint, association.relation
    );
    match engine
        .api
        .disassociate(association.owner_endpoint, owner, association.relation, member)
        .await
    {
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ReconcileError::from_api(context, target, e)),
        Ok(()) => Ok(()),
    }
}

pub(super) async fn import(
    engine: &Engine,
    descriptor: &ResourceDescriptor,
    association: &Association,
    owner: RemoteId,
    member: RemoteId,
    context: Context,
) -> Result<Outcome, ReconcileError> {
    let record = fetch_owner(engine, association, owner, context).await?;
    let owner = instance_id(&record).unwrap_or(owner);
    let member = association
        .owner_reference
        .and_then(|field| record.get(field))
        .and_then(Value::as_u64)
        .unwrap_or(member);

    Ok(Outcome::present(
        Identity::Composite { owner, member },
        observed(descriptor, association, owner, member),
    ))
}

/// Fetches the owner's record. Not-found names the owner.
async fn fetch_owner(
    engine: &Engine,
    association: &Association,
    owner: RemoteId,
    context: Context,
) -> Result<Instance, ReconcileError> {
    let target = format!(
        "{} {}/{owner}",
        association.owner_field, association.owner_endpoint
    );
    engine
        .api
        .get(association.owner_endpoint, owner)
        .await
        .map_err(|e| ReconcileError::from_api(context, target, e))
}

/// Reads the owner and member IDs out of desired state.
fn endpoints(
    descriptor: &ResourceDescriptor,
    association: &Association,
    desired: &DesiredState,
) -> Result<(RemoteId, RemoteId), FieldError> {
    let payload = descriptor.payload(desired)?;
    let id = |name: &str| -> Result<RemoteId, FieldError> {
        let remote = descriptor.field(name).map_or(name, |field| field.remote);
        payload
            .get(remote)
            .and_then(Value::as_u64)
            .ok_or_else(|| FieldError::new(name, "expected a non-negative integer ID"))
    };
    Ok((id(association.owner_field)?, id(association.member_field)?))
}

fn observed(
    descriptor: &ResourceDescriptor,
    association: &Association,
    owner: RemoteId,
    member: RemoteId,
) -> ObservedState {
    let mut instance = Instance::new();
    for (name, id) in [(association.owner_field, owner), (association.member_field, member)] {
        let remote = descriptor.field(name).map_or(name, |field| field.remote);
        instance.insert(remote.to_owned(), Value::from(id));
    }
    descriptor.observe(&instance)
}
