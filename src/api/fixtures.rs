//! A recording, in-memory [RemoteApi] for tests.
//!
//! [FakeApi] keeps collections in insertion order, hands out IDs from a single counter, and
//! records every call so that tests can assert on exactly which remote operations ran.

use super::*;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded call to a [RemoteApi] method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub endpoint: String,
    pub id: Option<RemoteId>,
}

#[derive(Debug, Default)]
struct Store {
    // Maps endpoint -> (id -> instance).
    collections: HashMap<String, IndexMap<RemoteId, Instance>>,

    // Maps (owner endpoint, owner id, relation) -> member ids.
    relations: HashMap<(String, RemoteId, String), Vec<RemoteId>>,

    last_id: RemoteId,

    calls: Vec<Call>,

    // Methods that should return a server error.
    failing: HashSet<&'static str>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    store: Mutex<Store>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns this fake as the trait object the engine expects.
    pub fn as_api(self: &Arc<Self>) -> Arc<dyn RemoteApi> {
        self.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    /// Seeds an instance without recording a call. Returns its ID.
    pub fn insert(&self, endpoint: &str, fields: Value) -> RemoteId {
        let mut store = self.lock();
        let Value::Object(fields) = fields else {
            panic!("expected a JSON object");
        };
        store.insert(endpoint, fields)
    }

    /// Seeds an association without recording a call.
    pub fn attach(&self, owner_endpoint: &str, owner: RemoteId, relation: &str, member: RemoteId) {
        self.lock()
            .relations
            .entry((owner_endpoint.to_owned(), owner, relation.to_owned()))
            .or_default()
            .push(member);
    }

    /// Removes an instance behind the engine's back, as another user of the API might.
    pub fn remove(&self, endpoint: &str, id: RemoteId) {
        if let Some(collection) = self.lock().collections.get_mut(endpoint) {
            collection.shift_remove(&id);
        }
    }

    /// Makes every later call to `method` fail with HTTP 500.
    pub fn fail(&self, method: &'static str) {
        self.lock().failing.insert(method);
    }

    pub fn instance(&self, endpoint: &str, id: RemoteId) -> Option<Instance> {
        self.lock()
            .collections
            .get(endpoint)
            .and_then(|collection| collection.get(&id))
            .cloned()
    }

    pub fn members(&self, owner_endpoint: &str, owner: RemoteId, relation: &str) -> Vec<RemoteId> {
        self.lock()
            .relations
            .get(&(owner_endpoint.to_owned(), owner, relation.to_owned()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Returns the names of the methods called so far, in order.
    pub fn methods(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(|call| call.method).collect()
    }

    pub fn called(&self, method: &str) -> bool {
        self.lock().calls.iter().any(|call| call.method == method)
    }

    // Records a call and returns an error if `method` was set to fail.
    fn record(
        &self,
        method: &'static str,
        endpoint: &str,
        id: Option<RemoteId>,
    ) -> Result<MutexGuard<'_, Store>, ApiError> {
        let mut store = self.lock();
        store.calls.push(Call {
            method,
            endpoint: endpoint.to_owned(),
            id,
        });
        if store.failing.contains(method) {
            return Err(ApiError::Status {
                method: "TEST".to_owned(),
                url: format!("{endpoint}/{}", id.map(|i| i.to_string()).unwrap_or_default()),
                status: 500,
                body: format!("{method} was set to fail"),
            });
        }
        Ok(store)
    }
}

impl Store {
    fn insert(&mut self, endpoint: &str, mut fields: Instance) -> RemoteId {
        self.last_id += 1;
        let id = self.last_id;
        fields.insert("id".to_owned(), Value::from(id));
        self.collections
            .entry(endpoint.to_owned())
            .or_default()
            .insert(id, fields);
        id
    }

    fn get(&self, endpoint: &str, id: RemoteId) -> Result<&Instance, ApiError> {
        self.collections
            .get(endpoint)
            .and_then(|collection| collection.get(&id))
            .ok_or_else(|| ApiError::NotFound(format!("{endpoint}/{id}")))
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Instance>, ApiError> {
        let store = self.record("list", endpoint, None)?;
        let matches = |instance: &Instance| {
            filters.iter().all(|(key, expected)| match instance.get(*key) {
                Some(Value::String(s)) => s == expected,
                Some(other) => other.to_string() == *expected,
                None => false,
            })
        };
        Ok(store
            .collections
            .get(endpoint)
            .map(|collection| {
                collection
                    .values()
                    .filter(|&instance| matches(instance))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, endpoint: &str, id: RemoteId) -> Result<Instance, ApiError> {
        let store = self.record("get", endpoint, Some(id))?;
        store.get(endpoint, id).cloned()
    }

    async fn create(&self, endpoint: &str, fields: &Instance) -> Result<Instance, ApiError> {
        let mut store = self.record("create", endpoint, None)?;
        let id = store.insert(endpoint, fields.clone());
        store.get(endpoint, id).cloned()
    }

    async fn update(
        &self,
        endpoint: &str,
        id: RemoteId,
        fields: &Instance,
    ) -> Result<Instance, ApiError> {
        let mut store = self.record("update", endpoint, Some(id))?;
        store.get(endpoint, id)?;
        let mut replacement = fields.clone();
        replacement.insert("id".to_owned(), Value::from(id));
        store
            .collections
            .entry(endpoint.to_owned())
            .or_default()
            .insert(id, replacement.clone());
        Ok(replacement)
    }

    async fn delete(&self, endpoint: &str, id: RemoteId) -> Result<(), ApiError> {
        let mut store = self.record("delete", endpoint, Some(id))?;
        store
            .collections
            .get_mut(endpoint)
            .and_then(|collection| collection.shift_remove(&id))
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("{endpoint}/{id}")))
    }

    async fn associate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError> {
        let mut store = self.record("associate", owner_endpoint, Some(owner))?;
        store.get(owner_endpoint, owner)?;
        let members = store
            .relations
            .entry((owner_endpoint.to_owned(), owner, relation.to_owned()))
            .or_default();
        if !members.contains(&member) {
            members.push(member);
        }
        Ok(())
    }

    async fn disassociate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError> {
        let mut store = self.record("disassociate", owner_endpoint, Some(owner))?;
        store.get(owner_endpoint, owner)?;
        if let Some(members) =
            store
                .relations
                .get_mut(&(owner_endpoint.to_owned(), owner, relation.to_owned()))
        {
            members.retain(|m| *m != member);
        }
        Ok(())
    }

    async fn list_associated(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
    ) -> Result<Vec<Instance>, ApiError> {
        let store = self.record("list_associated", owner_endpoint, Some(owner))?;
        store.get(owner_endpoint, owner)?;
        let members = store
            .relations
            .get(&(owner_endpoint.to_owned(), owner, relation.to_owned()))
            .cloned()
            .unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|member| match store.get(relation, member) {
                Ok(instance) => instance.clone(),
                Err(_) => {
                    let mut stub = Instance::new();
                    stub.insert("id".to_owned(), Value::from(member));
                    stub
                }
            })
            .collect())
    }
}
