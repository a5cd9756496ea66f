//! [RemoteApi] over AWX's REST API.
//!
//! Collections live at `/api/v2/<endpoint>/` and instances at `/api/v2/<endpoint>/<id>/`. A
//! related list such as a job template's credentials lives at
//! `/api/v2/<endpoint>/<id>/<relation>/`; members are attached by POSTing `{"id": member}` to it
//! and detached by POSTing `{"id": member, "disassociate": true}`.
//!
//! Every request carries HTTP basic authentication. The client performs no retries; a failed
//! call is returned to the engine as-is.

use super::{ApiError, RemoteApi};
use crate::identity::RemoteId;
use crate::schema::Instance;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// The path prefix of AWX's REST API.
pub const API_PREFIX: &str = "api/v2";

/// The page size requested for every list call.
pub const PAGE_SIZE: &str = "200";

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct Page {
    results: Vec<Instance>,
    next: Option<String>,
}

/// An authenticated AWX API client.
///
/// Cloning is cheap: the underlying [Client] is reference counted and shares its connection
/// pool.
#[derive(Clone)]
pub struct AwxClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for AwxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwxClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &crate::schema::REDACTED)
            .finish()
    }
}

impl AwxClient {
    /// Wraps an HTTP client that has already been configured for transport security.
    ///
    /// See [crate::transport::connect] for the usual way to build one.
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        base_url.truncate(base_url.trim_end_matches('/').len());
        AwxClient {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the user the client authenticates as.
    ///
    /// Used as the authentication probe when configuring the provider.
    pub async fn me(&self) -> Result<Instance, ApiError> {
        let url = self.url("me");
        let mut users = self.collect(url.clone(), &[]).await?;
        match users.is_empty() {
            false => Ok(users.swap_remove(0)),
            true => Err(ApiError::Decode {
                url,
                message: "no current user in response".to_owned(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}/", self.base_url)
    }

    fn instance_url(&self, endpoint: &str, id: RemoteId) -> String {
        self.url(&format!("{endpoint}/{id}"))
    }

    fn related_url(&self, endpoint: &str, owner: RemoteId, relation: &str) -> String {
        self.url(&format!("{endpoint}/{owner}/{relation}"))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Sends a request and classifies the response status.
    async fn send(
        &self,
        method: Method,
        url: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        debug!(%method, url, "sending AWX request");
        let response = build(self.request(method.clone(), url)).send().await?;
        let status = response.status();
        debug!(%method, url, status = status.as_u16(), "received AWX response");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.to_owned()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Instance, ApiError> {
        let response = self
            .send(method, url, |request| match body {
                Some(body) => request.json(body),
                None => request,
            })
            .await?;
        response
            .json::<Instance>()
            .await
            .map_err(|e| ApiError::Decode {
                url: url.to_owned(),
                message: e.to_string(),
            })
    }

    /// Fetches every page of a list, starting at `url`.
    ///
    /// Stops early if a `next` link points back at a page already fetched.
    async fn collect(
        &self,
        url: String,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Instance>, ApiError> {
        let mut results = Vec::new();
        let mut fetched = HashSet::new();
        let mut page = self
            .fetch_page(&url, |request| {
                request.query(filters).query(&[("page_size", PAGE_SIZE)])
            })
            .await?;

        loop {
            results.append(&mut page.results);
            let Some(next) = page.next.take() else {
                break;
            };
            // The next link already carries the filters and page size.
            let next = self.resolve(&next)?;
            if !fetched.insert(next.clone()) {
                warn!(url = next.as_str(), "pagination loops back to a fetched page");
                break;
            }
            page = self.fetch_page(&next, |request| request).await?;
        }
        Ok(results)
    }

    async fn fetch_page(
        &self,
        url: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Page, ApiError> {
        self.send(Method::GET, url, build)
            .await?
            .json::<Page>()
            .await
            .map_err(|e| ApiError::Decode {
                url: url.to_owned(),
                message: e.to_string(),
            })
    }

    /// Resolves a pagination link, which AWX reports relative to the server root.
    fn resolve(&self, link: &str) -> Result<String, ApiError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(link))
            .map(String::from)
            .map_err(|e| ApiError::Decode {
                url: link.to_owned(),
                message: format!("invalid pagination link: {e}"),
            })
    }

    async fn post_related(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        body: Value,
    ) -> Result<(), ApiError> {
        let url = self.related_url(owner_endpoint, owner, relation);
        self.send(Method::POST, &url, |request| request.json(&body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl RemoteApi for AwxClient {
    async fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Instance>, ApiError> {
        self.collect(self.url(endpoint), filters).await
    }

    async fn get(&self, endpoint: &str, id: RemoteId) -> Result<Instance, ApiError> {
        self.send_json(Method::GET, &self.instance_url(endpoint, id), None)
            .await
    }

    async fn create(&self, endpoint: &str, fields: &Instance) -> Result<Instance, ApiError> {
        let body = Value::Object(fields.clone());
        self.send_json(Method::POST, &self.url(endpoint), Some(&body))
            .await
    }

    async fn update(
        &self,
        endpoint: &str,
        id: RemoteId,
        fields: &Instance,
    ) -> Result<Instance, ApiError> {
        let body = Value::Object(fields.clone());
        self.send_json(Method::PATCH, &self.instance_url(endpoint, id), Some(&body))
            .await
    }

    async fn delete(&self, endpoint: &str, id: RemoteId) -> Result<(), ApiError> {
        self.send(Method::DELETE, &self.instance_url(endpoint, id), |request| {
            request
        })
        .await
        .map(|_| ())
    }

    async fn associate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError> {
        self.post_related(owner_endpoint, owner, relation, json!({ "id": member }))
            .await
    }

    async fn disassociate(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
        member: RemoteId,
    ) -> Result<(), ApiError> {
        self.post_related(
            owner_endpoint,
            owner,
            relation,
            json!({ "id": member, "disassociate": true }),
        )
        .await
    }

    async fn list_associated(
        &self,
        owner_endpoint: &str,
        owner: RemoteId,
        relation: &str,
    ) -> Result<Vec<Instance>, ApiError> {
        self.collect(self.related_url(owner_endpoint, owner, relation), &[])
            .await
    }
}
