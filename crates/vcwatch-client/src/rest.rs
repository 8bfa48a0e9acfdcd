//! REST session and tagging client
//!
//! Talks to the vSphere Automation REST API. [`RestSession`] exchanges
//! basic-auth credentials for a session id sent on every subsequent request;
//! [`RestTaggingClient`] implements [`TaggingService`] on top of it. The
//! inventory-side transport lives in [`crate::inventory`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};
use crate::traits::TaggingService;
use crate::types::{Category, EntityKind, Mor, ObjectTags, TagModel};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Responses from the Automation API wrap their payload in a `value` field
#[derive(Debug, Deserialize)]
pub(crate) struct Enveloped<T> {
    pub(crate) value: T,
}

#[derive(Debug, Serialize)]
struct WireObjectId<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireObjectIdOwned {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WireAttachedTags {
    object_id: WireObjectIdOwned,
    tag_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    id: String,
    name: String,
    category_id: String,
}

/// An authenticated Automation API session
#[derive(Debug)]
pub struct RestSession {
    client: Client,
    base_url: Url,
    session_id: String,
}

impl RestSession {
    /// Log in and establish a session
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the session request
    /// is rejected.
    pub async fn login(
        base_url: impl AsRef<str>,
        user: &str,
        pass: &str,
        validate_ssl: bool,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let client = Client::builder()
            .danger_accept_invalid_certs(!validate_ssl)
            .build()?;

        let url = base_url.join("/rest/com/vmware/cis/session")?;
        let response = client
            .post(url)
            .basic_auth(user, Some(pass))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let session: Enveloped<String> = response.json().await?;

        debug!("session established");

        Ok(Self {
            client,
            base_url,
            session_id: session.value,
        })
    }

    /// Release the session
    ///
    /// # Errors
    /// Returns an error if the logout request fails.
    pub async fn logout(&self) -> Result<()> {
        let url = self.base_url.join("/rest/com/vmware/cis/session")?;
        let response = self
            .client
            .delete(url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        Ok(())
    }

    /// Build a full URL from a path
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    /// Perform a session-authenticated GET and unwrap the envelope
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.get_url(url).await
    }

    /// Perform a session-authenticated GET against a prebuilt URL and unwrap
    /// the envelope
    pub(crate) async fn get_url<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let enveloped: Enveloped<T> = response.json().await?;
        Ok(enveloped.value)
    }

    /// Perform a session-authenticated POST with JSON body and unwrap the
    /// envelope
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl serde::Serialize,
    ) -> Result<T> {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .header(SESSION_HEADER, &self.session_id)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let enveloped: Enveloped<T> = response.json().await?;
        Ok(enveloped.value)
    }
}

/// REST client for the remote tagging service
#[derive(Debug, Clone)]
pub struct RestTaggingClient {
    session: Arc<RestSession>,
}

impl RestTaggingClient {
    /// Wrap an established session
    #[must_use]
    pub fn new(session: Arc<RestSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TaggingService for RestTaggingClient {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let ids: Vec<String> = self
            .session
            .get("/rest/com/vmware/cis/tagging/category")
            .await?;

        let mut categories = Vec::with_capacity(ids.len());
        for id in ids {
            let cat: WireCategory = self
                .session
                .get(&format!("/rest/com/vmware/cis/tagging/category/id:{id}"))
                .await?;
            categories.push(Category {
                id: cat.id,
                name: cat.name,
            });
        }

        debug!(count = categories.len(), "categories listed");

        Ok(categories)
    }

    async fn list_tags(&self) -> Result<Vec<TagModel>> {
        let ids: Vec<String> = self.session.get("/rest/com/vmware/cis/tagging/tag").await?;

        let mut tags = Vec::with_capacity(ids.len());
        for id in ids {
            let tag: WireTag = self
                .session
                .get(&format!("/rest/com/vmware/cis/tagging/tag/id:{id}"))
                .await?;
            tags.push(TagModel {
                id: tag.id,
                name: tag.name,
                category_id: tag.category_id,
            });
        }

        debug!(count = tags.len(), "tags listed");

        Ok(tags)
    }

    async fn attached_tags_on_objects(&self, objects: &[Mor]) -> Result<Vec<ObjectTags>> {
        let object_ids: Vec<WireObjectId<'_>> = objects
            .iter()
            .map(|mor| WireObjectId {
                id: &mor.value,
                kind: mor.kind.as_str(),
            })
            .collect();

        let attached: Vec<WireAttachedTags> = self
            .session
            .post(
                "/rest/com/vmware/cis/tagging/tag-association?~action=list-attached-tags-on-objects",
                serde_json::json!({ "object_ids": object_ids }),
            )
            .await?;

        let mut result = Vec::with_capacity(attached.len());
        for entry in attached {
            let Some(kind) = EntityKind::from_wire(&entry.object_id.kind) else {
                // Unknown kinds cannot land in any registry; skip them.
                continue;
            };
            result.push(ObjectTags {
                object: Mor::new(kind, entry.object_id.id),
                tag_ids: entry.tag_ids,
            });
        }

        Ok(result)
    }
}
