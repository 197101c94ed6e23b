use std::error::Error as _;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::UserDirectoryConfig;
use crate::contract::client::UserDirectoryApi;
use crate::contract::error::{
    UserDirectoryError, CREATE_FAILED, DELETE_FAILED, LIST_FAILED, UPDATE_FAILED,
};
use crate::contract::model::{User, UserFields, UserId};
use crate::infra::http::TracedClient;

/// HTTP adapter implementing [`UserDirectoryApi`] against `{base}/users`.
#[derive(Clone, Debug)]
pub struct RestUserDirectory {
    client: TracedClient,
    base: Url,
}

impl RestUserDirectory {
    pub fn new(client: TracedClient, base: Url) -> Self {
        Self { client, base }
    }

    pub fn from_config(cfg: &UserDirectoryConfig) -> anyhow::Result<Self> {
        let base = cfg
            .base_url()
            .context("user_directory configuration is invalid")?;
        Ok(Self::new(TracedClient::default(), base))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn users_url(&self) -> Result<Url, UserDirectoryError> {
        self.url_with(&["users"])
    }

    fn user_url(&self, id: UserId) -> Result<Url, UserDirectoryError> {
        self.url_with(&["users", &id.to_string()])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, UserDirectoryError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                UserDirectoryError::transport(format!(
                    "invalid user directory base URL '{}'",
                    self.base
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Status and raw body of a received response.
struct Reply {
    status: u16,
    body: Vec<u8>,
}

impl Reply {
    async fn receive(
        sent: reqwest::Result<reqwest::Response>,
    ) -> Result<Self, UserDirectoryError> {
        let response = sent.map_err(|e| UserDirectoryError::transport(describe(&e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| UserDirectoryError::transport(describe(&e)))?;
        Ok(Self {
            status,
            body: body.to_vec(),
        })
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, UserDirectoryError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            debug!(status = self.status, error = %e, "Response body did not decode");
            UserDirectoryError::unexpected_format(self.status)
        })
    }

    /// Map a failing response to a server error.
    ///
    /// The body must be a JSON object; its `error` string is used when present
    /// and non-empty, otherwise `fallback`.
    fn into_error(self, fallback: &str) -> UserDirectoryError {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => {
                let message = map
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(fallback);
                UserDirectoryError::server(self.status, message)
            }
            _ => UserDirectoryError::unexpected_format(self.status),
        }
    }
}

fn describe(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl UserDirectoryApi for RestUserDirectory {
    #[instrument(
        name = "user_directory.rest.list_users",
        skip_all,
        fields(base = %self.base)
    )]
    async fn list_users(&self) -> Result<Vec<User>, UserDirectoryError> {
        debug!("Listing users");
        let url = self.users_url()?;

        let reply = Reply::receive(self.client.get(url.as_str()).await)
            .await
            .inspect_err(|e| warn!(error = %e, "GET /users failed"))?;
        if !reply.is_success() {
            let err = reply.into_error(LIST_FAILED);
            warn!(error = %err, "GET /users rejected");
            return Err(err);
        }

        // An empty directory may be serialised as `null`.
        let users = reply.decode::<Option<Vec<User>>>()?.unwrap_or_default();
        info!(count = users.len(), "Listed users");
        Ok(users)
    }

    #[instrument(
        name = "user_directory.rest.create_user",
        skip_all,
        fields(base = %self.base, user_name = %user.user_name)
    )]
    async fn create_user(&self, user: UserFields) -> Result<User, UserDirectoryError> {
        debug!("Creating user");
        let url = self.users_url()?;

        let reply = Reply::receive(self.client.post_json(url.as_str(), &user).await)
            .await
            .inspect_err(|e| warn!(error = %e, "POST /users failed"))?;
        if reply.status == 409 {
            warn!("User name already taken");
            return Err(UserDirectoryError::conflict(user.user_name));
        }
        if !reply.is_success() {
            let err = reply.into_error(CREATE_FAILED);
            warn!(error = %err, "POST /users rejected");
            return Err(err);
        }

        let created: User = reply.decode()?;
        info!(user_id = %created.id, "Created user");
        Ok(created)
    }

    // A 409 on rename is not distinguished from other failures here.
    #[instrument(
        name = "user_directory.rest.update_user",
        skip_all,
        fields(base = %self.base, user_id = %id)
    )]
    async fn update_user(&self, id: UserId, user: UserFields) -> Result<User, UserDirectoryError> {
        debug!("Updating user");
        let url = self.user_url(id)?;

        let reply = Reply::receive(self.client.put_json(url.as_str(), &user).await)
            .await
            .inspect_err(|e| warn!(error = %e, "PUT /users/{id} failed"))?;
        if !reply.is_success() {
            let err = reply.into_error(UPDATE_FAILED);
            warn!(error = %err, "PUT /users/{id} rejected");
            return Err(err);
        }

        let updated: User = reply.decode()?;
        info!("Updated user");
        Ok(updated)
    }

    #[instrument(
        name = "user_directory.rest.delete_user",
        skip_all,
        fields(base = %self.base, user_id = %id)
    )]
    async fn delete_user(&self, id: UserId) -> Result<(), UserDirectoryError> {
        debug!("Deleting user");
        let url = self.user_url(id)?;

        let reply = Reply::receive(self.client.delete(url.as_str()).await)
            .await
            .inspect_err(|e| warn!(error = %e, "DELETE /users/{id} failed"))?;
        if !reply.is_success() {
            let err = reply.into_error(DELETE_FAILED);
            warn!(error = %err, "DELETE /users/{id} rejected");
            return Err(err);
        }

        info!("Deleted user");
        Ok(())
    }
}
