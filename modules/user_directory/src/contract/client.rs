use async_trait::async_trait;

use crate::contract::{
    error::UserDirectoryError,
    model::{User, UserFields, UserId},
};

/// Operations offered by the user directory.
///
/// Each call is a single round trip with no retries and no caching; callers
/// re-list to observe the effect of a write.
#[async_trait]
pub trait UserDirectoryApi: Send + Sync {
    /// List every user in backend order
    async fn list_users(&self) -> Result<Vec<User>, UserDirectoryError>;

    /// Create a user; the returned record carries the backend-assigned id
    async fn create_user(&self, user: UserFields) -> Result<User, UserDirectoryError>;

    /// Replace all fields of the user identified by `id`
    async fn update_user(&self, id: UserId, user: UserFields) -> Result<User, UserDirectoryError>;

    /// Delete a user by ID
    async fn delete_user(&self, id: UserId) -> Result<(), UserDirectoryError>;
}
