use crate::host::{GroupName, HostError, UserKey};

/// Users and groups of the server.
///
/// Directory lookups do not depend on the acting identity and are available before a run has
/// authenticated.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Members of `group`, in directory order. `None` when the group does not exist.
    ///
    /// # Errors
    /// Any `HostError` raised by the directory.
    async fn group_members(&self, group: GroupName) -> Result<Option<Vec<UserKey>>, HostError>;

    /// Groups `user_key` belongs to. `None` when the user does not exist.
    ///
    /// # Errors
    /// Any `HostError` raised by the directory.
    async fn user_groups(&self, user_key: UserKey) -> Result<Option<Vec<GroupName>>, HostError>;
}
