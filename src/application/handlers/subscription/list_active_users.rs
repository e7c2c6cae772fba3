//! ListActiveUsersHandler - Admin query listing users the store considers active.

use std::sync::Arc;

use crate::application::OperationalAlerts;
use crate::domain::foundation::UserId;
use crate::domain::subscription::{SubscriptionError, User};
use crate::ports::SubscriptionStore;

#[derive(Debug, Clone)]
pub struct ListActiveUsersQuery {
    pub requested_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListActiveUsersResult {
    pub users: Vec<User>,
}

/// Operators compare this list with the channel's members by hand; bots
/// cannot enumerate members of a private channel.
pub struct ListActiveUsersHandler {
    store: Arc<dyn SubscriptionStore>,
    alerts: Arc<OperationalAlerts>,
}

impl ListActiveUsersHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, alerts: Arc<OperationalAlerts>) -> Self {
        Self { store, alerts }
    }

    pub async fn handle(
        &self,
        query: ListActiveUsersQuery,
    ) -> Result<ListActiveUsersResult, SubscriptionError> {
        if !self.alerts.is_operator(query.requested_by) {
            tracing::warn!(user_id = %query.requested_by, "Non-operator requested user list");
            return Err(SubscriptionError::forbidden("operators only"));
        }

        Ok(ListActiveUsersResult {
            users: self.store.list_active_users().await?,
        })
    }
}
