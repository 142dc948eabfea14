use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::{actor_profile, customer, supervisor};
use crate::errors::ServiceError;

/// Role declared on an actor's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredRole {
    /// Builder / organization accounts that own projects
    Owner,
    Supervisor,
    Customer,
    /// No profile, or a profile whose role field is blank or unrecognised
    Unspecified,
}

impl DeclaredRole {
    pub fn from_user_type(user_type: Option<&str>) -> Self {
        match user_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("builder") | Some("organization") | Some("organisation") | Some("owner") => {
                DeclaredRole::Owner
            }
            Some("supervisor") => DeclaredRole::Supervisor,
            Some("customer") => DeclaredRole::Customer,
            _ => DeclaredRole::Unspecified,
        }
    }
}

/// Resolved identity of the acting user, computed once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// The actor id; doubles as the owner id of projects the actor creates
    pub actor_id: i32,
    pub declared_role: DeclaredRole,
    pub supervisor_id: Option<i32>,
    pub customer_id: Option<i32>,
}

impl Identity {
    pub fn new(actor_id: i32, declared_role: DeclaredRole) -> Self {
        Self {
            actor_id,
            declared_role,
            supervisor_id: None,
            customer_id: None,
        }
    }

    pub fn owner(actor_id: i32) -> Self {
        Self::new(actor_id, DeclaredRole::Owner)
    }

    pub fn with_supervisor(mut self, supervisor_id: i32) -> Self {
        self.supervisor_id = Some(supervisor_id);
        self
    }

    pub fn with_customer(mut self, customer_id: i32) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn owner_id(&self) -> i32 {
        self.actor_id
    }

    pub fn is_customer(&self) -> bool {
        self.declared_role == DeclaredRole::Customer
    }

    /// Customer-role actors never reach management views.
    pub fn ensure_management_access(&self) -> Result<(), ServiceError> {
        if self.is_customer() {
            return Err(ServiceError::Forbidden(format!(
                "Actor {} has the customer role and cannot access management views",
                self.actor_id
            )));
        }
        Ok(())
    }
}

/// Resolves an actor id into an [`Identity`]
#[derive(Clone)]
pub struct IdentityResolver {
    db: Arc<DatabaseConnection>,
}

impl IdentityResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Reads the actor's profile plus at most one linked supervisor and customer record.
    #[instrument(skip(self))]
    pub async fn resolve(&self, actor_id: i32) -> Result<Identity, ServiceError> {
        let profile = actor_profile::Entity::find()
            .filter(actor_profile::Column::ActorId.eq(actor_id))
            .one(&*self.db)
            .await?;

        let declared_role =
            DeclaredRole::from_user_type(profile.as_ref().and_then(|p| p.user_type.as_deref()));

        let supervisor_id = supervisor::Entity::find()
            .filter(supervisor::Column::ActorId.eq(actor_id))
            .order_by_asc(supervisor::Column::Id)
            .one(&*self.db)
            .await?
            .map(|s| s.id);

        let customer_id = customer::Entity::find()
            .filter(customer::Column::ActorId.eq(actor_id))
            .order_by_asc(customer::Column::Id)
            .one(&*self.db)
            .await?
            .map(|c| c.id);

        debug!(
            ?declared_role,
            ?supervisor_id,
            ?customer_id,
            "Resolved identity for actor {}",
            actor_id
        );

        Ok(Identity {
            actor_id,
            declared_role,
            supervisor_id,
            customer_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("builder"), DeclaredRole::Owner)]
    #[case(Some("Organization"), DeclaredRole::Owner)]
    #[case(Some(" owner "), DeclaredRole::Owner)]
    #[case(Some("supervisor"), DeclaredRole::Supervisor)]
    #[case(Some("CUSTOMER"), DeclaredRole::Customer)]
    #[case(Some(""), DeclaredRole::Unspecified)]
    #[case(Some("staff"), DeclaredRole::Unspecified)]
    #[case(None, DeclaredRole::Unspecified)]
    fn maps_user_type_to_role(#[case] user_type: Option<&str>, #[case] expected: DeclaredRole) {
        assert_eq!(DeclaredRole::from_user_type(user_type), expected);
    }

    #[test]
    fn customers_are_denied_management_access() {
        let identity = Identity::new(5, DeclaredRole::Customer).with_customer(2);
        assert!(matches!(
            identity.ensure_management_access(),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(Identity::owner(5).ensure_management_access().is_ok());
    }
}
