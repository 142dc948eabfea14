pub mod blocks;
pub mod dashboard;
pub mod health;
pub mod projects;
pub mod stock;
pub mod supervisors;
pub mod units;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::errors::ServiceError;
use crate::services::identity::Identity;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Header carrying the actor id resolved by the upstream auth gateway
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Actor id taken from the `x-actor-id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorId(pub i32);

impl ActorId {
    pub fn from_parts(parts: &Parts) -> Result<Self, ServiceError> {
        let raw = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("Missing x-actor-id header".to_string()))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|id| *id > 0)
            .map(ActorId)
            .ok_or_else(|| ServiceError::Unauthorized("Invalid x-actor-id header".to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ActorId::from_parts(parts)
    }
}

/// Identity of the calling actor, resolved once per request
#[derive(Debug, Clone)]
pub struct Actor(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ActorId(actor_id) = ActorId::from_parts(parts)?;
        let identity = state.services.identity.resolve(actor_id).await?;
        debug!(
            actor_id,
            role = ?identity.declared_role,
            "Resolved request identity"
        );
        Ok(Actor(identity))
    }
}
