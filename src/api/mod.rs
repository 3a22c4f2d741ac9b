/// API routes and handlers
pub mod extract;
pub mod gateway;
pub mod health;
pub mod registry;
pub mod resolver;

use crate::{config::Role, context::AppContext};
use axum::Router;

/// Build the routes served by `role`
pub fn routes(role: Role) -> Router<AppContext> {
    let router = Router::new().merge(health::routes());

    match role {
        Role::Gateway => router.merge(gateway::routes()),
        Role::Resolver => router.merge(resolver::routes()),
        Role::Registry => router.merge(registry::routes()),
        Role::Standalone => router.merge(gateway::routes()).merge(registry::routes()),
    }
}
