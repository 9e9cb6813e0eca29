// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route in this tier sits behind `middleware::require_identity`, so
// handlers can take `AuthUser` and trust it. Identity is never read from the
// request body.

pub mod profile;

pub use profile::{create_user_data, fetch_user_data, update_user_data};
