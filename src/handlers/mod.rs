// handlers/mod.rs - two security tiers
//
// Public (no auth) -> Protected (verified bearer token)
pub mod protected;
pub mod public;
