//! Client side of the profile app: identity, API access and the
//! session store the UI (or CLI) renders from.

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;

pub use actions::{Registration, SessionClient, UpdateOutcome};
pub use api::ProfileApiClient;
pub use config::{ClientConfig, IdentityConfig};
pub use error::{ClientError, IdentityError};
pub use identity::{Credential, IdentityProvider, RestIdentityProvider, SignedInUser};
pub use session::{SessionEvent, SessionState, SessionStore};
