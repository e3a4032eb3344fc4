//! Access token lifecycle
//!
//! [`TokenManager`] owns the bearer token and decides when it is replaced;
//! [`AgencyTokenClient`] performs the agency credential exchange against the
//! identity server.

mod agency;
mod token_manager;

pub use agency::AgencyTokenClient;
pub use token_manager::{RefreshReason, TokenExchange, TokenManager};
