//! Session core for the JobLinker job board: token persistence, local expiry
//! checks, refresh, authenticated requests and route gating.

pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::SessionConfig;
pub use error::{SessionError, StoreError};
pub use gateway::{ApiClient, ApiRequest, ApiResponse};
pub use guard::{NavigationOutcome, RouteAccess, RouteGuard, RoutePolicy, SignInRedirect};
pub use refresh::{HttpRefreshClient, TokenRefresher};
pub use session::SessionContext;
pub use store::{CookieTokenStore, FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{AuthResponse, LoginRequest, RegisterRequest, Session, TokenPair, UserRole, UserSummary};
