//! Browser session module
//!
//! This module owns everything that touches the remote site:
//! - The `BrowserSession` trait the crawler drives (load, solve challenge, close)
//! - `HttpSession`, a cookie-keeping HTTP implementation built on reqwest
//! - Stealth identities (user agent, viewport hint, proxy) and their rotation

mod http;
mod session;
mod stealth;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpSession;
pub use session::{BrowserSession, Identity, LoadedPage, SessionError};
pub use stealth::{StealthProfile, DEFAULT_USER_AGENTS};
