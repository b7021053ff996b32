//! Leprosorium Session Client Library
//!
//! This library logs in to leprosorium.ru, keeps the issued session cookies
//! in memory and uses them to fetch pages and API resources as typed models.
//!
//! # Features
//!
//! - Login with username, password, captcha and login code
//! - Cookie extraction from `Set-Cookie` headers (`lepro.sid`, `lepro.uid`)
//! - Authenticated GET/POST with the current cookie snapshot
//! - Fetchers for the main page, panel, underground, democracy page and posts
//! - Public login page and image download
//! - Blocking synchronous API, safe to share between threads
//! - Well-typed errors using thiserror
//!
//! # Example
//!
//! ```no_run
//! use lepra_client::{LepraClient, LepraError, LoginResult};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LepraClient::new()?;
//!
//! // The login page carries the captcha and a one-time login code
//! let login_page = client.get_login_page()?;
//! let captcha = client.get_image(&login_page.captcha_url)?;
//! std::fs::write("captcha.png", captcha)?;
//!
//! let result = client.login("username", "password", "answer", &login_page.login_code)?;
//! if let LoginResult::Rejected { message } = result {
//!     println!("Login failed: {}", message);
//!     return Ok(());
//! }
//!
//! for post in client.get_latest_posts(None)? {
//!     println!("{} by {}", post.id, post.author);
//! }
//!
//! // Without a session nothing is sent
//! client.logout();
//! assert!(matches!(client.get_main_page(), Err(LepraError::NotAuthenticated)));
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod model;
mod parser;
mod session;

pub use client::{AuthenticatedRequest, LOGIN_REJECTED_FALLBACK, LepraClient, LepraClientBuilder};
pub use error::LepraError;
pub use model::{
    DemocracyPageModel, LeproPanelModel, LoginPageModel, LoginResult, MainPageModel, PostModel,
    SubLepraModel,
};
pub use session::{
    DEFAULT_COOKIE_DOMAIN, SESSION_ID_COOKIE, SessionCookie, SessionCookies, USER_ID_COOKIE,
};
