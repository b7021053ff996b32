//! Leprosorium session client implementation

use crate::error::LepraError;
use crate::model::{
    DemocracyPageModel, LeproPanelModel, LoginPageModel, LoginResult, MainPageModel, PostModel,
    SubLepraModel,
};
use crate::parser::ResponseParser;
use crate::session::{AuthState, CookieScope, DEFAULT_COOKIE_DOMAIN, extract_session_cookies};
use reqwest::blocking::Response;
use reqwest::header::COOKIE;
use reqwest::{Method, Url};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Message returned when a rejected login page carries no readable error
pub const LOGIN_REJECTED_FALLBACK: &str = "Login failed";

/// Longest redirect chain a fetcher follows
const MAX_REDIRECTS: usize = 10;

/// Description of a request that needs the session cookies
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    method: Method,
    url: Url,
    form: Vec<(String, String)>,
}

impl AuthenticatedRequest {
    /// A GET request to `url`
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A POST request to `url`
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// A request with an arbitrary method
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            form: Vec::new(),
        }
    }

    /// Add a field to the URL-encoded form body
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Session client for leprosorium.ru
///
/// Holds the authentication state for a single user. A successful
/// [`login`](Self::login) stores the `lepro.sid`/`lepro.uid` pair; every
/// authenticated fetcher refuses to touch the network until then and fails
/// with [`LepraError::NotAuthenticated`].
///
/// The client is `Send + Sync`. Login swaps the cookie pair under a write
/// lock and requests copy it under a read lock, so a concurrent request
/// never sees half of a pair.
///
/// # Example
///
/// ```no_run
/// use lepra_client::{LepraClient, LoginResult};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LepraClient::new()?;
///
/// let login_page = client.get_login_page()?;
/// println!("Solve the captcha at {}", login_page.captcha_url);
///
/// match client.login("user", "password", "captcha", &login_page.login_code)? {
///     LoginResult::Success => {
///         let panel = client.get_lepro_panel()?;
///         println!("Karma: {}", panel.karma);
///     }
///     LoginResult::Rejected { message } => println!("Login failed: {}", message),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LepraClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    scope: CookieScope,
    state: RwLock<AuthState>,
    parser: ResponseParser,
}

impl LepraClient {
    /// Create a client for the public site with default settings
    ///
    /// # Errors
    ///
    /// Returns `LepraError::ClientInit` if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, LepraError> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lepra_client::LepraClient;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = LepraClient::builder()
    ///     .base_url("http://localhost:1234")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> LepraClientBuilder {
        LepraClientBuilder::new()
    }

    /// Origin all endpoint paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a login has succeeded and the session cookies are held
    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    /// Forget the session cookies and return to the unauthenticated state
    pub fn logout(&self) {
        self.write_state().clear();
        info!("session cleared");
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LepraError> {
        endpoint_url(&self.base_url, segments)
    }

    /// Log in with the given credentials
    ///
    /// Posts the login form without following redirects and looks for the
    /// session cookies in the `Set-Cookie` headers of that first response.
    /// When both are present they replace any previously stored pair.
    /// Otherwise the error shown on the returned page (or
    /// [`LOGIN_REJECTED_FALLBACK`]) comes back as
    /// [`LoginResult::Rejected`] and the current state is left alone.
    ///
    /// # Errors
    ///
    /// * `LepraError::Request` - the server could not be reached
    /// * `LepraError::Encoding` - a rejection page could not be decoded
    pub fn login(
        &self,
        username: &str,
        password: &str,
        captcha: &str,
        login_code: &str,
    ) -> Result<LoginResult, LepraError> {
        let url = self.endpoint(&["login", ""])?;
        let form = [
            ("user", username),
            ("pass", password),
            ("captcha", captcha),
            ("logincode", login_code),
            ("save", "1"),
        ];

        debug!(%url, user = username, "submitting login form");
        let response = self.client.post(url).form(&form).send()?;

        if let Some(cookies) = extract_session_cookies(response.headers(), self.scope.domain()) {
            self.write_state().establish(cookies);
            info!("login accepted");
            return Ok(LoginResult::Success);
        }

        let status = response.status();
        let html = read_text(response)?;
        let message = self
            .parser
            .extract_login_error(&html)
            .unwrap_or_else(|| LOGIN_REJECTED_FALLBACK.to_string());

        warn!(%status, reason = %message, "login rejected");
        Ok(LoginResult::Rejected { message })
    }

    /// Send an authenticated GET request
    ///
    /// With `validate_status` set, a non-success status is turned into
    /// `LepraError::UpstreamStatus`; otherwise the response is returned as is.
    ///
    /// # Errors
    ///
    /// * `LepraError::NotAuthenticated` - no login yet; nothing was sent
    /// * `LepraError::UpstreamStatus` - non-success status with validation on
    /// * `LepraError::Request` - transport failure
    pub fn authenticated_get(&self, url: Url, validate_status: bool) -> Result<Response, LepraError> {
        self.execute(AuthenticatedRequest::get(url), validate_status)
    }

    /// Send an authenticated request, always validating the status
    ///
    /// # Errors
    ///
    /// Same as [`authenticated_get`](Self::authenticated_get).
    pub fn authenticated_post(&self, request: AuthenticatedRequest) -> Result<Response, LepraError> {
        self.execute(request, true)
    }

    fn execute(
        &self,
        request: AuthenticatedRequest,
        validate_status: bool,
    ) -> Result<Response, LepraError> {
        let Some(cookies) = self.read_state().snapshot() else {
            debug!(url = %request.url, "refusing request without a session");
            return Err(LepraError::NotAuthenticated);
        };

        let AuthenticatedRequest { method, url, form } = request;
        let mut builder = self.client.request(method.clone(), url.clone());
        if self.scope.covers(&url) {
            builder = builder.header(COOKIE, cookies.header_value()?);
        } else {
            debug!(%url, "host outside cookie scope, sending without session");
        }
        if !form.is_empty() {
            builder = builder.form(&form);
        }

        debug!(%method, %url, "sending authenticated request");
        let response = builder.send()?;

        if validate_status && !response.status().is_success() {
            warn!(%method, %url, status = %response.status(), "upstream error");
            return Err(LepraError::UpstreamStatus {
                status: response.status(),
            });
        }

        Ok(response)
    }

    /// GET without session cookies, status validated
    fn public_get(&self, url: Url) -> Result<Response, LepraError> {
        debug!(%url, "sending public request");
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(LepraError::UpstreamStatus {
                status: response.status(),
            });
        }
        Ok(response)
    }

    fn authenticated_text(&self, segments: &[&str]) -> Result<String, LepraError> {
        let url = self.endpoint(segments)?;
        read_text(self.authenticated_get(url, true)?)
    }

    /// Fetch the login page with the captcha and login code
    ///
    /// Does not need a session.
    pub fn get_login_page(&self) -> Result<LoginPageModel, LepraError> {
        let url = self.endpoint(&["login", ""])?;
        let html = read_text(self.public_get(url)?)?;
        self.parser.parse_login_page(&html, &self.base_url)
    }

    /// Fetch the front page
    pub fn get_main_page(&self) -> Result<MainPageModel, LepraError> {
        let html = self.authenticated_text(&[])?;
        self.parser.parse_main_page(&html)
    }

    /// Fetch the user panel counters
    pub fn get_lepro_panel(&self) -> Result<LeproPanelModel, LepraError> {
        let json = self.authenticated_text(&["api", "lepropanel"])?;
        self.parser.parse_lepro_panel(&json)
    }

    /// Fetch one page of the underground listing (first page when `None`)
    pub fn get_underground(&self, page: Option<u32>) -> Result<Vec<SubLepraModel>, LepraError> {
        let page = page.unwrap_or(1).to_string();
        let html = self.authenticated_text(&["underground", "subscribers", &page])?;
        self.parser.parse_underground(&html)
    }

    /// Fetch the democracy page
    pub fn get_democracy_page(&self) -> Result<DemocracyPageModel, LepraError> {
        let html = self.authenticated_text(&["democracy", ""])?;
        self.parser.parse_democracy_page(&html)
    }

    /// Fetch the latest posts starting at offset `page` (zero when `None`)
    ///
    /// This is a POST; retrying it is up to the caller.
    pub fn get_latest_posts(&self, page: Option<u32>) -> Result<Vec<PostModel>, LepraError> {
        let url = self.endpoint(&["idxctl", ""])?;
        let request =
            AuthenticatedRequest::post(url).form_field("from", page.unwrap_or(0).to_string());
        let json = read_text(self.authenticated_post(request)?)?;
        self.parser.parse_posts(&json)
    }

    /// Download an image
    ///
    /// `path` is resolved against the base URL, so both site-relative paths
    /// and absolute URLs work. Images are public: no session is needed and
    /// no cookies are sent.
    pub fn get_image(&self, path: &str) -> Result<Vec<u8>, LepraError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| LepraError::ClientInit(format!("Invalid image path {}: {}", path, e)))?;
        let response = self.public_get(url)?;
        Ok(response.bytes()?.to_vec())
    }
}

fn read_text(response: Response) -> Result<String, LepraError> {
    response.text().map_err(|_| LepraError::Encoding)
}

/// Build an endpoint URL from path segments
fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, LepraError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LepraError::ClientInit("Cannot modify base URL path".to_string()))?
        .clear()
        .extend(segments);
    Ok(url)
}

/// Redirect policy shared by every request
///
/// Chains that start at the login endpoint are never followed, so the
/// `Set-Cookie` headers of the login response stay readable. Everything
/// else is followed up to [`MAX_REDIRECTS`] hops.
fn redirect_policy(login_url: Url) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().first() == Some(&login_url) {
            attempt.stop()
        } else if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

/// Builder for configuring a [`LepraClient`]
///
/// The redirect policy is always replaced: responses from the login
/// endpoint are returned as is, all other redirects are followed.
///
/// # Example
///
/// ```no_run
/// use lepra_client::LepraClient;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LepraClient::builder()
///     .base_url("http://localhost:1234")?
///     .cookie_domain(".leprosorium.ru")
///     .client_builder(
///         reqwest::blocking::Client::builder()
///             .timeout(Duration::from_secs(10))
///     )
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LepraClientBuilder {
    base_url: Option<Url>,
    cookie_domain: Option<String>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
}

impl LepraClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            cookie_domain: None,
            client_builder: None,
        }
    }

    /// Set a custom base URL (a mirror or a mock server)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, LepraError> {
        self.base_url = Some(url.into_url()?);
        Ok(self)
    }

    /// Domain the session cookies must be scoped to (`.leprosorium.ru` by default)
    pub fn cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set a custom HTTP client builder (timeouts, proxies, etc.)
    ///
    /// The redirect policy is overridden regardless of the provided
    /// configuration.
    pub fn client_builder(mut self, builder: reqwest::blocking::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns `LepraError::ClientInit` if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<LepraClient, LepraError> {
        let base_url = self.base_url.unwrap_or_else(|| {
            Url::parse("http://leprosorium.ru/").expect("Default base URL should always be valid")
        });
        let cookie_domain = self
            .cookie_domain
            .unwrap_or_else(|| DEFAULT_COOKIE_DOMAIN.to_string());

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());

        let login_url = endpoint_url(&base_url, &["login", ""])?;
        let client = builder
            .redirect(redirect_policy(login_url))
            .build()
            .map_err(|e| LepraError::ClientInit(e.to_string()))?;

        Ok(LepraClient {
            client,
            scope: CookieScope::new(base_url.clone(), &cookie_domain),
            base_url,
            state: RwLock::new(AuthState::default()),
            parser: ResponseParser::new(),
        })
    }
}

impl Default for LepraClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
