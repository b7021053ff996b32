//! Session cookies and authentication state

use crate::error::LepraError;
use cookie::Cookie;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use std::fmt;
use zeroize::Zeroize;

/// Name of the cookie carrying the session id
pub const SESSION_ID_COOKIE: &str = "lepro.sid";

/// Name of the cookie carrying the user id
pub const USER_ID_COOKIE: &str = "lepro.uid";

/// Domain the service scopes its session cookies to
pub const DEFAULT_COOKIE_DOMAIN: &str = ".leprosorium.ru";

/// A single name/value session cookie
///
/// The value is wiped from memory when the cookie is dropped and is never
/// printed by the `Debug` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: String,
    value: String,
}

impl SessionCookie {
    /// Create a cookie from its name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Cookie name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Drop for SessionCookie {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// The pair of cookies that identifies a logged-in user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookies {
    /// `lepro.sid`
    pub session: SessionCookie,
    /// `lepro.uid`
    pub user: SessionCookie,
}

impl SessionCookies {
    /// Build the `Cookie` request header carrying exactly both cookies
    ///
    /// The header is marked sensitive and the temporary string is zeroized.
    pub(crate) fn header_value(&self) -> Result<HeaderValue, LepraError> {
        let mut cookie_string = format!(
            "{}={}; {}={}",
            self.session.name, self.session.value, self.user.name, self.user.value
        );
        let header_value = HeaderValue::from_bytes(cookie_string.as_bytes());
        cookie_string.zeroize();

        let mut header_value = header_value
            .map_err(|_| LepraError::ClientInit("Invalid session cookie format".to_string()))?;
        header_value.set_sensitive(true);
        Ok(header_value)
    }
}

/// In-memory authentication state
///
/// Being authenticated is the same thing as holding a complete cookie pair,
/// so a flag without cookies cannot be represented.
#[derive(Debug, Default)]
pub(crate) struct AuthState {
    cookies: Option<SessionCookies>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.cookies.is_some()
    }

    /// Replace whatever was stored with a freshly extracted pair
    pub fn establish(&mut self, cookies: SessionCookies) {
        self.cookies = Some(cookies);
    }

    pub fn clear(&mut self) {
        self.cookies = None;
    }

    /// Copy of the current pair, if any
    pub fn snapshot(&self) -> Option<SessionCookies> {
        self.cookies.clone()
    }
}

/// Where session cookies may be sent
///
/// Requests to the configured base origin, or to any host inside the cookie
/// domain, carry the cookies. Anything else goes out without them.
#[derive(Clone, Debug)]
pub(crate) struct CookieScope {
    origin: Url,
    domain: String,
}

impl CookieScope {
    pub fn new(origin: Url, domain: &str) -> Self {
        Self {
            origin,
            domain: normalize_domain(domain),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn covers(&self, url: &Url) -> bool {
        if url.origin() == self.origin.origin() {
            return true;
        }
        match url.host_str() {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                host == self.domain || host.ends_with(&format!(".{}", self.domain))
            }
            None => false,
        }
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Extract the session cookie pair from the `Set-Cookie` headers of a response
///
/// Every header value is split into cookie lines, each line is parsed, and
/// cookies are picked by name. Both cookies must be present, non-empty and
/// carry a `domain` attribute equal to `cookie_domain`. Returns `None`
/// otherwise; other cookies are ignored.
pub(crate) fn extract_session_cookies(
    headers: &HeaderMap,
    cookie_domain: &str,
) -> Option<SessionCookies> {
    let domain = normalize_domain(cookie_domain);
    let mut session = None;
    let mut user = None;

    for value in headers.get_all(SET_COOKIE) {
        // Non-ASCII bytes in an unrelated cookie must not hide the pair
        let raw = String::from_utf8_lossy(value.as_bytes());

        for line in split_cookie_lines(&raw) {
            let Ok(parsed) = Cookie::parse(line) else {
                continue;
            };
            if parsed.value().is_empty() {
                continue;
            }
            let in_domain = parsed
                .domain()
                .is_some_and(|d| normalize_domain(d) == domain);
            if !in_domain {
                continue;
            }

            match parsed.name() {
                SESSION_ID_COOKIE => {
                    session = Some(SessionCookie::new(SESSION_ID_COOKIE, parsed.value()))
                }
                USER_ID_COOKIE => user = Some(SessionCookie::new(USER_ID_COOKIE, parsed.value())),
                _ => {}
            }
        }
    }

    Some(SessionCookies {
        session: session?,
        user: user?,
    })
}

/// Split a possibly comma-folded `Set-Cookie` value into single cookie lines
///
/// A comma only starts a new cookie when the text after it begins with a
/// `name=` pair, which keeps `expires=Wed, 21 Oct 2015 ...` dates intact.
///
/// Cookie values cannot contain commas (RFC 6265, section 4.1.1). A value
/// such as `a,b=c` is therefore cut at the comma, and the cookie loses the
/// attributes that followed it.
fn split_cookie_lines(raw: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (idx, _) in raw.match_indices(',') {
        if starts_new_cookie(&raw[idx + 1..]) {
            lines.push(raw[start..idx].trim());
            start = idx + 1;
        }
    }
    lines.push(raw[start..].trim());

    lines.retain(|line| !line.is_empty());
    lines
}

fn starts_new_cookie(rest: &str) -> bool {
    let head = rest.split(';').next().unwrap_or_default();
    match head.split_once('=') {
        Some((name, _)) => {
            let name = name.trim();
            !name.is_empty() && !name.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_folded_header_in_legacy_format() {
        let map = headers(&[
            "lepro.sid=abc123; domain=.leprosorium.ru; path=/,  lepro.uid=42; domain=.leprosorium.ru; path=/,",
        ]);
        let cookies = extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).unwrap();
        assert_eq!(cookies.session.value(), "abc123");
        assert_eq!(cookies.user.value(), "42");
    }

    #[test]
    fn test_separate_headers_in_any_order() {
        let map = headers(&[
            "lepro.uid=42; domain=.leprosorium.ru; path=/",
            "tracking=zzz; path=/",
            "lepro.sid=abc123; domain=.leprosorium.ru; path=/",
        ]);
        let cookies = extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).unwrap();
        assert_eq!(cookies.session.name(), SESSION_ID_COOKIE);
        assert_eq!(cookies.session.value(), "abc123");
        assert_eq!(cookies.user.name(), USER_ID_COOKIE);
        assert_eq!(cookies.user.value(), "42");
    }

    #[test]
    fn test_expires_date_does_not_split_cookie() {
        let lines = split_cookie_lines(
            "lepro.sid=a; expires=Wed, 21 Oct 2015 07:28:00 GMT; domain=.leprosorium.ru, lepro.uid=b; domain=.leprosorium.ru",
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("21 Oct 2015"));
        assert!(lines[1].starts_with("lepro.uid=b"));
    }

    #[test]
    fn test_non_ascii_neighbour_cookie_is_skipped() {
        let mut map = HeaderMap::new();
        map.append(
            SET_COOKIE,
            HeaderValue::from_bytes(
                "lepro.sid=abc; domain=.leprosorium.ru; path=/,  lepro.uid=42; domain=.leprosorium.ru; path=/, pref=café; path=/"
                    .as_bytes(),
            )
            .unwrap(),
        );
        map.append(
            SET_COOKIE,
            HeaderValue::from_bytes(b"theme=caf\xe9; path=/").unwrap(),
        );

        let cookies = extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).unwrap();
        assert_eq!(cookies.session.value(), "abc");
        assert_eq!(cookies.user.value(), "42");
    }

    #[test]
    fn test_comma_in_value_splits_cookie() {
        let raw = "lepro.sid=a,b=c; domain=.leprosorium.ru, lepro.uid=42; domain=.leprosorium.ru";
        let lines = split_cookie_lines(raw);
        assert_eq!(
            lines,
            vec!["lepro.sid=a", "b=c; domain=.leprosorium.ru", "lepro.uid=42; domain=.leprosorium.ru"]
        );
        assert!(extract_session_cookies(&headers(&[raw]), DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_missing_user_cookie() {
        let map = headers(&["lepro.sid=abc123; domain=.leprosorium.ru; path=/"]);
        assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_empty_value_is_rejected() {
        let map = headers(&[
            "lepro.sid=; domain=.leprosorium.ru; path=/",
            "lepro.uid=42; domain=.leprosorium.ru; path=/",
        ]);
        assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_foreign_domain_is_rejected() {
        let map = headers(&[
            "lepro.sid=abc; domain=.example.com; path=/",
            "lepro.uid=42; domain=.example.com; path=/",
        ]);
        assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_missing_domain_is_rejected() {
        let map = headers(&["lepro.sid=abc; path=/", "lepro.uid=42; path=/"]);
        assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_empty_header_is_rejected() {
        let map = headers(&[""]);
        assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
        assert!(extract_session_cookies(&HeaderMap::new(), DEFAULT_COOKIE_DOMAIN).is_none());
    }

    #[test]
    fn test_cookie_header_carries_exactly_two_cookies() {
        let cookies = SessionCookies {
            session: SessionCookie::new(SESSION_ID_COOKIE, "abc"),
            user: SessionCookie::new(USER_ID_COOKIE, "42"),
        };
        let header = cookies.header_value().unwrap();
        assert!(header.is_sensitive());

        let pairs: Vec<&str> = header.to_str().unwrap().split("; ").collect();
        assert_eq!(pairs, vec!["lepro.sid=abc", "lepro.uid=42"]);
    }

    #[test]
    fn test_debug_redacts_value() {
        let cookie = SessionCookie::new(SESSION_ID_COOKIE, "supersecret");
        let printed = format!("{:?}", cookie);
        assert!(!printed.contains("supersecret"));
        assert!(printed.contains(SESSION_ID_COOKIE));
    }

    #[test]
    fn test_cookie_scope() {
        let scope = CookieScope::new(
            Url::parse("http://127.0.0.1:8080/").unwrap(),
            DEFAULT_COOKIE_DOMAIN,
        );
        assert!(scope.covers(&Url::parse("http://127.0.0.1:8080/api/lepropanel").unwrap()));
        assert!(scope.covers(&Url::parse("http://leprosorium.ru/").unwrap()));
        assert!(scope.covers(&Url::parse("http://pics.leprosorium.ru/a.png").unwrap()));
        assert!(!scope.covers(&Url::parse("http://127.0.0.1:9090/").unwrap()));
        assert!(!scope.covers(&Url::parse("http://notleprosorium.ru/").unwrap()));
        assert!(!scope.covers(&Url::parse("http://example.com/").unwrap()));
    }

    #[test]
    fn test_auth_state_lifecycle() {
        let mut state = AuthState::default();
        assert!(!state.is_authenticated());
        assert!(state.snapshot().is_none());

        state.establish(SessionCookies {
            session: SessionCookie::new(SESSION_ID_COOKIE, "s1"),
            user: SessionCookie::new(USER_ID_COOKIE, "u1"),
        });
        assert!(state.is_authenticated());

        state.clear();
        assert!(!state.is_authenticated());
        assert!(state.snapshot().is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_well_formed_header_yields_exact_values(
            sid in "[A-Za-z0-9]{1,64}",
            uid in "[0-9]{1,10}",
        ) {
            let raw = format!(
                "lepro.sid={}; domain=.leprosorium.ru; path=/,  lepro.uid={}; domain=.leprosorium.ru; path=/,",
                sid, uid
            );
            let map = headers(&[raw.as_str()]);
            let cookies = extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN);

            prop_assert!(cookies.is_some());
            let cookies = cookies.unwrap();
            prop_assert_eq!(cookies.session.value(), sid.as_str());
            prop_assert_eq!(cookies.user.value(), uid.as_str());
        }

        #[test]
        fn prop_single_cookie_never_authenticates(
            value in "[A-Za-z0-9]{1,64}",
            which in prop::sample::select(vec![SESSION_ID_COOKIE, USER_ID_COOKIE]),
        ) {
            let raw = format!("{}={}; domain=.leprosorium.ru; path=/", which, value);
            let map = headers(&[raw.as_str()]);
            prop_assert!(extract_session_cookies(&map, DEFAULT_COOKIE_DOMAIN).is_none());
        }
    }
}
