//! Configuration resolution from CLI args

use crate::cli::{Args, Command, LoginArgs};
use crate::error::CliError;
use lepra_client::LepraClient;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

/// What the run should do once the client is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LoginPage { captcha_out: Option<PathBuf> },
    Main,
    Panel,
    Democracy,
    Underground { page: Option<u32> },
    Posts { page: Option<u32> },
}

/// Everything needed to log in
pub struct Credentials {
    pub user: String,
    /// Password (zeroized on drop)
    pub password: Zeroizing<String>,
    pub captcha: String,
    pub login_code: String,
}

/// Resolved runtime configuration
pub struct Config {
    /// Base URL override
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Option<Duration>,
    /// Print JSON instead of text
    pub json: bool,
    /// Action to perform
    pub action: Action,
    /// Present for every action that needs a session
    pub credentials: Option<Credentials>,
}

impl Config {
    /// Build config from CLI args, resolving the password when a login is needed
    pub fn from_args(args: Args) -> Result<Self, CliError> {
        Self::from_args_with(args, resolve_password)
    }

    fn from_args_with(
        args: Args,
        password: impl FnOnce() -> Result<Zeroizing<String>, CliError>,
    ) -> Result<Self, CliError> {
        let (action, login) = split_command(args.command);
        let credentials = match login {
            Some(login) => Some(Credentials {
                user: login.user,
                password: password()?,
                captcha: login.captcha,
                login_code: login.login_code,
            }),
            None => None,
        };

        Ok(Config {
            base_url: args.base_url,
            timeout: args.timeout,
            json: args.json,
            action,
            credentials,
        })
    }

    /// Build a client honoring the base URL and timeout overrides
    pub fn build_client(&self) -> Result<LepraClient, CliError> {
        let mut builder = LepraClient::builder();
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url.as_str())?;
        }
        if let Some(timeout) = self.timeout {
            builder = builder.client_builder(
                reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .use_rustls_tls(),
            );
        }
        Ok(builder.build()?)
    }
}

fn split_command(command: Command) -> (Action, Option<LoginArgs>) {
    match command {
        Command::LoginPage { captcha_out } => (Action::LoginPage { captcha_out }, None),
        Command::Main(login) => (Action::Main, Some(login)),
        Command::Panel(login) => (Action::Panel, Some(login)),
        Command::Democracy(login) => (Action::Democracy, Some(login)),
        Command::Underground { login, page } => (Action::Underground { page }, Some(login)),
        Command::Posts { login, page } => (Action::Posts { page }, Some(login)),
    }
}

/// Password from `LEPRA_PASSWORD`, or prompted for
fn resolve_password() -> Result<Zeroizing<String>, CliError> {
    match std::env::var("LEPRA_PASSWORD") {
        Ok(password) if !password.is_empty() => Ok(Zeroizing::new(password)),
        _ => prompt_password(),
    }
}

/// Prompt user for their password
fn prompt_password() -> Result<Zeroizing<String>, CliError> {
    let password = rpassword::prompt_password("Leprosorium password: ")
        .map_err(|e| CliError::Config(format!("Failed to read password: {}", e)))?;
    if password.is_empty() {
        return Err(CliError::Config("Password is required.".to_string()));
    }
    Ok(Zeroizing::new(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_login_page_needs_no_password() {
        let args = parse(&["lepra", "login-page"]);
        let config = Config::from_args_with(args, || {
            panic!("password must not be requested for login-page")
        })
        .unwrap();

        assert_eq!(config.action, Action::LoginPage { captcha_out: None });
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_underground_resolves_credentials() {
        let args = parse(&[
            "lepra", "underground", "-u", "bob", "-c", "cap", "-l", "code", "--page", "3",
        ]);
        let config =
            Config::from_args_with(args, || Ok(Zeroizing::new("secret".to_string()))).unwrap();

        assert_eq!(config.action, Action::Underground { page: Some(3) });
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.user, "bob");
        assert_eq!(credentials.password.as_str(), "secret");
        assert_eq!(credentials.captcha, "cap");
        assert_eq!(credentials.login_code, "code");
    }

    #[test]
    fn test_password_failure_is_propagated() {
        let args = parse(&["lepra", "panel", "-u", "bob", "-c", "cap", "-l", "code"]);
        let result = Config::from_args_with(args, || {
            Err(CliError::Config("Password is required.".to_string()))
        });
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_build_client_with_overrides() {
        let args = parse(&[
            "lepra",
            "--base-url",
            "http://127.0.0.1:4000",
            "--timeout",
            "5s",
            "login-page",
        ]);
        let config = Config::from_args_with(args, || unreachable!()).unwrap();
        let client = config.build_client().unwrap();

        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:4000/");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_build_client_rejects_bad_url() {
        let args = parse(&["lepra", "--base-url", "::nope::", "login-page"]);
        let config = Config::from_args_with(args, || unreachable!()).unwrap();
        assert!(matches!(config.build_client(), Err(CliError::Http(_))));
    }
}
