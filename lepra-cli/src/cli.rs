//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Browse leprosorium.ru from the terminal
#[derive(Parser, Debug)]
#[command(name = "lepra", about = "Browse leprosorium.ru from the terminal", version)]
pub struct Args {
    /// Base URL of the site (a mirror or a local mock)
    #[arg(long, env = "LEPRA_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout, e.g. "30s" or "1m"
    #[arg(long, value_parser = humantime::parse_duration, global = true)]
    pub timeout: Option<Duration>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// What to fetch
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the login page: login code and captcha
    LoginPage {
        /// Save the captcha image to this file
        #[arg(long)]
        captcha_out: Option<PathBuf>,
    },
    /// Log in and show the front page
    Main(LoginArgs),
    /// Log in and show the panel counters
    Panel(LoginArgs),
    /// Log in and show the democracy page
    Democracy(LoginArgs),
    /// Log in and list underground sub-sites
    Underground {
        #[command(flatten)]
        login: LoginArgs,
        /// Listing page (starts at 1)
        #[arg(long)]
        page: Option<u32>,
    },
    /// Log in and list the latest posts
    Posts {
        #[command(flatten)]
        login: LoginArgs,
        /// Offset to start from
        #[arg(long)]
        page: Option<u32>,
    },
}

/// Credentials for commands that need a session
///
/// The password is read from `LEPRA_PASSWORD` or prompted for.
#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long, env = "LEPRA_USER")]
    pub user: String,

    /// Captcha answer from the login page
    #[arg(short, long)]
    pub captcha: String,

    /// Login code printed by `lepra login-page`
    #[arg(short, long)]
    pub login_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posts_command() {
        let args = Args::try_parse_from([
            "lepra", "posts", "--user", "bob", "--captcha", "x1y2", "--login-code", "abc",
            "--page", "40", "--timeout", "15s", "--json",
        ])
        .unwrap();

        assert!(args.json);
        assert_eq!(args.timeout, Some(Duration::from_secs(15)));
        match args.command {
            Command::Posts { login, page } => {
                assert_eq!(login.user, "bob");
                assert_eq!(login.captcha, "x1y2");
                assert_eq!(login.login_code, "abc");
                assert_eq!(page, Some(40));
            }
            other => panic!("Expected posts command, got {:?}", other),
        }
    }

    #[test]
    fn test_login_page_does_not_need_credentials() {
        let args = Args::try_parse_from(["lepra", "login-page", "--captcha-out", "c.png"]).unwrap();
        match args.command {
            Command::LoginPage { captcha_out } => {
                assert_eq!(captcha_out, Some(PathBuf::from("c.png")));
            }
            other => panic!("Expected login-page command, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_timeout() {
        let result = Args::try_parse_from(["lepra", "--timeout", "soon", "login-page"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_counts() {
        let args = Args::try_parse_from(["lepra", "-vv", "login-page"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
