//! Leprosorium CLI - fetch pages from leprosorium.ru in the terminal

mod cli;
mod config;
mod error;
mod output;

use clap::Parser;
use cli::Args;
use config::{Action, Config, Credentials};
use lepra_client::{LepraClient, LoginResult};
use output::OutputFormatter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), error::CliError> {
    let config = Config::from_args(args)?;
    let client = config.build_client()?;
    let formatter = OutputFormatter::new(config.json);

    if let Some(credentials) = &config.credentials {
        login(&client, credentials)?;
    }

    match &config.action {
        Action::LoginPage { captcha_out } => {
            let page = client.get_login_page()?;
            if let Some(path) = captcha_out {
                let image = client.get_image(&page.captcha_url)?;
                std::fs::write(path, image)?;
                info!(path = %path.display(), "captcha saved");
            }
            formatter.print(&page)
        }
        Action::Main => formatter.print(&client.get_main_page()?),
        Action::Panel => formatter.print(&client.get_lepro_panel()?),
        Action::Democracy => formatter.print(&client.get_democracy_page()?),
        Action::Underground { page } => formatter.print(&client.get_underground(*page)?),
        Action::Posts { page } => formatter.print(&client.get_latest_posts(*page)?),
    }
}

/// Log in, turning a rejection into an error
fn login(client: &LepraClient, credentials: &Credentials) -> Result<(), error::CliError> {
    debug!(user = %credentials.user, "logging in");
    match client.login(
        &credentials.user,
        &credentials.password,
        &credentials.captcha,
        &credentials.login_code,
    )? {
        LoginResult::Success => Ok(()),
        LoginResult::Rejected { message } => Err(error::CliError::LoginRejected(message)),
    }
}

/// Log to stderr, honoring `RUST_LOG` and raising the default level with `-v`
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
