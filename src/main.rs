//! imagefeed - Unsplash photo feed from the terminal
#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use imagefeed::auth::oauth;
use imagefeed::{App, Config, EncryptedFileStore, PageFetch};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    match parse_args()? {
        Command::Auth { code } => auth_flow(code.as_deref()).await,
        Command::Feed { pages } => feed_cli(pages).await,
        Command::Like { photo_id, liked } => like_cli(&photo_id, liked).await,
        Command::Profile => profile_cli().await,
        Command::Logout => logout_cli(),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Auth { code: Option<String> },
    Feed { pages: u32 },
    Like { photo_id: String, liked: bool },
    Profile,
    Logout,
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "auth" | "login" => Ok(Command::Auth {
            code: args.get(2).cloned(),
        }),

        "feed" => {
            let pages = args
                .iter()
                .position(|a| a == "--pages" || a == "-p")
                .and_then(|i| args.get(i + 1))
                .map(|s| s.parse::<u32>())
                .transpose()
                .context("--pages expects a number")?
                .unwrap_or(1);
            Ok(Command::Feed { pages: pages.max(1) })
        }

        cmd @ ("like" | "unlike") => {
            let photo_id = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing photo id"))?
                .clone();
            Ok(Command::Like {
                photo_id,
                liked: cmd == "like",
            })
        }

        "profile" | "me" => Ok(Command::Profile),
        "logout" => Ok(Command::Logout),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'imagefeed --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"imagefeed - Unsplash photo feed from the terminal

USAGE:
    imagefeed [COMMAND]

COMMANDS:
    auth [code | redirect-url]         Sign in with your Unsplash account
      Without an argument the login page is opened and the code is
      read from stdin.

    feed [OPTIONS]                     List photos from the feed
      Options:
        -p, --pages <n>                Number of pages to load (default: 1)

    like <photo-id>                    Like a photo
    unlike <photo-id>                  Remove a like
    profile                            Show the signed-in profile
    logout                             Forget the stored token

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    {}    OAuth access key (overrides config)
    {}    OAuth secret key (overrides config)
    RUST_LOG                           Log filter (default: warn)

CONFIG:
    {}
"#,
        imagefeed::config::ACCESS_KEY_ENV,
        imagefeed::config::SECRET_KEY_ENV,
        config_path
    );
}

fn print_version() {
    println!("imagefeed {}", imagefeed::VERSION);
}

fn open_app() -> Result<App> {
    let config = Config::load()?;
    let store = EncryptedFileStore::new(imagefeed::paths::credentials_path()?);
    Ok(App::new(config, Arc::new(store))?)
}

fn require_login(app: &App) -> Result<()> {
    anyhow::ensure!(
        app.is_authorized(),
        "Not signed in. Run: imagefeed auth"
    );
    Ok(())
}

async fn auth_flow(code: Option<&str>) -> Result<()> {
    let app = open_app()?;
    app.config().ensure_client_credentials()?;

    let input = if let Some(code) = code {
        code.to_string()
    } else {
        let auth_url = app.authorize_url();
        println!("Open this URL in your browser:\n\n  {}\n", auth_url);

        // Try to open browser
        let _ = open::that(&auth_url);

        println!("Paste the authorization code (or the page URL) here:");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        line.trim().to_string()
    };

    let code = oauth::code_from_redirect(&input).unwrap_or(input);
    anyhow::ensure!(!code.is_empty(), "No authorization code given");

    app.sign_in(&code)
        .await
        .context("Token exchange failed")?;
    println!("✓ Signed in");

    match app.load_profile().await {
        Ok(profile) => println!("✓ Logged in as {}", profile.login_name),
        Err(e) => println!("Signed in, but the profile could not be loaded: {e}"),
    }

    Ok(())
}

async fn feed_cli(pages: u32) -> Result<()> {
    let app = open_app()?;
    require_login(&app)?;

    for _ in 0..pages {
        match app.feed().fetch_next_page().await {
            Ok(PageFetch::Loaded { added: 0, .. }) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{e}\n{}", e.recovery_suggestion());
                return Err(e.into());
            }
        }
    }

    let photos = app.feed().photos();
    if photos.is_empty() {
        println!("No photos.");
        return Ok(());
    }

    for photo in photos {
        let heart = if photo.is_liked { "♥" } else { " " };
        println!(
            "{} {}  {}x{}  {}",
            heart, photo.id, photo.size.width, photo.size.height, photo.thumbnail_url
        );
        if let Some(description) = &photo.description {
            println!("    {}", description);
        }
    }

    Ok(())
}

async fn like_cli(photo_id: &str, liked: bool) -> Result<()> {
    let app = open_app()?;
    require_login(&app)?;

    app.feed()
        .set_like(photo_id, liked)
        .await
        .with_context(|| format!("Could not update like for {photo_id}"))?;

    if liked {
        println!("♥ Liked {}", photo_id);
    } else {
        println!("✓ Unliked {}", photo_id);
    }
    Ok(())
}

async fn profile_cli() -> Result<()> {
    let app = open_app()?;
    require_login(&app)?;

    let profile = app.load_profile().await?;
    println!("{} ({})", profile.name, profile.login_name);
    if let Some(bio) = &profile.bio {
        println!("{}", bio);
    }
    if let Some(avatar) = app.avatar().avatar_url() {
        println!("Avatar: {}", avatar);
    }
    Ok(())
}

fn logout_cli() -> Result<()> {
    let app = open_app()?;
    app.logout()?;
    println!("✓ Logged out");
    Ok(())
}
