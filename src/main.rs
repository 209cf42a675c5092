use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};

use schoolpick_session::auth::{AuthManager, LogoutNotice, Revalidation, StartupOutcome};
use schoolpick_session::config::{Command, Config, LogFormat};
use schoolpick_session::http_client::ApiClient;
use schoolpick_session::routing::{GuardState, Navigator};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    tracing::debug!(
        api = %config.api_base_url,
        env = ?config.app_env,
        storage = %config.storage_file.display(),
        "Configuration loaded"
    );

    let manager = AuthManager::new(&config)?;

    match command {
        Command::Login { email, password } => run_login(&manager, email, password).await,
        Command::Logout => run_logout(&manager).await,
        Command::Status => {
            print_status(&manager);
            Ok(())
        }
        Command::Validate { path } => run_validate(&manager, &path).await,
        Command::Open { path } => run_open(&manager, &path).await,
        Command::Get { endpoint } => run_get(&manager, &config, &endpoint).await,
    }
}

async fn run_login(
    manager: &AuthManager,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    match manager.login(&email, &password).await {
        Ok(session) => {
            println!("✅ Signed in as {} ({})", session.user.name, session.user.role);
            println!("   Token: {}", session.token_preview());
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Login failed: {}", e);
            anyhow::bail!(e.user_message(&manager.config().api_base_url))
        }
    }
}

async fn run_logout(manager: &AuthManager) -> Result<()> {
    match manager.logout().await {
        LogoutNotice::Sent => println!("👋 Signed out"),
        LogoutNotice::Failed => println!("👋 Signed out locally (server was not notified)"),
        LogoutNotice::Skipped => println!("Not signed in"),
    }
    Ok(())
}

fn print_status(manager: &AuthManager) {
    let store = manager.store();
    if !store.is_available() {
        println!("Session storage is unavailable");
        return;
    }

    match manager.session() {
        Some(session) => {
            let user = &session.user;
            println!("Signed in");
            println!("  Token:      {}", session.token_preview());
            println!("  Name:       {}", user.name);
            println!("  Email:      {}", user.email);
            println!("  Role:       {}", user.role);
            if let Some(department) = &user.department {
                println!("  Department: {}", department);
            }
        }
        None => println!("Not signed in"),
    }
}

async fn run_validate(manager: &AuthManager, path: &str) -> Result<()> {
    let outcome = manager.run_startup_validation(path).await;
    match &outcome {
        StartupOutcome::Skipped => println!("Skipped: {} is a login page", path),
        StartupOutcome::NoSession => println!("No stored session"),
        StartupOutcome::Kept => println!("✅ Session kept"),
        StartupOutcome::ClearedForDevelopment { .. } => {
            println!("Session cleared (development start)")
        }
        StartupOutcome::Cleared { .. } => println!("❌ Session rejected by the server and cleared"),
    }
    if outcome.login_required() {
        println!("Login is required to view {}", path);
    }
    Ok(())
}

/// Prints where the guard wants to go
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn replace(&self, path: &str) {
        println!("→ {}", path);
    }
}

async fn run_open(manager: &AuthManager, path: &str) -> Result<()> {
    let startup = manager.run_startup_validation(path).await;
    tracing::debug!(?startup, "Startup validation finished");

    let mut guard = manager.guard();
    guard.mount(path);
    let mut state = guard.check();

    let mut observer = manager.observe(path);
    let revalidation = observer.settled().await;
    if matches!(revalidation, Revalidation::Cleared { .. }) || startup.login_required() {
        state = guard.reevaluate();
    }
    observer.unmount().await;

    match state {
        GuardState::Allowed | GuardState::Unchecked => {
            println!("✅ {} is open", path);
        }
        GuardState::Blocked => {
            let go = Confirm::new()
                .with_prompt("Login is required for this page. Go to the login page?")
                .default(true)
                .interact()
                .context("Failed to read confirmation")?;
            if go {
                guard.confirm(&ConsoleNavigator);
            } else {
                guard.cancel(&ConsoleNavigator);
            }
        }
        GuardState::NotMounted => {}
    }

    guard.unmount();
    Ok(())
}

async fn run_get(manager: &AuthManager, config: &Config, endpoint: &str) -> Result<()> {
    let client = ApiClient::new(manager.store(), config)?;
    let value: serde_json::Value = client
        .get(endpoint)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message(&config.api_base_url)))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
