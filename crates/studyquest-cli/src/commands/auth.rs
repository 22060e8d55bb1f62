use std::io::{BufRead, Write};

use clap::Subcommand;
use studyquest_core::{AuthStore, Config, HttpStudyApi};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in and store the token
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to STUDYQUEST_PASSWORD, then a prompt)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored token and profile
    Logout,
    /// Show whether a user is logged in
    Status,
    /// Fetch the current profile from the backend and cache it
    Whoami {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = AuthStore::open_default()?;
    match action {
        AuthAction::Login { email, password } => {
            let password = match password.or_else(|| std::env::var("STUDYQUEST_PASSWORD").ok()) {
                Some(p) => p,
                None => prompt_password()?,
            };
            let config = Config::load()?;
            let session = HttpStudyApi::login(&config.api, &email, &password).await?;
            store.save(&session)?;
            println!(
                "logged in as {}",
                session.user.username.as_deref().unwrap_or(&email)
            );
        }
        AuthAction::Logout => {
            store.clear()?;
            println!("logged out");
        }
        AuthAction::Status => match store.load()? {
            Some(session) => println!(
                "logged in as {}",
                session
                    .user
                    .username
                    .or(session.user.email)
                    .unwrap_or(session.user.id)
            ),
            None => println!("not logged in"),
        },
        AuthAction::Whoami { json } => {
            let config = Config::load()?;
            let session = store.require()?;
            let api = HttpStudyApi::new(&config.api, &session)?;
            let user = api.profile().await?;
            let session = store.update_profile(user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session.user)?);
            } else {
                let user = &session.user;
                println!("id:       {}", user.id);
                println!("username: {}", user.username.as_deref().unwrap_or("-"));
                println!("email:    {}", user.email.as_deref().unwrap_or("-"));
                println!("role:     {}", user.role.as_deref().unwrap_or("-"));
                println!(
                    "level:    {}",
                    user.level.map_or_else(|| "-".to_string(), |l| l.to_string())
                );
                println!(
                    "xp:       {}",
                    user.xp.map_or_else(|| "-".to_string(), |x| x.to_string())
                );
            }
        }
    }
    Ok(())
}

fn prompt_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err("password required".into());
    }
    Ok(password)
}
