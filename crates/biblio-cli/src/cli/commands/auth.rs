//! Login, logout and whoami.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use biblio_core::auth::token;
use biblio_core::nav::{LOGIN_PATH, NavigationDecision, RouteMeta};
use biblio_types::Credentials;
use biblio_types::catalog::position;

use crate::cli::app::App;

pub async fn login(app: &App, username: &str, password: Option<String>) -> Result<()> {
    if let NavigationDecision::Redirect(_) = app.navigate(LOGIN_PATH, RouteMeta::GUEST_ONLY) {
        let user = app.session.current_user().unwrap_or_default();
        println!("Already logged in as {}", user.username);
        return Ok(());
    }

    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let credentials = Credentials::new(username.trim(), password);

    if !app.session.login(app.api.as_ref(), &credentials).await {
        bail!("{}", app.session.error());
    }

    let session = app.session.snapshot();
    let user = session.user.unwrap_or_default();
    println!("Logged in as {} ({})", user.username, user.email);
    Ok(())
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password is required");
    }
    Ok(password)
}

pub fn logout(app: &App) {
    app.session.ensure_rehydrated();
    let was_logged_in = app.session.is_logged_in();
    app.session.logout();
    if was_logged_in {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
}

pub fn whoami(app: &App) -> Result<()> {
    app.enter("/", RouteMeta::AUTHENTICATED)?;

    let session = app.session.snapshot();
    let user = session.user.clone().unwrap_or_default();
    let user_type = match position(&user.user_type) {
        Some(p) => format!("{} ({})", p.code, p.description),
        None if session.is_admin() => format!("{} (Administrador)", user.user_type),
        None => user.user_type.clone(),
    };
    let roles: Vec<&str> = session.roles.iter().map(String::as_str).collect();

    println!("Username: {}", user.username);
    println!("Email:    {}", user.email);
    println!("Type:     {user_type}");
    println!("Roles:    {}", roles.join(", "));
    if let Some(expires) = token::expires_at(&session.token) {
        println!("Expires:  {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    tracing::debug!(token = %token::mask_token(&session.token), "whoami");
    Ok(())
}
