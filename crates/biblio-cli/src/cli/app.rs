//! Per-invocation wiring: one session, one navigator, one API client.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, bail};
use biblio_core::api::ApiClient;
use biblio_core::auth::{FileSessionStorage, SessionStore};
use biblio_core::config::Config;
use biblio_core::nav::{self, HOME_PATH, LOGIN_PATH, NavigationDecision, Navigator, Redirect, RouteMeta};

/// Navigator for a terminal: there are no screens to switch, so redirects
/// are recorded and the login redirect is announced on stderr.
#[derive(Debug)]
pub struct TerminalNavigator {
    current: Mutex<String>,
}

impl TerminalNavigator {
    fn new() -> Self {
        Self {
            current: Mutex::new(HOME_PATH.to_string()),
        }
    }

    /// Moves without announcing anything; used for guard outcomes.
    fn navigate_quietly(&self, path: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
    }
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        if path == LOGIN_PATH {
            eprintln!("Your session has expired. Run `biblio login` to sign in again.");
        }
    }
}

pub struct App {
    pub session: Arc<SessionStore>,
    pub navigator: Arc<TerminalNavigator>,
    pub api: Arc<ApiClient>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(FileSessionStorage::at_default_path()?);
        let session = Arc::new(SessionStore::new(storage));
        let navigator = Arc::new(TerminalNavigator::new());
        let api = Arc::new(ApiClient::new(
            &config,
            Arc::clone(&session),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        )?);
        Ok(Self {
            session,
            navigator,
            api,
        })
    }

    /// Runs the navigation guard for the screen at `path`.
    pub fn navigate(&self, path: &str, route: RouteMeta) -> NavigationDecision {
        let decision = nav::guard(&self.session, &[route]);
        let target = match decision {
            NavigationDecision::Allow => path,
            NavigationDecision::Redirect(redirect) => redirect.path(),
        };
        self.navigator.navigate_quietly(target);
        decision
    }

    /// Like [`navigate`](Self::navigate), but a redirect aborts the command.
    pub fn enter(&self, path: &str, route: RouteMeta) -> Result<()> {
        match self.navigate(path, route) {
            NavigationDecision::Allow => Ok(()),
            NavigationDecision::Redirect(Redirect::Login) => {
                bail!("not logged in; run `biblio login` first")
            }
            NavigationDecision::Redirect(Redirect::Home) => bail!("permission denied"),
        }
    }
}
