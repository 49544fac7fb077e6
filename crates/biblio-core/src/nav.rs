//! Route gating.
//!
//! Every screen (a CLI command, in this workspace) declares [`RouteMeta`];
//! [`guard`] decides whether the session may enter it. Redirects are never
//! errors: a role violation sends the user home without a message.

use crate::auth::SessionStore;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// Flags a route (or any route in its matched chain) can set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    pub hide_for_authenticated: bool,
}

impl RouteMeta {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_admin: false,
        hide_for_authenticated: false,
    };

    pub const AUTHENTICATED: Self = Self {
        requires_auth: true,
        ..Self::PUBLIC
    };

    pub const ADMIN: Self = Self {
        requires_auth: true,
        requires_admin: true,
        ..Self::PUBLIC
    };

    /// Login and registration screens.
    pub const GUEST_ONLY: Self = Self {
        hide_for_authenticated: true,
        ..Self::PUBLIC
    };

    /// Folds a matched route chain: a flag is set if any segment sets it.
    pub fn merged(chain: &[RouteMeta]) -> Self {
        chain.iter().fold(Self::default(), |acc, m| Self {
            requires_auth: acc.requires_auth || m.requires_auth,
            requires_admin: acc.requires_admin || m.requires_admin,
            hide_for_authenticated: acc.hide_for_authenticated || m.hide_for_authenticated,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Home,
}

impl Redirect {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::Home => HOME_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Redirect(Redirect),
}

/// Moves the user between screens.
///
/// The request pipeline uses this to send the user to the login screen when
/// the server rejects the session.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// Decides a transition into a route whose matched chain is `matched`.
///
/// Rehydrates the session first if this process has not done so yet. Rules
/// are evaluated in order and the first match wins, so an anonymous user on
/// an admin route goes to login rather than home.
pub fn guard(session: &SessionStore, matched: &[RouteMeta]) -> NavigationDecision {
    session.ensure_rehydrated();

    let meta = RouteMeta::merged(matched);
    let authenticated = session.is_authenticated();

    let decision = if meta.requires_auth && !authenticated {
        NavigationDecision::Redirect(Redirect::Login)
    } else if meta.requires_admin && !session.is_admin() {
        NavigationDecision::Redirect(Redirect::Home)
    } else if meta.hide_for_authenticated && authenticated {
        NavigationDecision::Redirect(Redirect::Home)
    } else {
        NavigationDecision::Allow
    };

    tracing::debug!(?meta, ?decision, "navigation guard");
    decision
}
