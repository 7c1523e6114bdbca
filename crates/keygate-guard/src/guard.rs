//! The per-navigation access decision.

use std::sync::Arc;

use keygate_protocol::{Codec, JsonCodec};
use keygate_session::SessionState;

use crate::{Route, RouteTable};

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Enter the requested route.
    Allow,
    /// Go to this path instead.
    Redirect(String),
}

/// Runs before every navigation.
///
/// Holds the shared session rather than looking one up, so the guard and
/// whoever logs users in always agree on the same state.
pub struct NavigationGuard<C: Codec = JsonCodec> {
    session: Arc<SessionState<C>>,
    routes: RouteTable,
}

impl<C: Codec> NavigationGuard<C> {
    pub fn new(session: Arc<SessionState<C>>, routes: RouteTable) -> Self {
        Self { session, routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn session(&self) -> &Arc<SessionState<C>> {
        &self.session
    }

    /// Decides whether `target` may be entered.
    ///
    /// Re-runs persistence recovery first, so a session written by another
    /// instance (or left by a previous run) is honoured. Then:
    ///
    /// 1. protected route, no session → redirect to login
    /// 2. login or register, with a session → redirect to landing
    /// 3. otherwise allow
    pub fn before_each(&self, target: &Route) -> Navigation {
        let authenticated = match self.session.recover_from_persistence() {
            Ok(outcome) => {
                tracing::trace!(?outcome, route = %target.path, "recovery pass");
                self.session.is_authenticated()
            }
            Err(e) => {
                tracing::warn!(error = %e, route = %target.path, "session recovery failed, treating as signed out");
                false
            }
        };

        if target.requires_auth && !authenticated {
            tracing::debug!(route = %target.path, to = self.routes.login(), "unauthenticated, redirecting");
            return Navigation::Redirect(self.routes.login().to_owned());
        }

        if authenticated && self.routes.is_entry(&target.path) {
            tracing::debug!(route = %target.path, to = self.routes.landing(), "already signed in, redirecting");
            return Navigation::Redirect(self.routes.landing().to_owned());
        }

        Navigation::Allow
    }
}

impl<C: Codec> std::fmt::Debug for NavigationGuard<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationGuard")
            .field("status", &self.session.status())
            .field("routes", &self.routes.routes().len())
            .finish()
    }
}
