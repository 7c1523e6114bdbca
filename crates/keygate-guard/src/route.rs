//! Routes and the route table.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A navigable destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Absolute path, e.g. `/bonds/list`.
    pub path: String,

    /// Stable name, e.g. `bond-list`.
    pub name: String,

    /// Whether an authenticated session is needed to enter.
    #[serde(default)]
    pub requires_auth: bool,

    /// Static redirect: entering this route always goes here instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl Route {
    /// A public route.
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            requires_auth: false,
            redirect: None,
        }
    }

    /// Marks the route as needing an authenticated session.
    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Makes the route a static redirect to `target`.
    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// The set of known routes and the three paths the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    routes: Vec<Route>,
    login: String,
    register: String,
    landing: String,
}

impl RouteTable {
    /// An empty table with the given login, register and landing paths.
    pub fn new(
        login: impl Into<String>,
        register: impl Into<String>,
        landing: impl Into<String>,
    ) -> Self {
        Self {
            routes: Vec::new(),
            login: login.into(),
            register: register.into(),
            landing: landing.into(),
        }
    }

    /// Adds a route, replacing any existing route with the same path.
    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.retain(|existing| existing.path != route.path);
        self.routes.push(route);
        self
    }

    /// Looks up a route by path. Query string, fragment and a trailing
    /// slash are ignored.
    pub fn find(&self, path: &str) -> Option<&Route> {
        let path = normalize(path);
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Where unauthenticated visitors to protected routes are sent.
    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn register(&self) -> &str {
        &self.register
    }

    /// Where authenticated visitors to login or register are sent.
    pub fn landing(&self) -> &str {
        &self.landing
    }

    /// `true` for the login and register paths.
    pub fn is_entry(&self, path: &str) -> bool {
        let path = normalize(path);
        path == self.login || path == self.register
    }
}

impl Default for RouteTable {
    /// The application's routes: `/` redirects to `/login`, the auth pages
    /// are public, and every bond page needs a session.
    fn default() -> Self {
        Self::new("/login", "/register", "/bonds/list")
            .with_route(Route::new("/", "home").redirect_to("/login"))
            .with_route(Route::new("/login", "login"))
            .with_route(Route::new("/register", "register"))
            .with_route(Route::new("/bonds/register", "bond-register").protected())
            .with_route(Route::new("/bonds/list", "bond-list").protected())
            .with_route(Route::new("/bonds/flow", "bond-flow").protected())
    }
}

/// Strips query string, fragment and trailing slash (except for `/`).
pub(crate) fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
