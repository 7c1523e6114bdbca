//! Path resolution on top of the guard.

use keygate_protocol::{Codec, JsonCodec};

use crate::route::normalize;
use crate::{GuardError, Navigation, NavigationGuard, Route};

/// Redirects followed before a navigation is declared a loop.
pub const DEFAULT_MAX_HOPS: usize = 8;

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The route finally entered.
    pub route: Route,
    /// The path that was entered, query string included.
    pub path: String,
    /// Every path left behind on the way, in order. Empty if the first
    /// path was entered directly.
    pub redirected_from: Vec<String>,
}

impl Resolved {
    /// `true` if the navigation did not end where it started.
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

/// Resolves paths to routes, applying static redirects and the guard.
#[derive(Debug)]
pub struct Router<C: Codec = JsonCodec> {
    guard: NavigationGuard<C>,
    max_hops: usize,
}

impl<C: Codec> Router<C> {
    pub fn new(guard: NavigationGuard<C>) -> Self {
        Self {
            guard,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Sets how many redirects are followed before giving up.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn guard(&self) -> &NavigationGuard<C> {
        &self.guard
    }

    /// Navigates to `path`.
    ///
    /// # Errors
    /// - [`GuardError::UnknownRoute`] if `path`, or a path redirected to,
    ///   matches no route
    /// - [`GuardError::RedirectLoop`] if more than the hop limit of
    ///   redirects are needed
    pub fn navigate(&self, path: &str) -> Result<Resolved, GuardError> {
        let mut current = path.to_owned();
        let mut redirected_from = Vec::new();

        for _ in 0..=self.max_hops {
            let route = self
                .guard
                .routes()
                .find(&current)
                .ok_or_else(|| GuardError::UnknownRoute(normalize(&current).to_owned()))?;

            let next = match &route.redirect {
                Some(target) => target.clone(),
                None => match self.guard.before_each(route) {
                    Navigation::Redirect(target) => target,
                    Navigation::Allow => {
                        tracing::debug!(path = %current, hops = redirected_from.len(), "navigation resolved");
                        return Ok(Resolved {
                            route: route.clone(),
                            path: current,
                            redirected_from,
                        });
                    }
                },
            };
            redirected_from.push(std::mem::replace(&mut current, next));
        }

        tracing::warn!(from = path, hops = self.max_hops, "redirect loop");
        Err(GuardError::RedirectLoop {
            from: path.to_owned(),
            hops: self.max_hops,
        })
    }
}
