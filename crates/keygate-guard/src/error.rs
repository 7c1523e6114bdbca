//! Error types for route resolution.

/// Errors from [`Router::navigate`](crate::Router::navigate).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// No route is registered for this path.
    #[error("no route for {0}")]
    UnknownRoute(String),

    /// Redirects kept bouncing past the hop limit.
    #[error("redirect loop starting at {from} (gave up after {hops} hops)")]
    RedirectLoop { from: String, hops: usize },
}
