//! `Keygate` builder and application root.
//!
//! The root owns the one [`SessionState`] and hands the same store to the
//! guard and to every credentialed client. It is also the only place a
//! login is committed.

use std::sync::Arc;

use keygate_gateway::{
    AuthClient, BondClient, FlowClient, Gateway, GatewayConfig, ReqwestTransport, Transport,
};
use keygate_guard::{NavigationGuard, Resolved, RouteTable, Router};
use keygate_protocol::{Bond, Envelope, SignupResponse, User, UserId};
use keygate_session::{RecoveryOutcome, SessionState, SessionStatus};
use keygate_store::{FileStore, SessionStore};

use crate::{KeygateConfig, KeygateError};

/// `Prefer` value sent to the resource API so writes echo the rows.
const RETURN_REPRESENTATION: &str = "return=representation";

/// Builder for a [`Keygate`] root.
///
/// # Example
///
/// ```rust,no_run
/// use keygate::prelude::*;
///
/// # fn main() -> Result<(), KeygateError> {
/// let app = Keygate::builder(KeygateConfig::from_env()?).build()?;
/// println!("{}", app.status());
/// # Ok(())
/// # }
/// ```
pub struct KeygateBuilder {
    config: KeygateConfig,
    store: Option<Arc<dyn SessionStore>>,
    routes: RouteTable,
}

impl KeygateBuilder {
    pub fn new(config: KeygateConfig) -> Self {
        Self {
            config,
            store: None,
            routes: RouteTable::default(),
        }
    }

    /// Uses `store` instead of opening a [`FileStore`].
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the application's route table.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Builds the root over HTTP with `reqwest`.
    ///
    /// # Errors
    /// Fails on invalid configuration, when the session file cannot be
    /// opened, or when the HTTP client cannot be created.
    pub fn build(self) -> Result<Keygate, KeygateError> {
        let transport = match self.config.request_timeout() {
            Some(timeout) => ReqwestTransport::with_timeout(timeout)?,
            None => ReqwestTransport::new(),
        };
        self.build_with_transport(transport)
    }

    /// Builds the root over a caller-supplied transport.
    ///
    /// Validates the configuration, opens the store, then recovers any
    /// persisted session before returning.
    ///
    /// # Errors
    /// Fails on invalid configuration or when the session file cannot be
    /// opened. A corrupt persisted session is not an error; it is cleared.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Keygate<T>, KeygateError> {
        self.config.validate()?;

        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None => {
                let store = match self.config.session_store_path() {
                    Some(path) => FileStore::open(path)?,
                    None => FileStore::open_default()?,
                };
                tracing::debug!(path = %store.path().display(), "session store opened");
                Arc::new(store)
            }
        };

        let transport = Arc::new(transport);
        let api_key = self.config.api_key();
        let auth = Gateway::anonymous(
            GatewayConfig::new(self.config.auth_url(), api_key),
            Arc::clone(&transport),
        );
        let rest = Gateway::credentialed(
            GatewayConfig::new(self.config.rest_url(), api_key).prefer(RETURN_REPRESENTATION),
            Arc::clone(&store),
            transport,
        );

        let session = Arc::new(SessionState::new(Arc::clone(&store)));
        let router = Router::new(NavigationGuard::new(Arc::clone(&session), self.routes));

        let app = Keygate {
            config: self.config,
            store,
            session,
            auth: AuthClient::new(auth),
            bonds: BondClient::new(rest.clone()),
            flows: FlowClient::new(rest),
            router,
        };
        app.boot()?;
        tracing::info!(provider = app.config.provider_url(), status = %app.status(), "keygate ready");
        Ok(app)
    }
}

/// The application root.
pub struct Keygate<T: Transport = ReqwestTransport> {
    config: KeygateConfig,
    store: Arc<dyn SessionStore>,
    session: Arc<SessionState>,
    auth: AuthClient<T>,
    bonds: BondClient<T>,
    flows: FlowClient<T>,
    router: Router,
}

impl Keygate {
    /// Starts building a root from `config`.
    pub fn builder(config: KeygateConfig) -> KeygateBuilder {
        KeygateBuilder::new(config)
    }
}

impl<T: Transport> Keygate<T> {
    /// Restores the session persisted by a previous run, if any.
    ///
    /// Called by the builder; calling it again is harmless.
    ///
    /// # Errors
    /// Only when clearing a corrupt session fails in the store.
    pub fn boot(&self) -> Result<RecoveryOutcome, KeygateError> {
        let outcome = self.session.recover_from_persistence()?;
        tracing::debug!(?outcome, "boot recovery");
        Ok(outcome)
    }

    /// Logs in and, on success, commits the session.
    ///
    /// A remote failure (bad password, unreachable provider, incomplete
    /// answer) comes back as a failed envelope and leaves the session as
    /// it was.
    ///
    /// # Errors
    /// Only when the session cannot be persisted.
    pub async fn login(&self, email: &str, password: &str) -> Result<Envelope<User>, KeygateError> {
        let response = match self.auth.login(email, password).await {
            Envelope::Success(response) => response,
            Envelope::Failure(failure) => {
                tracing::warn!(error = %failure, "login failed");
                return Ok(Envelope::Failure(failure));
            }
        };

        let user = response.user.clone();
        self.session.commit_login(response)?;
        tracing::info!("login succeeded");
        Ok(user.map_or_else(
            || Envelope::malformed("login response missing user"),
            Envelope::success,
        ))
    }

    /// Registers a new account. Does not sign in.
    pub async fn register(&self, email: &str, password: &str) -> Envelope<SignupResponse> {
        let envelope = self.auth.register(email, password).await;
        match &envelope {
            Envelope::Success(_) => tracing::info!("registration accepted"),
            Envelope::Failure(failure) => tracing::warn!(error = %failure, "registration failed"),
        }
        envelope
    }

    /// Clears the session in memory and in the store.
    ///
    /// # Errors
    /// When a slot cannot be removed; memory is cleared regardless.
    pub fn logout(&self) -> Result<(), KeygateError> {
        self.session.logout()?;
        tracing::info!("logged out");
        Ok(())
    }

    /// The signed-in user's id, from memory or, failing that, the store.
    pub fn current_user_id(&self) -> Option<UserId> {
        self.session.current_user_id()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Resolves `path` through the route table and the guard.
    ///
    /// # Errors
    /// Unknown paths and redirect loops.
    pub fn navigate(&self, path: &str) -> Result<Resolved, KeygateError> {
        Ok(self.router.navigate(path)?)
    }

    /// Lists the signed-in user's bonds.
    ///
    /// # Errors
    /// [`KeygateError::NotSignedIn`] when no user id can be resolved.
    pub async fn my_bonds(&self) -> Result<Envelope<Vec<Bond>>, KeygateError> {
        let owner = self.current_user_id().ok_or(KeygateError::NotSignedIn)?;
        Ok(self.bonds.list_by_user(&owner).await)
    }

    /// Starts a bond owned by the signed-in user.
    ///
    /// # Errors
    /// [`KeygateError::NotSignedIn`] when no user id can be resolved.
    pub fn new_bond(&self) -> Result<Bond, KeygateError> {
        let owner = self.current_user_id().ok_or(KeygateError::NotSignedIn)?;
        Ok(Bond::new(owner))
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn auth(&self) -> &AuthClient<T> {
        &self.auth
    }

    pub fn bonds(&self) -> &BondClient<T> {
        &self.bonds
    }

    pub fn flows(&self) -> &FlowClient<T> {
        &self.flows
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &KeygateConfig {
        &self.config
    }
}

impl<T: Transport> std::fmt::Debug for Keygate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keygate")
            .field("provider", &self.config.provider_url())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
