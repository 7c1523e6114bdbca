//! Domain API clients. Each one is a fixed set of paths and verbs over a
//! [`Gateway`]; none of them hold state of their own.

use keygate_protocol::{
    AuthResponse, Bond, BondFlow, BondId, BondMetric, Envelope, SignupResponse, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::gateway::decode;
use crate::{Gateway, RequestOptions, Transport};

// =========================================================================
// AuthClient
// =========================================================================

/// Identity provider calls. Meant for an anonymous gateway.
///
/// Returns data only: committing a login to the session is the caller's
/// job, so persistence has exactly one writer.
#[derive(Debug, Clone)]
pub struct AuthClient<T> {
    gateway: Gateway<T>,
}

impl<T: Transport> AuthClient<T> {
    pub fn new(gateway: Gateway<T>) -> Self {
        Self { gateway }
    }

    /// `POST /signup`.
    pub async fn register(&self, email: &str, password: &str) -> Envelope<SignupResponse> {
        self.gateway
            .request_json("/signup", RequestOptions::post(credentials_body(email, password)))
            .await
    }

    /// `POST /token?grant_type=password`.
    ///
    /// A 2xx answer lacking the user or the token is a malformed failure,
    /// never a success.
    pub async fn login(&self, email: &str, password: &str) -> Envelope<AuthResponse> {
        let options = RequestOptions::post(credentials_body(email, password));
        self.gateway
            .request_json::<AuthResponse>("/token?grant_type=password", options)
            .await
            .and_then(|response| {
                if response.is_complete() {
                    Envelope::success(response)
                } else {
                    tracing::warn!("login response missing user or access token");
                    Envelope::malformed("login response missing user or access token")
                }
            })
    }
}

fn credentials_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

// =========================================================================
// BondClient
// =========================================================================

/// CRUD on the `bonds` table. Meant for a credentialed gateway.
#[derive(Debug, Clone)]
pub struct BondClient<T> {
    gateway: Gateway<T>,
}

impl<T: Transport> BondClient<T> {
    pub fn new(gateway: Gateway<T>) -> Self {
        Self { gateway }
    }

    /// `POST /bonds`. Returns the created rows.
    pub async fn create(&self, bond: &Bond) -> Envelope<Vec<Bond>> {
        match serde_json::to_value(bond) {
            Ok(body) => rows(&self.gateway, "/bonds", RequestOptions::post(body)).await,
            Err(e) => Envelope::malformed(format!("bond not encodable: {e}")),
        }
    }

    /// `GET /bonds?user_id=eq.<id>`.
    pub async fn list_by_user(&self, user_id: &UserId) -> Envelope<Vec<Bond>> {
        let path = format!("/bonds?user_id=eq.{}", urlencoding::encode(user_id.as_str()));
        rows(&self.gateway, &path, RequestOptions::get()).await
    }

    /// `PATCH /bonds?id=eq.<id>` with the given column changes. Returns the
    /// updated rows.
    pub async fn update<P: Serialize>(&self, bond_id: &BondId, patch: &P) -> Envelope<Vec<Bond>> {
        let path = by_id("/bonds", "id", bond_id);
        match serde_json::to_value(patch) {
            Ok(body) => rows(&self.gateway, &path, RequestOptions::patch(body)).await,
            Err(e) => Envelope::malformed(format!("bond patch not encodable: {e}")),
        }
    }

    /// `DELETE /bonds?id=eq.<id>`. Returns the deleted rows, or none when
    /// the server answers without a body.
    pub async fn delete(&self, bond_id: &BondId) -> Envelope<Vec<Bond>> {
        let path = by_id("/bonds", "id", bond_id);
        rows(&self.gateway, &path, RequestOptions::delete()).await
    }
}

// =========================================================================
// FlowClient
// =========================================================================

/// Read-only access to a bond's cash flows and metrics. Meant for a
/// credentialed gateway.
#[derive(Debug, Clone)]
pub struct FlowClient<T> {
    gateway: Gateway<T>,
}

impl<T: Transport> FlowClient<T> {
    pub fn new(gateway: Gateway<T>) -> Self {
        Self { gateway }
    }

    /// `GET /bond_flows?bond_id=eq.<id>&order=periodo.asc`.
    ///
    /// The result is ordered by period ascending even if the server ignored
    /// the `order` parameter; equal periods keep the server's order.
    pub async fn flows_by_bond(&self, bond_id: &BondId) -> Envelope<Vec<BondFlow>> {
        let path = format!("{}&order=periodo.asc", by_id("/bond_flows", "bond_id", bond_id));
        rows(&self.gateway, &path, RequestOptions::get())
            .await
            .map(|mut flows: Vec<BondFlow>| {
                flows.sort_by_key(|flow| flow.period);
                flows
            })
    }

    /// `GET /bond_metrics?bond_id=eq.<id>`.
    pub async fn metrics_by_bond(&self, bond_id: &BondId) -> Envelope<Vec<BondMetric>> {
        let path = by_id("/bond_metrics", "bond_id", bond_id);
        rows(&self.gateway, &path, RequestOptions::get()).await
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn by_id(table: &str, column: &str, id: &BondId) -> String {
    format!("{table}?{column}=eq.{}", urlencoding::encode(&id.to_string()))
}

/// Requests a list of rows; a `null` payload (empty body) is no rows.
async fn rows<T: Transport, R: DeserializeOwned>(
    gateway: &Gateway<T>,
    path: &str,
    options: RequestOptions,
) -> Envelope<Vec<R>> {
    gateway.request(path, options).await.and_then(|value| match value {
        Value::Null => Envelope::success(Vec::new()),
        other => decode(other),
    })
}
