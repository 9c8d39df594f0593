// SPDX-License-Identifier: MPL-2.0

use crate::state::SessionState;
use async_trait::async_trait;
use candid::Principal;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("gateway returned status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("encoding error: {0}")]
    Encode(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Read-only calls are served from a node's local state; update calls go
/// through consensus and may mutate canister state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Query,
    Update,
}

/// Raw call seam to the canisters. Implementations move candid blobs;
/// everything typed lives above this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        canister_id: Principal,
        method: &str,
        mode: CallMode,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Posts candid argument blobs to an HTTP gateway in front of the canisters.
///
/// Plain binding: no response certification, no request signing. The session
/// principal rides along as a header so the gateway can attribute the call;
/// update calls are refused locally when nobody is signed in.
pub struct HttpTransport {
    http: reqwest::Client,
    gateway: Url,
    session: Arc<SessionState>,
}

impl HttpTransport {
    pub fn new(gateway: Url, session: Arc<SessionState>) -> Self {
        Self {
            http: reqwest::Client::new(),
            gateway,
            session,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        canister_id: Principal,
        method: &str,
        mode: CallMode,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        let sender = self.session.principal();
        if mode == CallMode::Update && sender.is_none() {
            return Err(TransportError::NotAuthenticated);
        }

        let endpoint = match mode {
            CallMode::Query => "query",
            CallMode::Update => "call",
        };
        let url = self
            .gateway
            .join(&format!("api/canister/{canister_id}/{endpoint}/{method}"))
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut request = self
            .http
            .post(url)
            .header("content-type", "application/octet-stream")
            .body(args);
        if let Some(principal) = sender {
            request = request.header("x-sender", principal);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}
