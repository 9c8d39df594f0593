// SPDX-License-Identifier: MPL-2.0

use crate::canister::transport::{CallMode, Transport, TransportError};
use crate::canister::wire;
use crate::canister::{CallError, PostCallError};
use async_trait::async_trait;
use candid::{Decode, Encode, Principal};
use std::sync::Arc;

/// Post service operations, in wire terms. The cache layer is written
/// against this trait; tests substitute in-memory fakes.
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn create_post(&self, content: &str) -> Result<wire::Post, PostCallError>;
    async fn get_all_posts(&self) -> Result<Vec<wire::Post>, PostCallError>;
    async fn get_post(&self, id: u64) -> Result<wire::Post, PostCallError>;
    async fn like_post(&self, id: u64) -> Result<wire::Post, PostCallError>;
    async fn unlike_post(&self, id: u64) -> Result<wire::Post, PostCallError>;
    async fn add_comment(&self, id: u64, content: &str) -> Result<wire::Post, PostCallError>;
}

/// Typed binding to the post canister. Wraps the transport so the rest of
/// the crate only sees wire types and tagged errors.
pub struct PostClient {
    transport: Arc<dyn Transport>,
    canister_id: Principal,
}

impl PostClient {
    pub fn new(transport: Arc<dyn Transport>, canister_id: Principal) -> Self {
        Self {
            transport,
            canister_id,
        }
    }

    /// Every post mutation and the single-post query reply with
    /// `variant { ok : Post; err : Error }`.
    async fn call_post_result(
        &self,
        method: &str,
        mode: CallMode,
        args: Vec<u8>,
    ) -> Result<wire::Post, PostCallError> {
        let reply = self
            .transport
            .call(self.canister_id, method, mode, args)
            .await?;
        let result = Decode!(&reply, wire::PostResult)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Result::from(result).map_err(CallError::Service)
    }
}

#[async_trait]
impl PostApi for PostClient {
    async fn create_post(&self, content: &str) -> Result<wire::Post, PostCallError> {
        let args = Encode!(&content).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_post_result("createPost", CallMode::Update, args)
            .await
    }

    async fn get_all_posts(&self) -> Result<Vec<wire::Post>, PostCallError> {
        let args = Encode!().map_err(|e| TransportError::Encode(e.to_string()))?;
        let reply = self
            .transport
            .call(self.canister_id, "getAllPosts", CallMode::Query, args)
            .await?;
        let posts = Decode!(&reply, Vec<wire::Post>)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Ok(posts)
    }

    async fn get_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        let args = Encode!(&candid::Nat::from(id))
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_post_result("getPost", CallMode::Query, args).await
    }

    async fn like_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        let args = Encode!(&candid::Nat::from(id))
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_post_result("likePost", CallMode::Update, args)
            .await
    }

    async fn unlike_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        let args = Encode!(&candid::Nat::from(id))
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_post_result("unlikePost", CallMode::Update, args)
            .await
    }

    async fn add_comment(&self, id: u64, content: &str) -> Result<wire::Post, PostCallError> {
        let args = Encode!(&candid::Nat::from(id), &content)
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_post_result("addComment", CallMode::Update, args)
            .await
    }
}
