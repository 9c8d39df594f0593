// SPDX-License-Identifier: MPL-2.0

use crate::canister::transport::{CallMode, Transport, TransportError};
use crate::canister::wire;
use crate::canister::{CallError, ProfileCallError};
use async_trait::async_trait;
use candid::{Decode, Encode, Principal};
use std::sync::Arc;

/// Profile service operations, in wire terms.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn register_user(
        &self,
        profile: wire::UserProfile,
    ) -> Result<wire::UserProfile, ProfileCallError>;
    async fn get_profile(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError>;
    async fn update_profile(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<wire::UserProfile, ProfileCallError>;
    async fn follow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError>;
    async fn unfollow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError>;
    async fn get_followers(&self, id: Principal)
    -> Result<Vec<wire::UserProfile>, ProfileCallError>;
    async fn get_following(&self, id: Principal)
    -> Result<Vec<wire::UserProfile>, ProfileCallError>;
}

/// Typed binding to the profile canister.
pub struct ProfileClient {
    transport: Arc<dyn Transport>,
    canister_id: Principal,
}

impl ProfileClient {
    pub fn new(transport: Arc<dyn Transport>, canister_id: Principal) -> Self {
        Self {
            transport,
            canister_id,
        }
    }

    async fn call_profile_result(
        &self,
        method: &str,
        mode: CallMode,
        args: Vec<u8>,
    ) -> Result<wire::UserProfile, ProfileCallError> {
        let reply = self
            .transport
            .call(self.canister_id, method, mode, args)
            .await?;
        let result = Decode!(&reply, wire::ProfileResult)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Result::from(result).map_err(CallError::Service)
    }

    async fn call_profile_list(
        &self,
        method: &str,
        args: Vec<u8>,
    ) -> Result<Vec<wire::UserProfile>, ProfileCallError> {
        let reply = self
            .transport
            .call(self.canister_id, method, CallMode::Query, args)
            .await?;
        let result = Decode!(&reply, wire::ProfileListResult)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Result::from(result).map_err(CallError::Service)
    }
}

#[async_trait]
impl ProfileApi for ProfileClient {
    async fn register_user(
        &self,
        profile: wire::UserProfile,
    ) -> Result<wire::UserProfile, ProfileCallError> {
        let args = Encode!(&profile).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_result("registerUser", CallMode::Update, args)
            .await
    }

    async fn get_profile(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        let args = Encode!(&id).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_result("getProfile", CallMode::Query, args)
            .await
    }

    async fn update_profile(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<wire::UserProfile, ProfileCallError> {
        let args = Encode!(&username, &bio, &profile_pic)
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_result("updateProfile", CallMode::Update, args)
            .await
    }

    async fn follow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        let args = Encode!(&id).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_result("followUser", CallMode::Update, args)
            .await
    }

    async fn unfollow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        let args = Encode!(&id).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_result("unfollowUser", CallMode::Update, args)
            .await
    }

    async fn get_followers(
        &self,
        id: Principal,
    ) -> Result<Vec<wire::UserProfile>, ProfileCallError> {
        let args = Encode!(&id).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_list("getFollowers", args).await
    }

    async fn get_following(
        &self,
        id: Principal,
    ) -> Result<Vec<wire::UserProfile>, ProfileCallError> {
        let args = Encode!(&id).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.call_profile_list("getFollowing", args).await
    }
}
