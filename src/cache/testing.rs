// SPDX-License-Identifier: MPL-2.0

//! In-memory canister fakes shared by the cache, state, and action tests.

use crate::canister::wire::{self, PostError, ProfileError};
use crate::canister::{CallError, PostApi, PostCallError, ProfileApi, ProfileCallError};
use crate::cache::Store;
use crate::entities;
use crate::state::SessionState;
use async_trait::async_trait;
use candid::Principal;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory post service with real like/comment semantics.
pub(crate) struct FakePosts {
    posts: Mutex<BTreeMap<u64, wire::Post>>,
    next_id: AtomicU64,
    caller: Mutex<Principal>,
    like_delay: Mutex<Option<Duration>>,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) get_calls: AtomicUsize,
}

impl FakePosts {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            caller: Mutex::new(Principal::anonymous()),
            like_delay: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_caller(&self, principal: Principal) {
        *self.caller.lock().unwrap() = principal;
    }

    /// Make `likePost` and `unlikePost` take this long to answer.
    pub(crate) fn delay_likes(&self, delay: Duration) {
        *self.like_delay.lock().unwrap() = Some(delay);
    }

    fn caller(&self) -> Principal {
        *self.caller.lock().unwrap()
    }

    async fn like_pause(&self) {
        let delay = *self.like_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PostApi for FakePosts {
    async fn create_post(&self, content: &str) -> Result<wire::Post, PostCallError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let post = wire::Post {
            id: candid::Nat::from(id),
            content: content.to_string(),
            user_likes: vec![],
            author: self.caller(),
            likes: candid::Nat::from(0u64),
            timestamp: candid::Int::from(entities::now_ns()),
            comments: vec![],
        };
        self.posts.lock().unwrap().insert(id, post.clone());
        Ok(post)
    }

    async fn get_all_posts(&self) -> Result<Vec<wire::Post>, PostCallError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.lock().unwrap().values().cloned().collect())
    }

    async fn get_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CallError::Service(PostError::NotFound))
    }

    async fn like_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        self.like_pause().await;
        let caller = self.caller();
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or(CallError::Service(PostError::NotFound))?;
        if post.user_likes.contains(&caller) {
            return Err(CallError::Service(PostError::AlreadyLiked));
        }
        post.user_likes.push(caller);
        post.likes = candid::Nat::from(post.user_likes.len() as u64);
        Ok(post.clone())
    }

    async fn unlike_post(&self, id: u64) -> Result<wire::Post, PostCallError> {
        self.like_pause().await;
        let caller = self.caller();
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or(CallError::Service(PostError::NotFound))?;
        if !post.user_likes.contains(&caller) {
            return Err(CallError::Service(PostError::NotLiked));
        }
        post.user_likes.retain(|p| *p != caller);
        post.likes = candid::Nat::from(post.user_likes.len() as u64);
        Ok(post.clone())
    }

    async fn add_comment(&self, id: u64, content: &str) -> Result<wire::Post, PostCallError> {
        let caller = self.caller();
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .get_mut(&id)
            .ok_or(CallError::Service(PostError::NotFound))?;
        post.comments.push(wire::Comment {
            content: content.to_string(),
            author: caller,
            timestamp: candid::Int::from(entities::now_ns()),
        });
        Ok(post.clone())
    }
}

/// In-memory profile service; specific ids can be made to fail.
pub(crate) struct FakeProfiles {
    profiles: Mutex<BTreeMap<Principal, wire::UserProfile>>,
    failing: Mutex<HashSet<Principal>>,
    caller: Mutex<Principal>,
    pub(crate) get_calls: AtomicUsize,
}

impl FakeProfiles {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            profiles: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(HashSet::new()),
            caller: Mutex::new(Principal::anonymous()),
            get_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_caller(&self, principal: Principal) {
        *self.caller.lock().unwrap() = principal;
    }

    pub(crate) fn fail_for(&self, principal: Principal) {
        self.failing.lock().unwrap().insert(principal);
    }

    pub(crate) fn seed(&self, profile: wire::UserProfile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }

    fn caller(&self) -> Principal {
        *self.caller.lock().unwrap()
    }
}

#[async_trait]
impl ProfileApi for FakeProfiles {
    async fn register_user(
        &self,
        profile: wire::UserProfile,
    ) -> Result<wire::UserProfile, ProfileCallError> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&id) {
            return Err(CallError::Service(ProfileError::SystemError));
        }
        self.profiles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CallError::Service(ProfileError::NotFound))
    }

    async fn update_profile(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<wire::UserProfile, ProfileCallError> {
        let caller = self.caller();
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&caller)
            .ok_or(CallError::Service(ProfileError::NotFound))?;
        profile.username = username.to_string();
        profile.bio = bio.map(str::to_string);
        profile.profile_pic = profile_pic.map(str::to_string);
        Ok(profile.clone())
    }

    async fn follow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        let caller = self.caller();
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(me) = profiles.get_mut(&caller) {
            if !me.following.contains(&id) {
                me.following.push(id);
            }
        }
        let target = profiles
            .get_mut(&id)
            .ok_or(CallError::Service(ProfileError::NotFound))?;
        if !target.followers.contains(&caller) {
            target.followers.push(caller);
        }
        Ok(target.clone())
    }

    async fn unfollow_user(&self, id: Principal) -> Result<wire::UserProfile, ProfileCallError> {
        let caller = self.caller();
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(me) = profiles.get_mut(&caller) {
            me.following.retain(|p| *p != id);
        }
        let target = profiles
            .get_mut(&id)
            .ok_or(CallError::Service(ProfileError::NotFound))?;
        target.followers.retain(|p| *p != caller);
        Ok(target.clone())
    }

    async fn get_followers(
        &self,
        id: Principal,
    ) -> Result<Vec<wire::UserProfile>, ProfileCallError> {
        let profiles = self.profiles.lock().unwrap();
        let target = profiles
            .get(&id)
            .ok_or(CallError::Service(ProfileError::NotFound))?;
        Ok(target
            .followers
            .iter()
            .filter_map(|p| profiles.get(p).cloned())
            .collect())
    }

    async fn get_following(
        &self,
        id: Principal,
    ) -> Result<Vec<wire::UserProfile>, ProfileCallError> {
        let profiles = self.profiles.lock().unwrap();
        let target = profiles
            .get(&id)
            .ok_or(CallError::Service(ProfileError::NotFound))?;
        Ok(target
            .following
            .iter()
            .filter_map(|p| profiles.get(p).cloned())
            .collect())
    }
}

pub(crate) fn wire_profile(id: Principal, username: &str) -> wire::UserProfile {
    wire::UserProfile {
        id,
        username: username.to_string(),
        bio: None,
        profile_pic: None,
        join_date: candid::Int::from(1_700_000_000_000_000_000i64),
        followers: vec![],
        following: vec![],
    }
}

pub(crate) fn store_with(
    posts: Arc<FakePosts>,
    profiles: Arc<FakeProfiles>,
) -> (Arc<Store>, Arc<SessionState>) {
    let session = Arc::new(SessionState::new());
    let store = Arc::new(Store::new(posts, profiles, session.clone()));
    (store, session)
}

pub(crate) fn principal(fill: u8) -> Principal {
    Principal::from_slice(&[fill; 8])
}
