// SPDX-License-Identifier: MPL-2.0

//! Typed store over the canister clients.
//!
//! One `QueryCache` per entity kind, a declared-invalidation vocabulary
//! (`Tag`), and mutations that write their authoritative responses through.
//! This is the only layer that talks to the service traits; everything above
//! it sees native entities.

use crate::canister::wire::ProfileError;
use crate::canister::{
    CallError, HttpTransport, PostApi, PostCallError, PostClient, ProfileApi, ProfileCallError,
    ProfileClient, TransportError,
};
use crate::cache::query::{QueryCache, Subscription};
use crate::cache::tags::Tag;
use crate::config::ClientConfig;
use crate::entities::{self, NormalizeError, Post, UserProfile, parse_principal};
use crate::state::SessionState;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Normalization failures are response-integrity failures.
fn invalid<E>(e: NormalizeError) -> CallError<E> {
    CallError::Transport(TransportError::InvalidResponse(e.to_string()))
}

/// Process-wide entity store. Construct once, share via `Arc`, call
/// [`Store::shutdown`] on teardown.
pub struct Store {
    posts_api: Arc<dyn PostApi>,
    profiles_api: Arc<dyn ProfileApi>,
    session: Arc<SessionState>,
    timeline: QueryCache<(), Vec<Post>, PostCallError>,
    posts: QueryCache<u64, Post, PostCallError>,
    profiles: QueryCache<String, UserProfile, ProfileCallError>,
    followers: QueryCache<String, Vec<UserProfile>, ProfileCallError>,
    following: QueryCache<String, Vec<UserProfile>, ProfileCallError>,
}

impl Store {
    pub fn new(
        posts_api: Arc<dyn PostApi>,
        profiles_api: Arc<dyn ProfileApi>,
        session: Arc<SessionState>,
    ) -> Self {
        let timeline = QueryCache::new({
            let api = posts_api.clone();
            move |_: ()| {
                let api = api.clone();
                async move {
                    let posts = api.get_all_posts().await?;
                    posts
                        .iter()
                        .map(Post::from_wire)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(invalid)
                }
            }
        });
        let posts = QueryCache::new({
            let api = posts_api.clone();
            move |id: u64| {
                let api = api.clone();
                async move {
                    let post = api.get_post(id).await?;
                    Post::from_wire(&post).map_err(invalid)
                }
            }
        });
        let profiles = QueryCache::new({
            let api = profiles_api.clone();
            move |id: String| {
                let api = api.clone();
                async move {
                    let principal = parse_principal(&id)
                        .map_err(|_| CallError::Service(ProfileError::InvalidInput))?;
                    let profile = api.get_profile(principal).await?;
                    UserProfile::from_wire(&profile).map_err(invalid)
                }
            }
        });
        let followers = QueryCache::new({
            let api = profiles_api.clone();
            move |id: String| {
                let api = api.clone();
                async move {
                    let principal = parse_principal(&id)
                        .map_err(|_| CallError::Service(ProfileError::InvalidInput))?;
                    let list = api.get_followers(principal).await?;
                    list.iter()
                        .map(UserProfile::from_wire)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(invalid)
                }
            }
        });
        let following = QueryCache::new({
            let api = profiles_api.clone();
            move |id: String| {
                let api = api.clone();
                async move {
                    let principal = parse_principal(&id)
                        .map_err(|_| CallError::Service(ProfileError::InvalidInput))?;
                    let list = api.get_following(principal).await?;
                    list.iter()
                        .map(UserProfile::from_wire)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(invalid)
                }
            }
        });

        Self {
            posts_api,
            profiles_api,
            session,
            timeline,
            posts,
            profiles,
            followers,
            following,
        }
    }

    /// Wire up the bundled HTTP transport and clients from configuration.
    pub fn connect(
        config: &ClientConfig,
        session: Arc<SessionState>,
    ) -> Result<Self, NormalizeError> {
        let transport = Arc::new(HttpTransport::new(config.gateway_url.clone(), session.clone()));
        let posts_api = Arc::new(PostClient::new(
            transport.clone(),
            parse_principal(&config.post_canister_id)?,
        ));
        let profiles_api = Arc::new(ProfileClient::new(
            transport,
            parse_principal(&config.profile_canister_id)?,
        ));
        Ok(Self::new(posts_api, profiles_api, session))
    }

    // --- queries ---

    /// All posts, in service order.
    pub async fn all_posts(&self) -> Result<Vec<Post>, PostCallError> {
        self.timeline.fetch(()).await
    }

    pub async fn post(&self, id: u64) -> Result<Post, PostCallError> {
        self.posts.fetch(id).await
    }

    pub async fn profile(&self, id: &str) -> Result<UserProfile, ProfileCallError> {
        self.profiles.fetch(id.to_string()).await
    }

    pub async fn followers(&self, id: &str) -> Result<Vec<UserProfile>, ProfileCallError> {
        self.followers.fetch(id.to_string()).await
    }

    pub async fn following(&self, id: &str) -> Result<Vec<UserProfile>, ProfileCallError> {
        self.following.fetch(id.to_string()).await
    }

    /// Fetch several profiles at once. Duplicate ids collapse, fetches run
    /// concurrently through the profile cache, and ids that fail are simply
    /// absent from the result; the batch itself never fails.
    pub async fn profiles_by_id(&self, ids: &[String]) -> HashMap<String, UserProfile> {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let results = join_all(unique.iter().map(|id| self.profiles.fetch(id.clone()))).await;

        let mut found = HashMap::new();
        for (id, result) in unique.into_iter().zip(results) {
            if let Ok(profile) = result {
                found.insert(id, profile);
            }
        }
        found
    }

    // --- subscriptions ---

    pub fn subscribe_timeline(&self) -> Subscription<(), Vec<Post>, PostCallError> {
        self.timeline.subscribe(())
    }

    pub fn subscribe_post(&self, id: u64) -> Subscription<u64, Post, PostCallError> {
        self.posts.subscribe(id)
    }

    pub fn subscribe_profile(
        &self,
        id: &str,
    ) -> Subscription<String, UserProfile, ProfileCallError> {
        self.profiles.subscribe(id.to_string())
    }

    // --- cached reads ---

    /// Last-known post, checking the single-post cache first and falling
    /// back to the timeline listing.
    pub fn cached_post(&self, id: u64) -> Option<Post> {
        self.posts.cached(&id).or_else(|| {
            self.timeline
                .cached(&())
                .and_then(|list| list.into_iter().find(|p| p.id == id))
        })
    }

    pub fn cached_profile(&self, id: &str) -> Option<UserProfile> {
        self.profiles.cached(&id.to_string())
    }

    // --- mutations ---

    pub async fn create_post(&self, content: &str) -> Result<Post, PostCallError> {
        let created = self.posts_api.create_post(content).await?;
        let post = Post::from_wire(&created).map_err(invalid)?;
        self.posts.put(post.id, post.clone());
        self.invalidate(&[Tag::AllPosts]);
        Ok(post)
    }

    pub async fn like_post(&self, id: u64) -> Result<Post, PostCallError> {
        let liked = self.posts_api.like_post(id).await?;
        let post = Post::from_wire(&liked).map_err(invalid)?;
        self.posts.put(id, post.clone());
        self.invalidate(&[Tag::AllPosts]);
        Ok(post)
    }

    pub async fn unlike_post(&self, id: u64) -> Result<Post, PostCallError> {
        let unliked = self.posts_api.unlike_post(id).await?;
        let post = Post::from_wire(&unliked).map_err(invalid)?;
        self.posts.put(id, post.clone());
        self.invalidate(&[Tag::AllPosts]);
        Ok(post)
    }

    pub async fn add_comment(&self, id: u64, content: &str) -> Result<Post, PostCallError> {
        let commented = self.posts_api.add_comment(id, content).await?;
        let post = Post::from_wire(&commented).map_err(invalid)?;
        self.posts.put(id, post.clone());
        self.invalidate(&[Tag::AllPosts]);
        Ok(post)
    }

    /// Register the signed-in viewer. The profile is built client-side: the
    /// session principal becomes its id, the join date is now, and the
    /// follow lists start empty.
    pub async fn register_user(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<UserProfile, ProfileCallError> {
        let viewer = self
            .session
            .principal()
            .ok_or(CallError::Transport(TransportError::NotAuthenticated))?;
        let wire_profile = crate::canister::wire::UserProfile {
            id: parse_principal(&viewer).map_err(invalid)?,
            username: username.to_string(),
            bio: bio.map(str::to_string),
            profile_pic: profile_pic.map(str::to_string),
            join_date: candid::Int::from(entities::now_ns()),
            followers: Vec::new(),
            following: Vec::new(),
        };

        let registered = self.profiles_api.register_user(wire_profile).await?;
        let profile = UserProfile::from_wire(&registered).map_err(invalid)?;
        self.profiles.put(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<UserProfile, ProfileCallError> {
        let updated = self
            .profiles_api
            .update_profile(username, bio, profile_pic)
            .await?;
        let profile = UserProfile::from_wire(&updated).map_err(invalid)?;
        self.profiles.put(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    pub async fn follow_user(&self, id: &str) -> Result<UserProfile, ProfileCallError> {
        let principal =
            parse_principal(id).map_err(|_| CallError::Service(ProfileError::InvalidInput))?;
        let followed = self.profiles_api.follow_user(principal).await?;
        let profile = UserProfile::from_wire(&followed).map_err(invalid)?;
        self.invalidate(&[Tag::AllProfiles, Tag::FollowLists]);
        Ok(profile)
    }

    pub async fn unfollow_user(&self, id: &str) -> Result<UserProfile, ProfileCallError> {
        let principal =
            parse_principal(id).map_err(|_| CallError::Service(ProfileError::InvalidInput))?;
        let unfollowed = self.profiles_api.unfollow_user(principal).await?;
        let profile = UserProfile::from_wire(&unfollowed).map_err(invalid)?;
        self.invalidate(&[Tag::AllProfiles, Tag::FollowLists]);
        Ok(profile)
    }

    // --- lifecycle ---

    /// Mark everything a tag covers stale; subscribed keys refetch at once.
    pub fn invalidate(&self, tags: &[Tag]) {
        for tag in tags {
            match tag {
                Tag::AllPosts => self.timeline.mark_stale(&()),
                Tag::Post(id) => self.posts.mark_stale(id),
                Tag::Profile(id) => self.profiles.mark_stale(id),
                Tag::AllProfiles => self.profiles.mark_all_stale(),
                Tag::FollowLists => {
                    self.followers.mark_all_stale();
                    self.following.mark_all_stale();
                }
            }
        }
    }

    /// Drop cache entries nobody subscribes to or waits on.
    pub fn evict_unused(&self) {
        self.timeline.evict_unused();
        self.posts.evict_unused();
        self.profiles.evict_unused();
        self.followers.evict_unused();
        self.following.evict_unused();
    }

    /// Abort all in-flight fetches and clear every cache.
    pub fn shutdown(&self) {
        self.timeline.shutdown();
        self.posts.shutdown();
        self.profiles.shutdown();
        self.followers.shutdown();
        self.following.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::query::Phase;
    use crate::cache::testing::{FakePosts, FakeProfiles, principal, store_with, wire_profile};
    use crate::canister::wire::PostError;
    use crate::state::Session;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_concurrent_timeline_queries_make_one_call() {
        let posts = FakePosts::new();
        let (store, _) = store_with(posts.clone(), FakeProfiles::new());

        let (a, b, c) = tokio::join!(store.all_posts(), store.all_posts(), store.all_posts());
        assert!(a.unwrap().is_empty());
        assert!(b.unwrap().is_empty());
        assert!(c.unwrap().is_empty());
        assert_eq!(posts.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_post_refreshes_subscribed_timeline() {
        let posts = FakePosts::new();
        let (store, _) = store_with(posts.clone(), FakeProfiles::new());

        let mut timeline = store.subscribe_timeline();
        assert!(timeline.changed().await);
        assert_eq!(timeline.latest(), Some(vec![]));

        let created = store.create_post("hello").await.unwrap();
        assert!(timeline.changed().await);

        let listed = timeline.latest().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "hello");
        assert_eq!(listed[0].likes, 0);
        assert!(listed[0].comments.is_empty());

        // The mutation payload went straight into the post cache.
        assert_eq!(store.cached_post(created.id), Some(created));
    }

    #[tokio::test]
    async fn test_like_then_relike_hits_the_conflict_variant() {
        let posts = FakePosts::new();
        posts.set_caller(principal(5));
        let (store, _) = store_with(posts.clone(), FakeProfiles::new());

        let created = store.create_post("hello").await.unwrap();
        let liked = store.like_post(created.id).await.unwrap();
        assert_eq!(liked.likes, 1);
        assert!(liked.liked_by(&principal(5).to_text()));

        let err = store.like_post(created.id).await.unwrap_err();
        assert_eq!(err, CallError::Service(PostError::AlreadyLiked));
        // The conflict changed nothing server-side.
        assert_eq!(store.cached_post(created.id).unwrap().likes, 1);
    }

    #[tokio::test]
    async fn test_comment_write_through_updates_cached_post() {
        let posts = FakePosts::new();
        let (store, _) = store_with(posts.clone(), FakeProfiles::new());

        let created = store.create_post("hello").await.unwrap();
        let commented = store.add_comment(created.id, "nice").await.unwrap();
        assert_eq!(commented.comments.len(), 1);
        assert_eq!(commented.comments[0].content, "nice");

        let cached = store.cached_post(created.id).unwrap();
        assert_eq!(cached.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_profiles_dedupes_and_omits_failures() {
        let profiles = FakeProfiles::new();
        let alice = principal(1);
        let bob = principal(2);
        profiles.seed(wire_profile(alice, "alice_01"));
        profiles.seed(wire_profile(bob, "bob_02"));
        profiles.fail_for(bob);
        let (store, _) = store_with(FakePosts::new(), profiles.clone());

        let ids = vec![alice.to_text(), alice.to_text(), bob.to_text()];
        let found = store.profiles_by_id(&ids).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[&alice.to_text()].username, "alice_01");
        assert!(!found.contains_key(&bob.to_text()));
        // One call per distinct id, despite the duplicate.
        assert_eq!(profiles.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_follow_invalidates_subscribed_profiles() {
        let profiles = FakeProfiles::new();
        let me = principal(1);
        let them = principal(2);
        profiles.seed(wire_profile(me, "alice_01"));
        profiles.seed(wire_profile(them, "bob_02"));
        profiles.set_caller(me);
        let (store, session) = store_with(FakePosts::new(), profiles.clone());
        session.sign_in(Session::new(me));

        let mut watched = store.subscribe_profile(&them.to_text());
        assert!(watched.changed().await);
        assert!(watched.latest().unwrap().followers.is_empty());

        store.follow_user(&them.to_text()).await.unwrap();
        assert!(watched.changed().await);
        assert_eq!(
            watched.latest().unwrap().followers,
            vec![me.to_text()]
        );
    }

    #[tokio::test]
    async fn test_register_requires_a_session() {
        let (store, session) = store_with(FakePosts::new(), FakeProfiles::new());

        let err = store.register_user("alice_01", None, None).await.unwrap_err();
        assert_eq!(
            err,
            CallError::Transport(TransportError::NotAuthenticated)
        );

        let me = principal(7);
        session.sign_in(Session::new(me));
        let profile = store
            .register_user("alice_01", Some("hi"), None)
            .await
            .unwrap();
        assert_eq!(profile.id, me.to_text());
        assert_eq!(profile.username, "alice_01");
        assert!(profile.followers.is_empty());
        assert_eq!(store.cached_profile(&me.to_text()), Some(profile));
    }

    #[tokio::test]
    async fn test_unknown_profile_id_is_invalid_input() {
        let (store, _) = store_with(FakePosts::new(), FakeProfiles::new());

        let err = store.profile("definitely not a principal").await.unwrap_err();
        assert_eq!(err, CallError::Service(ProfileError::InvalidInput));
    }

    #[tokio::test]
    async fn test_shutdown_clears_the_timeline() {
        let posts = FakePosts::new();
        let (store, _) = store_with(posts.clone(), FakeProfiles::new());

        store.all_posts().await.unwrap();
        assert_eq!(store.timeline.phase(&()), Some(Phase::Fresh));

        store.shutdown();
        assert_eq!(store.timeline.phase(&()), None);
    }
}
