// SPDX-License-Identifier: MPL-2.0

//! Intention-level operations.
//!
//! Each action bundles client-side validation, the store mutation, a
//! user-facing notification, and an analytics event. Errors stop here:
//! actions never return them, they turn into notifications.

use crate::cache::Store;
use crate::entities::Post;
use crate::state::{LikeController, LikeOutcome, SessionState};
use crate::validate;
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A user-facing notification, toast-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Closed vocabulary of analytics events, recorded on success only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedEvent {
    PostCreated,
    PostLiked { post_id: u64 },
    CommentAdded { post_id: u64 },
    ProfileUpdated,
    UserFollowed,
    UserUnfollowed,
}

impl TrackedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrackedEvent::PostCreated => "post_created",
            TrackedEvent::PostLiked { .. } => "post_liked",
            TrackedEvent::CommentAdded { .. } => "comment_added",
            TrackedEvent::ProfileUpdated => "profile_updated",
            TrackedEvent::UserFollowed => "user_followed",
            TrackedEvent::UserUnfollowed => "user_unfollowed",
        }
    }
}

/// Sink for analytics events.
pub trait Analytics: Send + Sync {
    fn track(&self, event: TrackedEvent);
}

/// Default notifier, writes notices to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!("{}: {}", notice.title, notice.body),
            NoticeKind::Error => warn!("{}: {}", notice.title, notice.body),
        }
    }
}

/// Default analytics sink, writes events to the log.
pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn track(&self, event: TrackedEvent) {
        match event {
            TrackedEvent::PostLiked { post_id } | TrackedEvent::CommentAdded { post_id } => {
                info!("analytics: {} post_id={post_id}", event.name())
            }
            _ => info!("analytics: {}", event.name()),
        }
    }
}

/// The crate's front door for mutations.
pub struct Actions {
    store: Arc<Store>,
    likes: Arc<LikeController>,
    session: Arc<SessionState>,
    notifier: Arc<dyn Notifier>,
    analytics: Arc<dyn Analytics>,
}

impl Actions {
    pub fn new(
        store: Arc<Store>,
        likes: Arc<LikeController>,
        session: Arc<SessionState>,
        notifier: Arc<dyn Notifier>,
        analytics: Arc<dyn Analytics>,
    ) -> Self {
        Self {
            store,
            likes,
            session,
            notifier,
            analytics,
        }
    }

    /// Like [`Actions::new`] with the log-backed sinks.
    pub fn with_logging(
        store: Arc<Store>,
        likes: Arc<LikeController>,
        session: Arc<SessionState>,
    ) -> Self {
        Self::new(
            store,
            likes,
            session,
            Arc::new(LogNotifier),
            Arc::new(LogAnalytics),
        )
    }

    pub async fn create_post(&self, content: &str) {
        if let Err(e) = validate::post_content(content) {
            self.error(e.to_string());
            return;
        }
        match self.store.create_post(content).await {
            Ok(_) => {
                self.success("Your post has been published successfully");
                self.analytics.track(TrackedEvent::PostCreated);
            }
            Err(e) => {
                warn!("create post failed: {e}");
                self.error("Failed to create post. Please try again.");
            }
        }
    }

    /// Flip the like state of `post`. Likes are tracked; unlikes and silent
    /// reconciliations are not, and neither gets a success notice.
    pub async fn toggle_like(&self, post: &Post) {
        match self.likes.toggle(post).await {
            LikeOutcome::Liked(_) => {
                self.analytics
                    .track(TrackedEvent::PostLiked { post_id: post.id });
            }
            LikeOutcome::Unliked(_) | LikeOutcome::Reconciled { .. } | LikeOutcome::Ignored => {}
            LikeOutcome::Failed(e) => {
                warn!("like toggle failed: {e}");
                self.error("Failed to like post. Please try again.");
            }
        }
    }

    pub async fn add_comment(&self, post_id: u64, content: &str) {
        if let Err(e) = validate::comment_content(content) {
            self.error(e.to_string());
            return;
        }
        match self.store.add_comment(post_id, content).await {
            Ok(_) => {
                self.success("Your comment has been posted successfully");
                self.analytics
                    .track(TrackedEvent::CommentAdded { post_id });
            }
            Err(e) => {
                warn!("add comment failed: {e}");
                self.error("Failed to add comment. Please try again.");
            }
        }
    }

    pub async fn register_user(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) {
        if !self.session.is_authenticated() {
            self.error("Not authenticated");
            return;
        }
        if !self.profile_fields_valid(username, bio, profile_pic) {
            return;
        }
        match self.store.register_user(username, bio, profile_pic).await {
            Ok(_) => self.success("Profile created successfully"),
            Err(e) => {
                warn!("register user failed: {e}");
                self.error("Failed to create profile");
            }
        }
    }

    pub async fn update_profile(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) {
        if !self.profile_fields_valid(username, bio, profile_pic) {
            return;
        }
        match self.store.update_profile(username, bio, profile_pic).await {
            Ok(_) => {
                self.success("Profile updated successfully");
                self.analytics.track(TrackedEvent::ProfileUpdated);
            }
            Err(e) => {
                warn!("update profile failed: {e}");
                self.error("Failed to update profile");
            }
        }
    }

    pub async fn follow_user(&self, id: &str) {
        match self.store.follow_user(id).await {
            Ok(_) => self.analytics.track(TrackedEvent::UserFollowed),
            Err(e) => {
                warn!("follow failed: {e}");
                self.error("Failed to follow user. Please try again.");
            }
        }
    }

    pub async fn unfollow_user(&self, id: &str) {
        match self.store.unfollow_user(id).await {
            Ok(_) => self.analytics.track(TrackedEvent::UserUnfollowed),
            Err(e) => {
                warn!("unfollow failed: {e}");
                self.error("Failed to unfollow user. Please try again.");
            }
        }
    }

    fn profile_fields_valid(
        &self,
        username: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> bool {
        if let Err(e) = validate::username(username) {
            self.error(e.to_string());
            return false;
        }
        if let Some(bio) = bio {
            if let Err(e) = validate::bio(bio) {
                self.error(e.to_string());
                return false;
            }
        }
        if let Some(url) = profile_pic {
            if let Err(e) = validate::profile_pic_url(url) {
                self.error(e.to_string());
                return false;
            }
        }
        true
    }

    fn success(&self, body: impl Into<String>) {
        self.notifier.notify(Notice {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            body: body.into(),
        });
    }

    fn error(&self, body: impl Into<String>) {
        self.notifier.notify(Notice {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            body: body.into(),
        });
    }
}
