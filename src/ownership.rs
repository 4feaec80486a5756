//! # Ownership Resolvers
//!
//! A resolver answers one question for a protected route: given the path parameters
//! of this request, which user owns the addressed resource? The owner guard in
//! [`crate::auth`] is generic over this trait, so each resource kind plugs in its own
//! lookup without the guard knowing anything about posts or comments.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::repository::{Repository, StoreError};

/// Raw path parameters of the matched route, keyed by segment name.
#[derive(Debug, Clone, Default)]
pub struct PathIds(HashMap<String, String>);

impl PathIds {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    /// Parses the named segment as a numeric id.
    pub fn id(&self, name: &'static str) -> Result<i64, ResolveError> {
        let raw = self.0.get(name).ok_or(ResolveError::MissingParam(name))?;
        raw.parse().map_err(|_| ResolveError::Malformed(name))
    }
}

impl From<HashMap<String, String>> for PathIds {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

/// Any reason the owner could not be determined. The guard treats every variant
/// the same way: no owner, so only an administrator gets through.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("missing path parameter `{0}`")]
    MissingParam(&'static str),
    #[error("path parameter `{0}` is not a valid id")]
    Malformed(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait OwnershipResolver: Send + Sync {
    /// Returns the owning user's id, read from storage on every call.
    async fn resolve(&self, ids: &PathIds) -> Result<i64, ResolveError>;
}

/// Owner of `/posts/{post_id}`.
#[derive(Clone)]
pub struct PostOwnership {
    repo: Arc<dyn Repository>,
}

impl PostOwnership {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OwnershipResolver for PostOwnership {
    async fn resolve(&self, ids: &PathIds) -> Result<i64, ResolveError> {
        let post_id = ids.id("post_id")?;
        Ok(self.repo.post_owner(post_id).await?)
    }
}

/// Owner of `/posts/{post_id}/comments/{comment_id}`. The comment must belong to the
/// post named in the path; a comment id from another post does not resolve.
#[derive(Clone)]
pub struct CommentOwnership {
    repo: Arc<dyn Repository>,
}

impl CommentOwnership {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OwnershipResolver for CommentOwnership {
    async fn resolve(&self, ids: &PathIds) -> Result<i64, ResolveError> {
        let post_id = ids.id("post_id")?;
        let comment_id = ids.id("comment_id")?;
        Ok(self.repo.comment_owner(post_id, comment_id).await?)
    }
}
