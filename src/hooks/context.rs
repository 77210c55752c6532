//! Write context
//!
//! Optional hooks carried by every mutating call:
//! - `pre` rewrites the payload before the write
//! - `post` observes the stored result; its errors propagate
//! - `error` receives backend failures and suppresses them

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::operation::OperationKind;
use crate::store::{Row, StoreError, StoreResult};

/// Input to a pre hook
#[derive(Debug, Clone)]
pub struct PreEvent {
    pub args: Row,
    pub is_update: bool,
    pub request_id: Uuid,
    pub attributes: Map<String, Value>,
}

/// Input to a post hook
#[derive(Debug, Clone)]
pub struct PostEvent {
    pub entity: String,
    pub kind: OperationKind,
    /// Payload after the pre hook
    pub input: Row,
    pub range_key: Option<String>,
    /// Stored row as returned by the backend
    pub result: Option<Row>,
    pub request_id: Uuid,
    pub attributes: Map<String, Value>,
}

pub type PreHook = Arc<dyn Fn(PreEvent) -> BoxFuture<'static, StoreResult<Row>> + Send + Sync>;
pub type PostHook = Arc<dyn Fn(PostEvent) -> BoxFuture<'static, StoreResult<()>> + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&StoreError) + Send + Sync>;

/// Hooks and metadata for one mutating call
#[derive(Clone)]
pub struct WriteContext {
    /// Request ID for tracing
    pub request_id: Uuid,
    /// Caller metadata passed through to hooks
    pub attributes: Map<String, Value>,
    pre: Option<PreHook>,
    post: Option<PostHook>,
    error: Option<ErrorHook>,
}

impl WriteContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            attributes: Map::new(),
            pre: None,
            post: None,
            error: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_pre<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(PreEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StoreResult<Row>> + Send + 'static,
    {
        self.pre = Some(Arc::new(
            move |event: PreEvent| -> BoxFuture<'static, StoreResult<Row>> { Box::pin(hook(event)) },
        ));
        self
    }

    pub fn with_post<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(PostEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StoreResult<()>> + Send + 'static,
    {
        self.post = Some(Arc::new(
            move |event: PostEvent| -> BoxFuture<'static, StoreResult<()>> { Box::pin(hook(event)) },
        ));
        self
    }

    pub fn with_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StoreError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(hook));
        self
    }

    pub fn has_post(&self) -> bool {
        self.post.is_some()
    }

    /// Run the pre hook, or pass the payload through
    pub async fn before_write(&self, args: Row, is_update: bool) -> StoreResult<Row> {
        match &self.pre {
            Some(pre) => {
                pre(PreEvent {
                    args,
                    is_update,
                    request_id: self.request_id,
                    attributes: self.attributes.clone(),
                })
                .await
            }
            None => Ok(args),
        }
    }

    /// Run the post hook after a successful write
    pub async fn after_write(
        &self,
        entity: &str,
        kind: OperationKind,
        input: &Row,
        range_key: Option<&str>,
        result: Option<&Row>,
    ) -> StoreResult<()> {
        let Some(post) = &self.post else {
            return Ok(());
        };

        post(PostEvent {
            entity: entity.to_string(),
            kind,
            input: input.clone(),
            range_key: range_key.map(str::to_string),
            result: result.cloned(),
            request_id: self.request_id,
            attributes: self.attributes.clone(),
        })
        .await
    }

    /// Route a failed write: the error hook swallows it, otherwise it is
    /// logged and returned.
    pub fn recover<T>(&self, entity: &str, kind: OperationKind, err: StoreError) -> StoreResult<Option<T>> {
        match &self.error {
            Some(hook) => {
                tracing::debug!(
                    entity,
                    operation = %kind,
                    request_id = %self.request_id,
                    code = err.code(),
                    "write failure handed to error hook"
                );
                hook(&err);
                Ok(None)
            }
            None => {
                tracing::error!(
                    entity,
                    operation = %kind,
                    request_id = %self.request_id,
                    error = %err,
                    "write failed"
                );
                Err(err)
            }
        }
    }
}

impl Default for WriteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WriteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteContext")
            .field("request_id", &self.request_id)
            .field("attributes", &self.attributes)
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
