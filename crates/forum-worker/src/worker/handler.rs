//! Task handlers

use async_trait::async_trait;
use forum_core::TaskMessage;
use std::future::Future;
use std::marker::PhantomData;

/// A failed task attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// Retry with backoff while retries remain
    #[error("{0}")]
    Retry(String),

    /// Archive immediately, regardless of remaining retries
    #[error("{0}")]
    SkipRetry(String),
}

impl HandlerError {
    pub fn retry(msg: impl Into<String>) -> Self {
        Self::Retry(msg.into())
    }

    pub fn skip_retry(msg: impl Into<String>) -> Self {
        Self::SkipRetry(msg.into())
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &TaskMessage) -> Result<(), HandlerError>;
}

/// Adapts an async closure into a [`TaskHandler`]
pub struct FnHandler<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(TaskMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f, _fut: PhantomData }
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F, Fut>
where
    F: Fn(TaskMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, task: &TaskMessage) -> Result<(), HandlerError> {
        (self.f)(task.clone()).await
    }
}
