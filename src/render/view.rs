//! Two-phase views over cached remote data.
//!
//! A view is resolved in two steps:
//!
//! ```ignore
//! // 1. Synchronous look at the cache
//! let mut view = View::resolve(client.peek(&key), async move {
//!     client.get_issue(&key, &options).await
//! });
//!
//! // 2. Render whatever is known now, then again once the load lands
//! render(view.state());
//! if view.is_loading() {
//!     view.settle().await;
//!     render(view.state());
//! }
//! ```
//!
//! The load runs on its own task. Dropping a view doesn't cancel it: the
//! remote call still completes and still populates the cache, its result
//! is just discarded.

use std::future::Future;
use tokio::sync::mpsc;

use crate::jira::ApiError;

/// What a view currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
  /// Load in flight
  Loading,
  /// Data available
  Ready(T),
  /// Load failed, or a failure is memoized
  Failed(String),
}

impl<T> ViewState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, ViewState::Loading)
  }
}

#[cfg(test)]
impl<T> ViewState<T> {
  pub fn data(&self) -> Option<&T> {
    match self {
      ViewState::Ready(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      ViewState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

impl<T> From<Result<T, ApiError>> for ViewState<T> {
  fn from(result: Result<T, ApiError>) -> Self {
    match result {
      Ok(data) => ViewState::Ready(data),
      Err(e) => ViewState::Failed(e.to_string()),
    }
  }
}

/// A rendering target fed first from the cache, then from a load.
pub struct View<T> {
  state: ViewState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T: Send + 'static> View<T> {
  /// Build a view from a cache look.
  ///
  /// A cached outcome (data or memoized failure) is shown immediately and
  /// `load` is dropped unstarted. Otherwise the view starts as loading and
  /// `load` is spawned.
  pub fn resolve<Fut>(cached: Option<Result<T, ApiError>>, load: Fut) -> Self
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if let Some(outcome) = cached {
      return Self {
        state: outcome.into(),
        receiver: None,
      };
    }

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let result = load.await;
      // Ignore send errors - the view may have been dropped
      let _ = tx.send(result);
    });

    Self {
      state: ViewState::Loading,
      receiver: Some(rx),
    }
  }

  /// A view that already has its outcome.
  pub fn ready(outcome: Result<T, ApiError>) -> Self {
    Self {
      state: outcome.into(),
      receiver: None,
    }
  }

  pub fn state(&self) -> &ViewState<T> {
    &self.state
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Poll for the result of a pending load without blocking.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.state = result.into();
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = ViewState::Failed("Load was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Wait for a pending load to finish.
  pub async fn settle(&mut self) {
    let Some(receiver) = &mut self.receiver else {
      return;
    };

    self.state = match receiver.recv().await {
      Some(result) => result.into(),
      None => ViewState::Failed("Load was cancelled".to_string()),
    };
    self.receiver = None;
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for View<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("View")
      .field("state", &self.state)
      .field("pending", &self.receiver.is_some())
      .finish()
  }
}
