//! The notification engine.
//!
//! An [`Observable`] is a topic-scoped publish/notify primitive: multiple
//! processes register local [`Observer`]s and every value published to the
//! topic is delivered to each of them, with the publisher learning within
//! a bounded time whether *all* currently-registered observers received
//! it.
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use o_engine::{MemoryCoordination, Observer, ObservableFactory, Settings};
//!
//! struct LatestNews(parking_lot::Mutex<Option<String>>);
//!
//! #[async_trait]
//! impl Observer<String> for LatestNews {
//!     async fn update(&self, payload: Option<String>) {
//!         *self.0.lock() = payload;
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() {
//!     let settings = Settings::default();
//!     let factory = ObservableFactory::connect(MemoryCoordination::new(), settings)
//!         .await
//!         .unwrap();
//!
//!     let observable = factory.create::<String>("news").await.unwrap();
//!     let observer: Arc<dyn Observer<String>> = Arc::new(LatestNews(parking_lot::Mutex::new(None)));
//!     observable.register_observer(observer.clone()).await;
//!
//!     observable.notify_observers(Some("hello".to_string())).await.unwrap();
//! }
//! ```

mod async_task;
mod cycle;
mod engine;
mod factory;
mod lock;
mod watcher;

pub use async_task::*;
pub use engine::*;
pub use factory::*;
pub use lock::*;

pub(crate) use cycle::*;
pub(crate) use watcher::*;

#[cfg(test)]
mod cycle_test;

use async_trait::async_trait;

/// A local callback receiving every payload published to a topic.
///
/// Deliberately a single-method capability rather than a base type:
/// anything `Send + Sync` that can react to a payload qualifies. `None`
/// is a legal payload and is delivered as such.
#[async_trait]
pub trait Observer<T>: Send + Sync {
    async fn update(&self, payload: Option<T>);
}
