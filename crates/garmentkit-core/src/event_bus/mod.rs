//! # Event Bus Module
//!
//! Publish/subscribe channel between the design engine and its hosts.
//!
//! ## Overview
//!
//! - The engine publishes typed [`DesignEvent`]s without knowing who listens
//! - Hosts filter by [`EventCategory`] and react (repaint, refresh layer UI)
//! - Synchronous handlers and async `broadcast` receivers are both supported
//!
//! ## Usage
//!
//! ```rust,ignore
//! use garmentkit_core::event_bus::{EventBus, EventCategory, EventFilter, DesignEvent, TextureEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Texture]),
//!     |event| {
//!         if let DesignEvent::Texture(TextureEvent::Published { part, .. }) = event {
//!             println!("repaint {}", part);
//!         }
//!     },
//! );
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
