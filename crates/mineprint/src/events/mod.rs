//! Event system
//!
//! Key principles:
//! - Subscribers are called in the order they were registered
//! - Cascading handlers return [`Propagation`] (`Stop` = consumed/vetoed, stops forwarding)
//! - Registration returns a handle so a subscriber can be removed on its own
//! - Everything runs on the thread that owns the window

pub mod delegate;

pub use delegate::{CascadeOutcome, CascadingDelegate, DelegateHandle, MulticastDelegate, Propagation};
