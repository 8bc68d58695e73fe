//! Synchronous typed event dispatch for composed UI components.
//!
//! The crate owns the dispatch-target tree, listener registration, the single-shot
//! dispatch engine, and the component registry. All execution is single-threaded
//! and synchronous: a dispatch call returns only after every listener along the
//! propagation path has run on the calling thread.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod dispatch;
pub mod model;
pub mod registry;

pub use dispatch::{DispatchError, EventContext};
pub use model::{EventTree, ListenerCallback, ListenerId, TargetId};
pub use registry::{BaseKind, ComponentRegistry, ComponentSpec, ComponentTag, RegistryError};
