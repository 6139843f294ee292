//! These models represent the objects passed around by the agent
//!
//! A session keeps its history as a [`conversation::Conversation`] of [`message::Message`]s.
//! Providers translate that history into whatever wire format their backend speaks and
//! translate the backend reply back into a [`crate::providers::base::ModelTurn`]. Nothing
//! outside a provider should depend on a backend's message shape.
pub mod content;
pub mod conversation;
pub mod message;
pub mod role;
pub mod tool;
