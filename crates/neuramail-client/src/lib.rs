//! HTTP client for the NeuraMail backend.
//!
//! Wraps every REST endpoint the product talks to behind typed methods on
//! [`BackendClient`]. Credentials come from the shared session store and the
//! access token is attached as a bearer header on protected routes.

mod client;
mod error;
mod wire;

pub use client::{BackendClient, RequestTimeouts};
pub use error::ClientError;
pub use wire::{ProfileDraft, ReplyRequest};
