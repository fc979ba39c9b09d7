//! Origin HTTP plumbing.
//!
//! [`OriginRequest::build`] turns a byte window into a GET with the right
//! `Range` header, an [`OriginClient`] sends it, and [`OriginResponse`] exposes
//! the headers the resolvers care about plus a lazily read body.

pub mod client;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod request;
pub mod response;

pub use client::{HttpOriginClient, OriginClient};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockOriginClient, MockReply};
pub use request::{ByteWindow, OriginRequest};
pub use response::{ByteStream, OriginResponse};
