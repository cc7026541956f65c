//! Seams between the handlers and the outside world.
//!
//! Each trait is synchronous; the AWS and HTTP implementations bridge onto the
//! Lambda runtime's Tokio executor with [`block_on`].

pub mod aws_s3;
pub mod aws_waf;
pub mod callback;
pub mod firewall;
pub mod http;
pub mod object_store;
pub mod origin;

use std::future::Future;

/// Drives `future` to completion from synchronous handler code running on a
/// multi-thread Tokio runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
