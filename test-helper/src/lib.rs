//! Shared helpers for fogfn integration tests.

mod addr;
mod responder;

pub use addr::get_unused_addr;
pub use responder::Responder;
