//! Access-token model and the request authenticator that attaches it.

pub mod authenticator;
pub mod token;

pub use authenticator::*;
pub use token::*;
