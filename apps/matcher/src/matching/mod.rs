pub mod aggregate;
pub mod cache;
pub mod extract;
pub mod handlers;
pub mod hashing;
pub mod pipeline;
pub mod prompts;
pub mod requirements;
pub mod scorer;
pub mod service;
pub mod vacancy;

pub use pipeline::{MatchError, Matcher};
