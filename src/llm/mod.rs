pub mod backend;
pub mod client;
pub mod prompts;

pub use backend::*;
pub use client::*;
pub use prompts::*;
