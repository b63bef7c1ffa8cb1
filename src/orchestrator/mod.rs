pub mod checkpoints;
pub mod confirm;
pub mod engine;
pub mod locks;
pub mod notify;

pub use checkpoints::*;
pub use confirm::*;
pub use engine::*;
pub use locks::*;
pub use notify::*;
