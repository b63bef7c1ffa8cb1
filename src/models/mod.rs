pub mod channel;
pub mod exemplar;
pub mod material;
pub mod outputs;
pub mod stage;
pub mod task;

pub use channel::*;
pub use exemplar::*;
pub use material::*;
pub use outputs::*;
pub use stage::*;
pub use task::*;
