mod factory;
mod mini_cluster;
mod wait;
pub use factory::*;
pub use mini_cluster::*;
pub use wait::WaitOutcome;
