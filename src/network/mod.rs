pub mod network;

pub use network::{Gradients, Network};
