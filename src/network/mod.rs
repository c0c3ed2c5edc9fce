pub mod model;
pub mod network;

pub use model::Model;
pub use network::Network;
