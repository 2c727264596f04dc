mod activation;
mod license;
mod message;
mod order;

pub use activation::*;
pub use license::*;
pub use message::*;
pub use order::*;
