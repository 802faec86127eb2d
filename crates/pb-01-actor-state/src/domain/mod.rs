pub mod codec;
pub mod entities;
pub mod errors;

pub use codec::*;
pub use entities::*;
pub use errors::*;
