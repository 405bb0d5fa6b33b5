mod digest;
mod id;
pub(crate) mod peer;
mod routing_table;

pub use digest::*;
pub use id::*;
pub use peer::*;
pub use routing_table::*;
