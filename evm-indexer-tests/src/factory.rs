mod chain;
mod json_rpcs;
mod records;

pub use chain::*;
pub use json_rpcs::*;
pub use records::*;
