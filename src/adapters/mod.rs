pub mod confirm;
pub mod exec;

pub use confirm::*;
pub use exec::*;
