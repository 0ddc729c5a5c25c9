pub mod contracts;
pub mod executor;

pub use contracts::*;
pub use executor::*;
