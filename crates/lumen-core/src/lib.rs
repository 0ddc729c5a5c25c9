pub mod actions;
pub mod clock;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod reducer;
pub mod state;
pub mod storage;
pub mod ticker;
pub mod tools;
pub mod usage;

pub use actions::*;
pub use reducer::*;
pub use state::*;
