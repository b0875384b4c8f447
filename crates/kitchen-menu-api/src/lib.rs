
mod dish;
mod menu;
mod search;
pub mod pdf;

pub use dish::*;
pub use menu::*;
pub use search::*;
