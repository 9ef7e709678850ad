//! Sales Funnel
//!
//! The board projection, its store, drag gesture rules and display helpers.

mod board;
mod display;
mod gesture;
mod store;

pub use board::*;
pub use display::*;
pub use gesture::*;
pub use store::*;
