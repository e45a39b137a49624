//! Interactive chat: the teaching workflow and its console front end.

mod console;
mod workflow;

pub use console::*;
pub use workflow::*;
