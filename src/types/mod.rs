//! Type definitions

pub mod contact;
pub mod import;
pub mod messages;
pub mod spreadsheet;
pub mod template;

pub use contact::*;
pub use import::*;
pub use messages::*;
pub use spreadsheet::*;
pub use template::*;
