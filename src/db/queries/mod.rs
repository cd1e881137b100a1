//! Database queries

pub mod contact;
pub mod spreadsheet;
pub mod template;
