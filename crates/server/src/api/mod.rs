pub mod catalog;
pub mod quotes;
