pub mod core;
pub mod error;
pub mod pagination;
pub mod records;
pub mod search;
