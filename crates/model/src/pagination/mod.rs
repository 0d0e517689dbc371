pub mod cursor;
pub mod sort;
