pub mod hit;
pub mod row;
pub mod table;
