pub mod quotes;
pub mod table;
