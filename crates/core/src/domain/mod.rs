pub mod category;
pub mod level;
pub mod stock;
