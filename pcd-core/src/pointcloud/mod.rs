pub mod header;
pub mod point;
