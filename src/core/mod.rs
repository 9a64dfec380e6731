pub mod config;
pub mod metric;
pub mod point_set;
pub mod tensor;
