pub mod euclidean;
pub mod kind;
pub mod minkowski;
