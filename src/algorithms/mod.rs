pub mod dispatch;
pub mod distance;
pub mod extremal;
pub mod gpd;
pub mod gpd_mle;
pub mod indexes;
pub mod local_dimension;
pub mod threshold;
