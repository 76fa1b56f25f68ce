// Domain layer - Plain data types shared by every other layer
pub mod aggregation;
pub mod errors;
pub mod reading;
pub mod sensor;
pub mod statistics;
