pub mod relay;
pub mod staging;
