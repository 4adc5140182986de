pub mod discord;
pub mod ingress;
pub mod relay;
pub mod resolver;
pub mod staging;
