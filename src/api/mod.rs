//! HTTP API handlers

pub mod health;
pub mod riffs;
pub mod similarity;

pub use health::health_routes;
pub use riffs::riff_routes;
pub use similarity::similarity_routes;
