//! Business logic services

pub mod geo;
pub mod planning;
pub mod routing;
