pub mod collect;
pub mod commons;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod route_card;

pub use error::{Result, RouteCardError};
