//! Type definitions

pub mod assignment;
pub mod coordinates;
pub mod fleet;
pub mod messages;
pub mod parcel;
pub mod plan;
pub mod route;
pub mod shift;

pub use assignment::*;
pub use coordinates::*;
pub use fleet::*;
pub use messages::*;
pub use parcel::*;
pub use plan::*;
pub use route::*;
pub use shift::*;
