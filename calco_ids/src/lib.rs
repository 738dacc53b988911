pub mod ids;
pub mod uid;

pub use ids::*;
pub use uid::*;
