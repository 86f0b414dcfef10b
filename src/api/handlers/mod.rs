pub mod health;
pub mod overview;
pub mod calculators;
pub mod charts;
pub mod catalog;

pub use health::health_check;
pub use overview::get_summary;
pub use calculators::*;
pub use charts::*;
pub use catalog::*;
