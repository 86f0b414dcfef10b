pub mod clean;
pub mod grouping;
pub mod growth;
pub mod correlation;
pub(crate) mod linalg;
pub mod regression;
pub mod diagnostics;
pub mod summary;
pub mod views;

pub use clean::*;
pub use grouping::*;
pub use growth::*;
pub use correlation::*;
pub use regression::*;
pub use diagnostics::*;
pub use summary::*;
pub use views::*;
