mod tracker_errors;
mod validation_errors;

pub use tracker_errors::*;
pub use validation_errors::*;
