pub mod assessment;

pub use assessment::*;
