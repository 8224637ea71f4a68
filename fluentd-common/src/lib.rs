pub mod annotations;
pub mod constants;
pub mod errors;
pub mod kubernetes;
pub mod traits;
