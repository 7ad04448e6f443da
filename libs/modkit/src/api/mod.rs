pub mod problem;
pub mod response;
