pub mod evaluation;
pub mod response;
