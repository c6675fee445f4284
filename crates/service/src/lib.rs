pub mod parser;
pub mod validation;
