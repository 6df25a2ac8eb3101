pub mod constants;
pub mod data;
pub mod examples;
pub mod generation;
