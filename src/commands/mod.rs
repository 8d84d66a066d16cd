pub mod refresh;
pub mod reset;
