pub mod commands;
pub mod console;
pub mod error;
pub mod keeper;
pub mod runtime;
pub mod utils;
