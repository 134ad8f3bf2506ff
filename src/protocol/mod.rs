pub mod chunked;
pub mod commands;
