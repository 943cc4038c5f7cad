pub mod config;
pub mod error;
pub mod flatnames;
pub mod reader;
pub mod store;
pub mod trace;
pub mod writer;
