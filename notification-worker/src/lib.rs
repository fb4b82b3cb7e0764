pub mod config;
pub mod sender;
pub mod template;
pub mod worker;
