pub mod display_server;
pub mod paths;
pub mod process;
pub mod shell;
