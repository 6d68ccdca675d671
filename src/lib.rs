// Library surface shared by the binary and the headless tests.
pub mod app_dirs;
pub mod bank;
pub mod config;
pub mod loader;
pub mod logging;
pub mod markdown;
pub mod question;
pub mod runtime;
pub mod session;
pub mod sound;
pub mod source;
pub mod subject;
