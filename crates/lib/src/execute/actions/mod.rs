//! Built-in action implementations.

pub mod cmd;
pub mod extract;
pub mod fetch;
pub mod install;

pub use cmd::execute_cmd;
pub use extract::execute_extract;
pub use fetch::{execute_fetch, url_to_filename};
pub use install::execute_install;
