pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod parse;
pub mod source;
pub mod status;
pub mod util;

pub use error::{Error, Result};
