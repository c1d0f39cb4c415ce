pub mod config;
pub mod error;
pub mod ini;

pub use config::Config;
pub use error::*;
pub use ini::{ConfigAction, ConfigDocument, ConfigSection, ConfigStore, ConfigTree};
