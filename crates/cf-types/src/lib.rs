pub mod color;
pub mod config;
pub mod errors;
pub mod events;
pub mod rates;

pub use color::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use rates::*;
