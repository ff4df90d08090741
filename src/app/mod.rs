pub mod error;

pub use error::{PagesiftError, Result};
