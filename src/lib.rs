#[macro_use]
extern crate lazy_static;

pub mod cipher;
pub mod convert;
pub mod error;
pub mod onepif;
pub mod primary;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod secondary;

pub use error::{ConvertError, Result};
