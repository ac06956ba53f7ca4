//! Identity newtypes, consumer credentials, and Evernote token records.

pub mod credentials;
pub mod id;
pub mod token;

pub use credentials::*;
pub use id::*;
pub use token::{record::*, secret::*};
