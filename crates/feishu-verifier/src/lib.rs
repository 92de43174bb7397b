//! Headless-browser verification of created documents.
//!
//! [`Browser`] speaks just enough of the Chrome DevTools Protocol to open a
//! page, evaluate expressions, and take a screenshot. [`Verifier`] uses it
//! to check that a document URL loads with a title.

pub mod browser;
pub mod error;
pub mod verifier;

pub use browser::{Browser, BrowserOptions, Page};
pub use error::{Result, VerifyError};
pub use verifier::{VerifyResult, Verifier, clean_title};
