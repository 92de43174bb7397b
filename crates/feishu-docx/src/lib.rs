//! Feishu docx client and block adder.
//!
//! [`DocumentApi`] abstracts the REST calls; [`DocxClient`] implements them
//! with `reqwest`, token handling from `feishu-auth`, and retries.
//! [`BlockAdder`] turns parsed blocks into those calls, one block at a time.

pub mod adder;
pub mod api;
pub mod client;
pub mod error;
pub mod retry;
pub mod table;

pub use adder::{AddResult, BlockAdder, BlockFailure};
pub use api::DocumentApi;
pub use client::DocxClient;
pub use error::{DocxError, Result};
pub use retry::RetryPolicy;
pub use table::{TableTree, build_table};
