//! Page model and shared types.

pub mod dom;
pub mod error;
#[cfg(feature = "html")]
pub mod html;
pub mod page;
pub mod time;
pub mod types;
