//! Pure page and URL rules. Nothing here touches the DOM or holds state.

pub mod brand;
pub mod destination;
pub mod patterns;
pub mod relevance;

pub use brand::looks_like_brand;
pub use destination::is_legitimate_domain;
pub use relevance::should_process;
