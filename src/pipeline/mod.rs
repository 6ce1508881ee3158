//! Stateful stages of the guard: analyzers, the form guard, the banner,
//! alert hand-off and the loops that drive them.

pub mod alert;
pub mod forms;
pub mod guard;
pub mod links;
pub mod presenter;
pub mod reporter;
pub mod sanitize;
pub mod scanner;
pub mod watcher;

pub use forms::analyze_form;
pub use links::analyze_links;
