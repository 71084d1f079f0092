pub mod compose;
pub mod import;
pub mod retrieve;
pub mod visualize;

pub use compose::{caption, compose};
pub use import::import;
pub use retrieve::retrieve;
pub use visualize::visualize;
