pub mod types;
pub mod fields;
pub mod machine;

pub use types::*;
pub use machine::*;
