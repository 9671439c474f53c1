// FILE: src/core/mod.rs

pub mod constants;
pub mod directive;
pub mod file;
pub mod resolver;

pub use constants::*;
pub use directive::{Arguments, Directive};
pub use file::{FileData, FileId, SourceFile};
pub use resolver::resolve_reference;
