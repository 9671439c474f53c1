// FILE: src/compiler/directives/mod.rs

// Built-in directive handlers. Registration order is the order in which the
// main loop visits handlers within each phase.

mod conditional;
mod master;
mod module;
mod parent;
mod require;
mod uglify;
mod visibility;

pub use conditional::IfHandler;
pub use master::MasterHandler;
pub use module::ModuleHandler;
pub use parent::ParentHandler;
pub use require::RequireHandler;
pub use uglify::{CommandMinifier, Minifier, UglifyHandler};
pub use visibility::VisibilityHandler;

use crate::compiler::DirectiveHandler;
use std::rc::Rc;

pub fn default_handlers() -> Vec<Rc<dyn DirectiveHandler>> {
    vec![
        Rc::new(RequireHandler),
        Rc::new(ParentHandler),
        Rc::new(MasterHandler),
        Rc::new(IfHandler),
        Rc::new(ModuleHandler),
        Rc::new(VisibilityHandler),
        Rc::new(UglifyHandler::default()),
    ]
}
