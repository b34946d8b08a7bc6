pub mod change;
pub mod conductor;
pub mod controller;
pub mod debounce;
pub mod document;
pub mod dom;
pub mod registry;
pub mod token;
pub mod trigger;

pub use change::*;
pub use conductor::*;
pub use controller::*;
pub use debounce::*;
pub use document::*;
pub use dom::*;
pub use registry::*;
pub use token::*;
pub use trigger::*;
