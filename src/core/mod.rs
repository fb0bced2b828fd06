//! Core hook types.

mod builder;
mod detect;
mod hook;
mod validation;

pub use builder::ChangeNotifyHookBuilder;
pub use detect::{FieldChange, detect_change};
pub use hook::{ChangeNotifyHook, NotifyOutcome, UpdateReport};
pub use validation::Validate;
