//! Settings validation support.

use crate::error::ValidationError;

/// Trait for validating settings before they take effect.
///
/// [`HookSettings`](crate::settings::HookSettings) implements it; the hook
/// calls it when built and whenever settings are replaced at runtime.
///
/// # Examples
///
/// ```rust
/// use change_notify::core::Validate;
/// use change_notify::error::ValidationError;
///
/// struct QueueTarget {
///     url: String,
/// }
///
/// impl Validate for QueueTarget {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if !self.url.starts_with("https://") {
///             return Err(ValidationError::invalid_field("url", "must use https"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Validate the value.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
