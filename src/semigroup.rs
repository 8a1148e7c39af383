//! Semigroup trait for combining error lists
//!
//! Control-level and group-level errors are combined with an associative
//! append. The default merge policy is exactly `control.combine(group)`, so
//! any custom policy that keeps the ordering guarantee can be checked
//! against the same law.
//!
//! # Examples
//!
//! ```
//! use formgate::Semigroup;
//!
//! let control = vec!["required"];
//! let group = vec!["passwordMismatch"];
//! assert_eq!(control.combine(group), vec!["required", "passwordMismatch"]);
//! ```

/// A type that supports an associative binary operation
///
/// # Laws
///
/// ```text
/// a.combine(b).combine(c) == a.combine(b.combine(c))
/// ```
pub trait Semigroup: Sized {
    /// Combine this value with another value associatively
    fn combine(self, other: Self) -> Self;
}

impl<T> Semigroup for Vec<T> {
    #[inline]
    fn combine(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}
