//! Ordered error aggregate.
//!
//! Option application and shutdown both keep going after a failure and report
//! every error at the end. [`MultiError`] is the value that carries them: an
//! ordered list that is only ever surfaced as an error when non-empty.

use std::fmt;

/// An ordered, non-short-circuiting collection of errors.
#[derive(Debug)]
pub struct MultiError<E> {
    errors: Vec<E>,
}

impl<E> Default for MultiError<E> {
    fn default() -> Self {
        Self { errors: Vec::new() }
    }
}

impl<E> MultiError<E> {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single error.
    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    /// Moves every error out of `other`, preserving order.
    pub fn extend(&mut self, other: MultiError<E>) {
        self.errors.extend(other.errors);
    }

    /// Number of aggregated errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates the errors in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Consumes the aggregate, returning the underlying errors.
    pub fn into_vec(self) -> Vec<E> {
        self.errors
    }
}

impl<E> FromIterator<E> for MultiError<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for MultiError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a MultiError<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl<E: fmt::Display> fmt::Display for MultiError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("no errors"),
            [single] => fmt::Display::fmt(single, f),
            errors => {
                write!(f, "{} errors occurred: ", errors.len())?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    fmt::Display::fmt(err, f)?;
                }
                Ok(())
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for MultiError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Fail(&'static str);

    impl fmt::Display for Fail {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Fail {}

    #[test]
    fn test_empty_is_ok() {
        let errors: MultiError<Fail> = MultiError::new();
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_preserves_order() {
        let mut errors = MultiError::new();
        errors.push(Fail("first"));
        errors.push(Fail("second"));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.to_string(), "2 errors occurred: first; second");
        assert_eq!(err.into_vec(), vec![Fail("first"), Fail("second")]);
    }

    #[test]
    fn test_single_error_display() {
        let errors: MultiError<_> = std::iter::once(Fail("only")).collect();
        assert_eq!(errors.to_string(), "only");
    }

    #[test]
    fn test_extend_moves_all() {
        let mut left: MultiError<_> = vec![Fail("a")].into_iter().collect();
        let right: MultiError<_> = vec![Fail("b"), Fail("c")].into_iter().collect();
        left.extend(right);
        assert_eq!(left.len(), 3);
        assert_eq!(left.iter().map(|e| e.0).collect::<Vec<_>>(), ["a", "b", "c"]);
    }
}
