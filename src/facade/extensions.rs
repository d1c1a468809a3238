//! Convenience methods to turn any error (from any library) into facade errors.
use crate::facade::{FacadeError, PublicFace};

pub trait Describe {
    /// Convert an error into a FacadeError by describing it to your users.
    fn describe(self, public: PublicFace) -> FacadeError;
}

impl<Internal: Into<anyhow::Error>> Describe for Internal {
    fn describe(self, public: PublicFace) -> FacadeError {
        FacadeError {
            internal: self.into(),
            public,
        }
    }
}

/// Any regular internal error can be turned into a facade error, using the default
/// public face. If you want to give an internal error a custom public face, use
/// `internal.describe(PublicFace)`.
impl<Internal: Into<anyhow::Error>> From<Internal> for FacadeError {
    fn from(internal: Internal) -> FacadeError {
        internal.describe(Default::default())
    }
}

pub trait DescribeErr<T> {
    /// Convert a result's error into a FacadeError by describing it to your users.
    /// ```rust
    //  // These two are equivalent:
    /// let result = Result<i32, &'static str> = Err("some private internal error").map_err(|e| e.describe(public))
    /// let result = Result<i32, &'static str> = Err("some private internal error").describe_err(public)
    /// ```
    fn describe_err(self, public: PublicFace) -> Result<T, FacadeError>;
}

impl<T, E> DescribeErr<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn describe_err(self, public: PublicFace) -> Result<T, FacadeError> {
        self.map_err(|e| e.describe(public))
    }
}
