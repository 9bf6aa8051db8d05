//! Handling of secret values.
//!
//! This module provides a `Secret<T>` ensuring that sensitive values are not `Debug`-printed by
//! accident, and that their bytes are overwritten when the secret is cleared or dropped.

use std::fmt::{Debug, Formatter};

/// Values whose memory can be overwritten before it is released.
pub trait Wipe {
    /// Overwrite the content and leave `self` empty.
    fn wipe(&mut self);
}

impl Wipe for Vec<u8> {
    fn wipe(&mut self) {
        self.fill(0);
        std::hint::black_box(self.as_slice());
        self.clear();
    }
}

impl Wipe for String {
    fn wipe(&mut self) {
        std::mem::take(self).into_bytes().wipe();
    }
}

/// A wrapper to ensure that secrets are redacted during `Debug`-printing and wiped afterwards.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Secret<T: Wipe>(T);

impl<T: Wipe> Secret<T> {
    /// Create a new secret.
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Expose the inner secret.
    pub fn declassify(&self) -> &T {
        &self.0
    }
}

impl<T: Wipe> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Wipe> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.wipe();
    }
}

impl<T> Debug for Secret<T>
where
    T: Debug + Wipe,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        #[cfg(not(debug_assertions))]
        return write!(f, "/* REDACTED */");
        #[cfg(debug_assertions)]
        return self.0.fmt(f);
    }
}
