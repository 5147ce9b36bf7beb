//! Bus backends for `movepool`.
//!
//! Implementations of [`Transport`](crate::device::Transport).
//!
//! # Feature flags
//! - **`hid`**: PS Move controllers through hidapi (default).
//!
//! The [`virtual_bus`] backend is always available. It is what the test suite runs against.

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

pub mod virtual_bus;
