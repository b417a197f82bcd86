//! Logging macro shim.
//!
//! This mod must be declared first in `lib.rs` so the other modules can see its macros.

#[allow(unused)]
macro_rules! trace {
    ($s:literal $(, $args:expr)* $(,)?) => {
        #[cfg(feature = "log")]
        ::log::trace!($s $(, $args)*);
    };
}

#[allow(unused)]
macro_rules! debug {
    ($s:literal $(, $args:expr)* $(,)?) => {
        #[cfg(feature = "log")]
        ::log::debug!($s $(, $args)*);
    };
}

#[allow(unused)]
macro_rules! info {
    ($s:literal $(, $args:expr)* $(,)?) => {
        #[cfg(feature = "log")]
        ::log::info!($s $(, $args)*);
    };
}

#[allow(unused)]
macro_rules! warn_impl {
    ($s:literal $(, $args:expr)* $(,)?) => {
        #[cfg(feature = "log")]
        ::log::warn!($s $(, $args)*);
    };
}

#[allow(unused)]
macro_rules! error {
    ($s:literal $(, $args:expr)* $(,)?) => {
        #[cfg(feature = "log")]
        ::log::error!($s $(, $args)*);
    };
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use info;
pub(crate) use trace;
pub(crate) use warn_impl as warn;
