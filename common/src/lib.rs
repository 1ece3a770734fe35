//! Types and helpers shared by every fathom crate.
//!
//! Nothing in here touches the network. The protocol codecs live in
//! `fathom-protocols` and the clients that drive them live in `fathom-core`.

pub mod config;
pub mod models;
pub mod network;

#[doc(hidden)]
pub use tracing as __tracing;

/// Logs an informational line.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!($($arg)*)
    };
}

/// Logs an informational line that the terminal renders as a success.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(status = "success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::__tracing::debug!($($arg)*)
    };
}
