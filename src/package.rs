//! Package descriptor information, read from the manifest at compile time.

use serde::Serialize;

/// The metadata this package declares in its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub authors: &'static str,
    pub rust_version: &'static str,
}

/// Returns the package descriptor of this crate.
pub fn info() -> PackageInfo {
    PackageInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        authors: env!("CARGO_PKG_AUTHORS"),
        rust_version: env!("CARGO_PKG_RUST_VERSION"),
    }
}
