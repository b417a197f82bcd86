//! Concrete, `std`-only link device implementations.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxLinkDevice;
