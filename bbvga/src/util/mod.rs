//! Support code that isn't specific to video.

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        pub mod armv7m;
    }
}

pub mod loan;
pub mod measurement;
