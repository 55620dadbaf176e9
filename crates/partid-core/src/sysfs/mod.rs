//! sysfs-backed OS geometry source.

pub mod block;
