//! Utility modules

pub mod shm;
