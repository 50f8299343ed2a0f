//! Ambient services shared by the stakeline binaries.

pub mod logging;
