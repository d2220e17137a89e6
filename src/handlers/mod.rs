//! Byte-level state transitions of the registry program.
//!
//! Each handler takes the instruction payload and the raw account buffer and
//! applies exactly what the deployed program does, without any runtime. They
//! pin down the account bytes the client codec has to read back.

pub mod initialize_registry;
pub mod update_metadata;
