//! Seed records: the binary format exploration runs start from, and an
//! importer that turns a raw external test case into one.

pub mod format;
pub mod import;

pub use format::{
    is_seed_file, DecodeError, DecodeResult, SeedObject, SeedRecord, CURRENT_VERSION,
};
pub use import::import_raw;
