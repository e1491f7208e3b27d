//! Weiss Schwarz card data toolchain: normalize scraped card records,
//! load them into a local SQLite catalog, and post-process exports.

pub mod characters;
pub mod cli;
pub mod ingest;
pub mod normalize;
pub mod repair;
pub mod store;

pub mod util {
    pub mod env;
}
