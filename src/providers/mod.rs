//! Asset data source implementations

pub mod messari;

pub use messari::MessariProvider;
