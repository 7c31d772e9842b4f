pub mod aggregate;
pub mod classify;

pub use aggregate::{evaluate, ClassificationResult, Evaluation, StockScore};
pub use classify::{classify, tier};
