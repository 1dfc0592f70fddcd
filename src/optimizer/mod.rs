//! # Optimizer Module
//!
//! Orchestrazione del batch, separata in sottomoduli:
//! - `dispatcher`: Scansione dell'albero e sottomissione dei job
//! - `task`: Worker per singoli job
//! - `aggregator`: Unico proprietario dei totali del batch
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod aggregator;
pub mod dispatcher;
pub mod path_resolver;
pub mod task;

pub use aggregator::Aggregator;
pub use dispatcher::{start_batch, BatchHandle, MediaCompressor};
pub use path_resolver::PathResolver;
pub use task::JobRunner;
