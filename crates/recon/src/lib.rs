//! `payeekit-recon` - payee row-mapping and classification reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded rows, returns mapped rows.
//! The classification oracle is a trait seam; no HTTP or file IO here.

pub mod chunk;
pub mod classify;
pub mod config;
pub mod error;
pub mod evidence;
pub mod model;
pub mod reconcile;
pub mod row_map;
pub mod standardize;

pub use chunk::{merge_chunk_results, split_for_submission, Chunk};
pub use classify::{classify_payees, ClassificationOracle};
pub use config::ClassificationConfig;
pub use error::ReconError;
pub use model::{
    Classification, ClassificationResult, ClassificationStatus, MappedRow, PayeeRowData,
    ProcessingTier, Record, RowMapping,
};
pub use reconcile::{reconcile, reconcile_cooperative};
pub use row_map::{create_row_mapping, create_row_mapping_cooperative};
pub use standardize::{standardize, CleaningStep, StandardizationResult};
