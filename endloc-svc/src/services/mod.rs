//! Core services for endloc-svc

pub mod inventory_client;
pub mod location_resolver;
pub mod reconciler;
pub mod reference_store;
pub mod token_manager;

pub use inventory_client::{InventoryClient, SearchError, SearchOutcome};
pub use location_resolver::{resolve, resolve_item};
pub use reconciler::{ApplyReport, ChangedFields, NewRecord, WriteOp};
pub use reference_store::{
    CsvHttpSource, ReferenceError, ReferenceSnapshot, ReferenceSource, ReferenceStore, TableKind,
};
pub use token_manager::{Credential, TokenError, TokenManager, TokenState};
