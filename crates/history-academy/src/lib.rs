// history-academy/src/lib.rs

//! Schema and referential-integrity store for an educational history platform.
//!
//! ```no_run
//! use history_academy::{Database, UserCreate};
//!
//! let db = Database::new_in_memory()?;
//! let user = db.users.create(&UserCreate::new("cleo", "cleo@example.com", "Cleo"))?;
//! assert_eq!(db.users.get(user.id)?, user);
//! # Ok::<(), history_academy::StoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod store;
pub mod telemetry;

pub use config::StoreConfig;
pub use error::StoreError;
pub use schema::*;
pub use store::{Database, DatabaseStats, Deletion, MaintenanceReport, Record, Repository};
