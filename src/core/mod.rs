//! Core module - calculation engine, identity, project and storage

pub mod budget;
pub mod config;
pub mod entity;
pub mod identity;
pub mod project;
pub mod shortid;
pub mod store;
pub mod uncertainty;

pub use budget::{BudgetTable, Direction, LabConstants};
pub use config::Config;
pub use entity::{Entity, Status};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use shortid::ShortIdIndex;
pub use store::StoreError;
pub use uncertainty::{calculate, CalcError, MeasurementSet, UncertaintyBudget};
