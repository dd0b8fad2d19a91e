//! Filter enums shared by list commands

use clap::ValueEnum;

use crate::core::entity::Status;

/// Status filter for list commands
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Draft records only
    Draft,
    /// Issued records only
    Issued,
    /// Obsolete records only
    Obsolete,
    /// Everything except obsolete - default
    #[default]
    Active,
    /// All statuses including obsolete
    All,
}

impl StatusFilter {
    /// Check if a Status matches this filter
    pub fn matches(&self, status: Status) -> bool {
        match self {
            StatusFilter::Draft => status == Status::Draft,
            StatusFilter::Issued => status == Status::Issued,
            StatusFilter::Obsolete => status == Status::Obsolete,
            StatusFilter::Active => status != Status::Obsolete,
            StatusFilter::All => true,
        }
    }
}
