// src/models/mod.rs
pub mod creator;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use creator::{
    ApiResponse,
    CachedProfile,
    CreatorCategory,
    CreatorListing,
    Engagement,
    EngagementAction,
    NewWhitelistEntry,
    PaginatedResponse,
    Profile,
    WhitelistEntry,
    WhitelistRow,
};
