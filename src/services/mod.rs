pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService, ImportedShow};
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod engagement_service;
pub mod engagement_service_impl;
pub use engagement_service::{EngagementError, EngagementService};
pub use engagement_service_impl::SeaOrmEngagementService;

pub mod search;
pub use search::{SearchEngine, SearchField, SearchHit};

pub mod upload;
pub use upload::{UploadError, UploadService};

pub mod scheduler;
pub use scheduler::Scheduler;
