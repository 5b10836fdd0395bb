//! Services module
//!
//! Business logic. Services own authorization, validation and the
//! per-vehicle serialization; storage is reached only through
//! [`crate::repositories::FleetStore`].

pub mod activity_service;
pub mod alert_service;
pub mod authorization_service;
pub mod maintenance_service;
pub mod mileage_service;
pub mod settings_service;
pub mod threshold_evaluator;
pub mod vehicle_locks;
pub mod vehicle_service;

pub use activity_service::{ActivityService, ActivitySink, FanoutActivitySink, StoreActivitySink, WebhookActivitySink};
pub use alert_service::AlertService;
pub use authorization_service::AuthorizationService;
pub use maintenance_service::MaintenanceService;
pub use mileage_service::{MileageService, RecordedMileage};
pub use settings_service::{InMemorySettings, SettingsProvider, SettingsService};
pub use vehicle_locks::VehicleLocks;
pub use vehicle_service::VehicleService;
