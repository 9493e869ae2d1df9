pub mod check_waiter;
pub mod delivery;
pub mod dependency_updater;
pub mod lock_refresher;
pub mod project_scanner;
pub mod runtime_pin;

pub use check_waiter::{SystemClock, WaitPolicy};
pub use delivery::{DeliveryAgent, DeliveryOutcome};
pub use dependency_updater::DependencyUpdater;
pub use lock_refresher::LockRefreshAgent;
pub use project_scanner::{ProjectInfo, ProjectScannerAgent};
pub use runtime_pin::RuntimePinAgent;
