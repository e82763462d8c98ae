pub mod eligibility;
pub mod giav;
pub mod inespay;
pub mod metrics;
pub mod normalizer;
pub mod orchestrator;
pub mod repository;

pub use giav::GiavClient;
pub use inespay::InespayClient;
pub use metrics::{get_metrics, init_metrics};
pub use repository::IntentRepository;
