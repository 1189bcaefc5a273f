pub mod core;
pub mod error;
pub mod factors;
pub mod gp;
pub mod kinematics;
pub mod linalg;
pub mod logger;
pub mod manifold;
pub mod optimizer;
pub mod planner;
pub mod sdf;

pub use error::{PlannerError, PlannerResult};
pub use logger::{init_logger, init_logger_with_level};
