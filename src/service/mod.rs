//! Business logic layer

pub mod routing;
pub mod rule;

pub use routing::RoutingService;
pub use rule::RuleService;
