pub mod endpoint;
pub mod http;
pub mod traits;
pub mod types;

pub use endpoint::{is_loopback_host, resolve_base_url};
pub use http::HttpBackend;
pub use traits::PlannerBackend;
pub use types::{
    FreeWindow, OptimizeRequest, OptimizeResponse, ParseRequest, ParseResponse, ScheduleRequest,
};
