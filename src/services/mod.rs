pub mod activity_api_service;
pub mod activity_detail_service;
pub mod activity_guards;
pub mod application_service;
pub mod cancellation_service;
pub mod gateway;
pub mod hosting_service;
pub mod in_flight;
pub mod local_gateway;
pub mod participation_service;
pub mod rating_service;
pub mod session;
