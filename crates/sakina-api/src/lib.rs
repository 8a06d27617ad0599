pub mod posts;
pub mod reactions;
pub mod responses;
pub mod routes;
pub mod state;
