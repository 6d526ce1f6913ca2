pub mod diagrams;
pub mod frontend;
pub mod geometry;
pub mod map_view;
pub mod relations;
pub mod routes;
pub mod view_state;
pub mod worker;
