pub mod error;
pub mod executable_utils;
pub mod extractor;
pub mod model;
pub mod storage;
pub mod ui_model;
pub mod visit_time;
