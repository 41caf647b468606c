pub mod compare;
pub mod document;
pub mod face;
pub mod liveness;
pub mod start;
pub mod status;
pub mod terminate;
