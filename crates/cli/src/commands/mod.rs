pub mod diagnose;
pub mod status;
