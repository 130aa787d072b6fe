pub mod error;
pub mod mgmt;
pub mod options;
