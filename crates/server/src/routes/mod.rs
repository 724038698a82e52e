pub mod access;
pub mod clarifications;
pub mod health;
pub mod issuance;
pub mod review;
