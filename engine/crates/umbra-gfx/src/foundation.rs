pub mod device;
pub mod instance;
pub mod naming;
pub mod physical_device;
pub mod validation;
