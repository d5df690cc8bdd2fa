pub mod ask;
pub mod banks;
pub mod clear;
pub mod init;
pub mod quiz;
pub mod settings;
pub mod stats;
pub mod study;
pub mod validate;
