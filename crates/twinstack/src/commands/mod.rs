pub mod down;
pub mod init;
pub mod plan;
pub mod status;
pub mod tasks;
pub mod up;
pub mod validate;
