pub mod calibrate;
pub mod info;
pub mod init_config;
pub mod synth;
pub mod track;
