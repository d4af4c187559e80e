//! File-transfer channel implementations.

pub mod sftp;

pub use sftp::SftpFiles;
