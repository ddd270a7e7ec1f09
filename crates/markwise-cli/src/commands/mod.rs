pub mod grade;
pub mod init;
pub mod list_judges;
pub mod progress;
