pub mod attachments;
pub mod backup;
