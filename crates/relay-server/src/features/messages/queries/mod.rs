//! Read operations over the MessageBox

pub mod get_message;
pub mod list_pending;

pub use get_message::GetMessageQuery;
pub use list_pending::ListPendingQuery;
