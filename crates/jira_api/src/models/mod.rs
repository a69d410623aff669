mod ticket;
mod user;
mod worklog;

pub use ticket::{
    IssueType, RawIssue, SearchResponse, StatusCategory, Ticket, TicketStatus,
};
pub use user::{Myself, PermissionGrant, PermissionsResponse};
pub(crate) use worklog::WorklogCreateRequest;
pub use worklog::{RichTextDocument, RichTextNode, TimeSpent, WorklogAuthor, WorklogEntry, WorklogList};
