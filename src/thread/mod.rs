pub mod collection;
pub mod session;
pub mod tree;
pub mod ui;

use thiserror::Error;

use crate::client::ApiError;

pub use collection::CommentCollection;
pub use session::{PendingCreate, PendingEdit, PendingTarget, PostSession};
pub use tree::CommentTree;
pub use ui::{CommentUiState, Control, OperationState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("comment {0} is not part of this post")]
    UnknownComment(i64),
    #[error("{0:?} is already in flight")]
    Busy(Control),
    #[error(transparent)]
    Api(#[from] ApiError),
}
