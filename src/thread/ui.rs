#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentUiState {
    pub replying: bool,
    pub editing: bool,
    pub children_hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    RootComment,
    Reply(i64),
    Edit(i64),
    Delete(i64),
    ToggleLike(i64),
}

impl Control {
    pub fn comment_id(self) -> Option<i64> {
        match self {
            Self::RootComment => None,
            Self::Reply(id) | Self::Edit(id) | Self::Delete(id) | Self::ToggleLike(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub loading: bool,
    pub error: Option<String>,
}
