use std::collections::HashMap;

use crate::models::Comment;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentTree {
    groups: HashMap<Option<i64>, Vec<Comment>>,
}

impl CommentTree {
    pub fn build(comments: &[Comment]) -> Self {
        let mut groups: HashMap<Option<i64>, Vec<Comment>> = HashMap::new();
        for comment in comments {
            groups
                .entry(comment.parent_id)
                .or_default()
                .push(comment.clone());
        }
        Self { groups }
    }

    pub fn children_of(&self, parent_id: Option<i64>) -> &[Comment] {
        self.groups
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn roots(&self) -> &[Comment] {
        self.children_of(None)
    }

    pub fn replies(&self, comment_id: i64) -> &[Comment] {
        self.children_of(Some(comment_id))
    }

    pub fn groups(&self) -> impl Iterator<Item = (Option<i64>, &[Comment])> {
        self.groups
            .iter()
            .map(|(parent_id, children)| (*parent_id, children.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
