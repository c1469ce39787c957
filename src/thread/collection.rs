use std::sync::OnceLock;

use super::tree::CommentTree;
use crate::models::Comment;

#[derive(Debug, Default)]
pub struct CommentCollection {
    comments: Vec<Comment>,
    version: u64,
    tree: OnceLock<CommentTree>,
}

impl CommentCollection {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            comments,
            version: 0,
            tree: OnceLock::new(),
        }
    }

    pub fn as_slice(&self) -> &[Comment] {
        &self.comments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.comments.iter()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: i64) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn tree(&self) -> &CommentTree {
        self.tree.get_or_init(|| CommentTree::build(&self.comments))
    }

    pub fn create(&mut self, comment: Comment) {
        self.comments.insert(0, comment);
        self.changed();
    }

    pub fn update(&mut self, id: i64, message: impl Into<String>) -> bool {
        let Some(comment) = self.comments.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        comment.message = message.into();
        self.changed();
        true
    }

    // Replies stay behind, unreachable from the roots.
    pub fn delete(&mut self, id: i64) -> bool {
        let Some(index) = self.comments.iter().position(|c| c.id == id) else {
            return false;
        };
        self.comments.remove(index);
        self.changed();
        true
    }

    pub fn toggle_like(&mut self, id: i64, add_like: bool) -> bool {
        let Some(comment) = self.comments.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if add_like {
            comment.like_count += 1;
        } else {
            comment.like_count -= 1;
        }
        comment.liked_by_me = add_like;
        self.changed();
        true
    }

    fn changed(&mut self) {
        self.version += 1;
        self.tree = OnceLock::new();
    }
}

impl From<Vec<Comment>> for CommentCollection {
    fn from(comments: Vec<Comment>) -> Self {
        Self::new(comments)
    }
}

impl<'a> IntoIterator for &'a CommentCollection {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
