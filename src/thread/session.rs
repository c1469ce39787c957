use std::collections::HashMap;
use std::fmt::Write as _;

use tokio::sync::watch;

use super::{
    SessionError,
    collection::CommentCollection,
    ui::{CommentUiState, Control, OperationState},
};
use crate::client::{ApiError, CommentsApi};
use crate::models::{Comment, DeletedComment, LikeToggled, PostDetail, UpdatedComment};

#[derive(Debug)]
#[must_use = "finish the operation or the control stays disabled"]
pub struct PendingCreate {
    pub control: Control,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub message: String,
}

#[derive(Debug)]
#[must_use = "finish the operation or the control stays disabled"]
pub struct PendingEdit {
    pub control: Control,
    pub post_id: i64,
    pub comment_id: i64,
    pub message: String,
}

#[derive(Debug)]
#[must_use = "finish the operation or the control stays disabled"]
pub struct PendingTarget {
    pub control: Control,
    pub post_id: i64,
    pub comment_id: i64,
}

// begin_* validates and disables the control; finish_* applies the local
// mutation only when the server result is Ok.
#[derive(Debug)]
pub struct PostSession {
    post_id: i64,
    title: String,
    body: String,
    comments: CommentCollection,
    ui: HashMap<i64, CommentUiState>,
    operations: HashMap<Control, OperationState>,
    revision: watch::Sender<u64>,
}

impl PostSession {
    pub fn new(post_id: i64, post: PostDetail) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            post_id,
            title: post.title,
            body: post.body,
            comments: CommentCollection::new(post.comments),
            ui: HashMap::new(),
            operations: HashMap::new(),
            revision,
        }
    }

    pub async fn load<C>(api: &C, post_id: i64) -> Result<Self, ApiError>
    where
        C: CommentsApi + ?Sized,
    {
        let post = api.fetch_post(post_id).await?;
        tracing::debug!(post_id, comment_count = post.comments.len(), "Post loaded");
        Ok(Self::new(post_id, post))
    }

    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn comments(&self) -> &CommentCollection {
        &self.comments
    }

    pub fn root_comments(&self) -> &[Comment] {
        self.comments.tree().roots()
    }

    pub fn replies(&self, comment_id: i64) -> &[Comment] {
        self.comments.tree().replies(comment_id)
    }

    pub fn visible_replies(&self, comment_id: i64) -> &[Comment] {
        if self.ui_state(comment_id).children_hidden {
            &[]
        } else {
            self.replies(comment_id)
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn ui_state(&self, comment_id: i64) -> CommentUiState {
        self.ui.get(&comment_id).copied().unwrap_or_default()
    }

    pub fn operation(&self, control: Control) -> OperationState {
        self.operations.get(&control).cloned().unwrap_or_default()
    }

    pub fn is_disabled(&self, control: Control) -> bool {
        self.operations
            .get(&control)
            .is_some_and(|state| state.loading)
    }

    pub fn toggle_replying(&mut self, comment_id: i64) -> bool {
        self.update_ui(comment_id, |ui| ui.replying = !ui.replying)
            .replying
    }

    pub fn toggle_editing(&mut self, comment_id: i64) -> bool {
        self.update_ui(comment_id, |ui| ui.editing = !ui.editing)
            .editing
    }

    pub fn hide_children(&mut self, comment_id: i64) {
        self.update_ui(comment_id, |ui| ui.children_hidden = true);
    }

    pub fn show_children(&mut self, comment_id: i64) {
        self.update_ui(comment_id, |ui| ui.children_hidden = false);
    }

    pub fn begin_root_comment(&mut self, message: &str) -> Result<PendingCreate, SessionError> {
        let control = Control::RootComment;
        let message = self.validated_message(control, message)?;
        self.start(control)?;
        Ok(PendingCreate {
            control,
            post_id: self.post_id,
            parent_id: None,
            message,
        })
    }

    pub fn begin_reply(
        &mut self,
        parent_id: i64,
        message: &str,
    ) -> Result<PendingCreate, SessionError> {
        self.known(parent_id)?;
        let control = Control::Reply(parent_id);
        let message = self.validated_message(control, message)?;
        self.start(control)?;
        Ok(PendingCreate {
            control,
            post_id: self.post_id,
            parent_id: Some(parent_id),
            message,
        })
    }

    pub fn finish_create(
        &mut self,
        pending: PendingCreate,
        result: Result<Comment, ApiError>,
    ) -> Result<(), SessionError> {
        let comment = self.settle(pending.control, result)?;
        if let Some(ui) = pending.parent_id.and_then(|id| self.ui.get_mut(&id)) {
            ui.replying = false;
        }
        tracing::debug!(comment_id = comment.id, parent_id = ?comment.parent_id, "Applying created comment");
        self.comments.create(comment);
        self.notify();
        Ok(())
    }

    pub fn begin_edit(&mut self, comment_id: i64, message: &str) -> Result<PendingEdit, SessionError> {
        self.known(comment_id)?;
        let control = Control::Edit(comment_id);
        let message = self.validated_message(control, message)?;
        self.start(control)?;
        Ok(PendingEdit {
            control,
            post_id: self.post_id,
            comment_id,
            message,
        })
    }

    pub fn finish_edit(
        &mut self,
        pending: PendingEdit,
        result: Result<UpdatedComment, ApiError>,
    ) -> Result<(), SessionError> {
        let updated = self.settle(pending.control, result)?;
        if let Some(ui) = self.ui.get_mut(&pending.comment_id) {
            ui.editing = false;
        }
        self.comments.update(pending.comment_id, updated.message);
        self.notify();
        Ok(())
    }

    pub fn begin_delete(&mut self, comment_id: i64) -> Result<PendingTarget, SessionError> {
        self.begin_target(Control::Delete(comment_id), comment_id)
    }

    pub fn finish_delete(
        &mut self,
        pending: PendingTarget,
        result: Result<DeletedComment, ApiError>,
    ) -> Result<(), SessionError> {
        let deleted = self.settle(pending.control, result)?;
        self.comments.delete(deleted.id);
        self.ui.remove(&deleted.id);
        self.operations
            .retain(|control, _| control.comment_id() != Some(deleted.id));
        self.notify();
        Ok(())
    }

    pub fn begin_toggle_like(&mut self, comment_id: i64) -> Result<PendingTarget, SessionError> {
        self.begin_target(Control::ToggleLike(comment_id), comment_id)
    }

    pub fn finish_toggle_like(
        &mut self,
        pending: PendingTarget,
        result: Result<LikeToggled, ApiError>,
    ) -> Result<(), SessionError> {
        let LikeToggled { add_like } = self.settle(pending.control, result)?;
        self.comments.toggle_like(pending.comment_id, add_like);
        self.notify();
        Ok(())
    }

    pub async fn post_root_comment<C>(&mut self, api: &C, message: &str) -> Result<(), SessionError>
    where
        C: CommentsApi + ?Sized,
    {
        let pending = self.begin_root_comment(message)?;
        let result = api
            .create_comment(pending.post_id, &pending.message, None)
            .await;
        self.finish_create(pending, result)
    }

    pub async fn reply<C>(&mut self, api: &C, parent_id: i64, message: &str) -> Result<(), SessionError>
    where
        C: CommentsApi + ?Sized,
    {
        let pending = self.begin_reply(parent_id, message)?;
        let result = api
            .create_comment(pending.post_id, &pending.message, pending.parent_id)
            .await;
        self.finish_create(pending, result)
    }

    pub async fn edit<C>(&mut self, api: &C, comment_id: i64, message: &str) -> Result<(), SessionError>
    where
        C: CommentsApi + ?Sized,
    {
        let pending = self.begin_edit(comment_id, message)?;
        let result = api
            .update_comment(pending.post_id, pending.comment_id, &pending.message)
            .await;
        self.finish_edit(pending, result)
    }

    pub async fn delete<C>(&mut self, api: &C, comment_id: i64) -> Result<(), SessionError>
    where
        C: CommentsApi + ?Sized,
    {
        let pending = self.begin_delete(comment_id)?;
        let result = api
            .delete_comment(pending.post_id, pending.comment_id)
            .await;
        self.finish_delete(pending, result)
    }

    pub async fn toggle_like<C>(&mut self, api: &C, comment_id: i64) -> Result<(), SessionError>
    where
        C: CommentsApi + ?Sized,
    {
        let pending = self.begin_toggle_like(comment_id)?;
        let result = api
            .toggle_comment_like(pending.post_id, pending.comment_id)
            .await;
        self.finish_toggle_like(pending, result)
    }

    pub fn render_outline(&self) -> String {
        let mut out = String::new();
        self.render_level(&mut out, self.root_comments(), 0);
        out
    }

    fn render_level(&self, out: &mut String, comments: &[Comment], depth: usize) {
        for comment in comments {
            let heart = if comment.liked_by_me { "♥" } else { "♡" };
            let _ = writeln!(
                out,
                "{:indent$}- {}: {} [{} {}]",
                "",
                comment.user.name,
                comment.message,
                heart,
                comment.like_count,
                indent = depth * 2
            );
            let replies = self.replies(comment.id);
            if replies.is_empty() {
                continue;
            }
            if self.ui_state(comment.id).children_hidden {
                let _ = writeln!(out, "{:indent$}  (replies hidden)", "", indent = depth * 2);
            } else {
                self.render_level(out, replies, depth + 1);
            }
        }
    }

    fn begin_target(&mut self, control: Control, comment_id: i64) -> Result<PendingTarget, SessionError> {
        self.known(comment_id)?;
        self.start(control)?;
        Ok(PendingTarget {
            control,
            post_id: self.post_id,
            comment_id,
        })
    }

    fn known(&self, comment_id: i64) -> Result<(), SessionError> {
        if self.comments.contains(comment_id) {
            Ok(())
        } else {
            Err(SessionError::UnknownComment(comment_id))
        }
    }

    fn validated_message(&mut self, control: Control, message: &str) -> Result<String, SessionError> {
        if message.is_empty() {
            let err = SessionError::EmptyMessage;
            self.operations.entry(control).or_default().error = Some(err.to_string());
            self.notify();
            return Err(err);
        }
        Ok(message.to_string())
    }

    fn start(&mut self, control: Control) -> Result<(), SessionError> {
        let state = self.operations.entry(control).or_default();
        if state.loading {
            return Err(SessionError::Busy(control));
        }
        state.loading = true;
        state.error = None;
        self.notify();
        Ok(())
    }

    fn settle<T>(&mut self, control: Control, result: Result<T, ApiError>) -> Result<T, SessionError> {
        let state = self.operations.entry(control).or_default();
        state.loading = false;
        match result {
            Ok(value) => {
                state.error = None;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(?control, error = %err, "Comment operation failed");
                state.error = Some(err.to_string());
                self.notify();
                Err(err.into())
            }
        }
    }

    fn update_ui(&mut self, comment_id: i64, apply: impl FnOnce(&mut CommentUiState)) -> CommentUiState {
        if !self.comments.contains(comment_id) {
            return CommentUiState::default();
        }
        let ui = self.ui.entry(comment_id).or_default();
        apply(ui);
        let state = *ui;
        self.notify();
        state
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{CommentAuthor, PostSummary};
    use crate::thread::tree::tests::comment;

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        likes: Mutex<HashSet<i64>>,
        failure: Mutex<Option<ApiError>>,
    }

    impl FakeApi {
        fn failing(err: ApiError) -> Self {
            Self {
                failure: Mutex::new(Some(err)),
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommentsApi for FakeApi {
        async fn list_posts(&self) -> Result<Vec<PostSummary>, ApiError> {
            self.record("list_posts".into())?;
            Ok(vec![PostSummary {
                id: 7,
                title: "Post".into(),
            }])
        }

        async fn fetch_post(&self, post_id: i64) -> Result<PostDetail, ApiError> {
            self.record(format!("fetch_post {post_id}"))?;
            Ok(sample_post())
        }

        async fn create_comment(
            &self,
            post_id: i64,
            message: &str,
            parent_id: Option<i64>,
        ) -> Result<Comment, ApiError> {
            self.record(format!("create {post_id} {parent_id:?} {message}"))?;
            Ok(Comment {
                id: 100,
                message: message.to_string(),
                parent_id,
                created_at: Utc::now(),
                user: CommentAuthor {
                    id: 1,
                    name: "Kyle".into(),
                },
                like_count: 0,
                liked_by_me: false,
            })
        }

        async fn update_comment(
            &self,
            post_id: i64,
            comment_id: i64,
            message: &str,
        ) -> Result<UpdatedComment, ApiError> {
            self.record(format!("update {post_id} {comment_id} {message}"))?;
            Ok(UpdatedComment {
                message: message.to_string(),
            })
        }

        async fn delete_comment(
            &self,
            post_id: i64,
            comment_id: i64,
        ) -> Result<DeletedComment, ApiError> {
            self.record(format!("delete {post_id} {comment_id}"))?;
            Ok(DeletedComment { id: comment_id })
        }

        async fn toggle_comment_like(
            &self,
            post_id: i64,
            comment_id: i64,
        ) -> Result<LikeToggled, ApiError> {
            self.record(format!("like {post_id} {comment_id}"))?;
            let mut likes = self.likes.lock().unwrap();
            let add_like = likes.insert(comment_id);
            if !add_like {
                likes.remove(&comment_id);
            }
            Ok(LikeToggled { add_like })
        }
    }

    fn sample_post() -> PostDetail {
        PostDetail {
            title: "Post".into(),
            body: "Body".into(),
            comments: vec![comment(1, None), comment(2, Some(1)), comment(3, None)],
        }
    }

    fn ids(comments: &[Comment]) -> Vec<i64> {
        comments.iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn load_groups_fetched_comments() {
        let api = FakeApi::default();
        let session = PostSession::load(&api, 7).await.unwrap();

        assert_eq!(session.post_id(), 7);
        assert_eq!(session.title(), "Post");
        assert_eq!(ids(session.root_comments()), vec![1, 3]);
        assert_eq!(ids(session.replies(1)), vec![2]);
        assert_eq!(api.calls(), vec!["fetch_post 7"]);
    }

    #[tokio::test]
    async fn reply_closes_form_and_prepends() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        assert!(session.toggle_replying(1));
        assert!(session.toggle_editing(1));
        session.reply(&api, 1, "hello").await.unwrap();

        let ui = session.ui_state(1);
        assert!(!ui.replying);
        assert!(ui.editing, "editing is independent of replying");
        assert_eq!(ids(session.replies(1)), vec![100, 2]);
        assert_eq!(session.comments().as_slice()[0].id, 100);
        assert_eq!(session.operation(Control::Reply(1)), OperationState::default());
        assert_eq!(api.calls(), vec!["create 7 Some(1) hello"]);
    }

    #[tokio::test]
    async fn root_comment_lands_first_among_roots() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        session.post_root_comment(&api, "top").await.unwrap();
        assert_eq!(ids(session.root_comments()), vec![100, 1, 3]);
    }

    #[tokio::test]
    async fn failed_reply_keeps_form_open_and_state_untouched() {
        let api = FakeApi::failing(ApiError::Server("boom".into()));
        let mut session = PostSession::new(7, sample_post());
        session.toggle_replying(1);

        let err = session.reply(&api, 1, "hello").await.unwrap_err();

        assert_eq!(err, SessionError::Api(ApiError::Server("boom".into())));
        assert!(session.ui_state(1).replying);
        assert_eq!(
            session.operation(Control::Reply(1)),
            OperationState {
                loading: false,
                error: Some("boom".into()),
            }
        );
        assert_eq!(session.comments().as_slice(), sample_post().comments.as_slice());
        assert_eq!(session.comments().version(), 0);
    }

    #[tokio::test]
    async fn whitespace_is_sent_and_applied_verbatim() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        session.reply(&api, 1, "  indented\n").await.unwrap();
        session.edit(&api, 2, "   ").await.unwrap();

        assert_eq!(
            api.calls(),
            vec!["create 7 Some(1)   indented\n", "update 7 2    "]
        );
        assert_eq!(session.replies(1)[0].message, "  indented\n");
        assert_eq!(session.comments().get(2).unwrap().message, "   ");
    }

    #[tokio::test]
    async fn empty_message_never_reaches_the_api() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        assert_eq!(session.reply(&api, 1, "").await, Err(SessionError::EmptyMessage));
        assert_eq!(session.edit(&api, 1, "").await, Err(SessionError::EmptyMessage));
        assert_eq!(
            session.post_root_comment(&api, "").await,
            Err(SessionError::EmptyMessage)
        );

        assert!(api.calls().is_empty());
        assert_eq!(session.comments().version(), 0);
        assert_eq!(
            session.operation(Control::Edit(1)).error.as_deref(),
            Some("Message is required")
        );
    }

    #[test]
    fn in_flight_control_is_disabled() {
        let mut session = PostSession::new(7, sample_post());

        let pending = session.begin_toggle_like(3).unwrap();
        assert!(session.is_disabled(Control::ToggleLike(3)));
        assert!(!session.is_disabled(Control::ToggleLike(1)));
        assert_eq!(
            session.begin_toggle_like(3).unwrap_err(),
            SessionError::Busy(Control::ToggleLike(3))
        );

        session
            .finish_toggle_like(pending, Ok(LikeToggled { add_like: true }))
            .unwrap();
        assert!(!session.is_disabled(Control::ToggleLike(3)));
        assert_eq!(session.comments().get(3).unwrap().like_count, 1);
    }

    #[tokio::test]
    async fn edit_changes_only_the_target() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());
        session.toggle_editing(2);

        session.edit(&api, 2, "edited").await.unwrap();

        let comments = session.comments().as_slice();
        let original = sample_post().comments;
        assert_eq!(comments[0], original[0]);
        assert_eq!(comments[2], original[2]);
        assert_eq!(comments[1].message, "edited");
        assert!(!session.ui_state(2).editing);
    }

    #[tokio::test]
    async fn failed_edit_keeps_editing() {
        let api = FakeApi::failing(ApiError::Permission(
            "You don't have permission to edit this message".into(),
        ));
        let mut session = PostSession::new(7, sample_post());
        session.toggle_editing(2);

        let err = session.edit(&api, 2, "edited").await.unwrap_err();

        assert!(matches!(err, SessionError::Api(ApiError::Permission(_))));
        assert!(session.ui_state(2).editing);
        assert_eq!(session.comments().get(2).unwrap().message, "message 2");
    }

    #[tokio::test]
    async fn delete_orphans_replies() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());
        session.toggle_replying(1);

        session.delete(&api, 1).await.unwrap();

        assert_eq!(ids(session.comments().as_slice()), vec![2, 3]);
        assert_eq!(ids(session.root_comments()), vec![3]);
        assert_eq!(session.ui_state(1), CommentUiState::default());
        assert!(!session.render_outline().contains("message 2"));
    }

    #[tokio::test]
    async fn like_then_unlike_round_trips() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        session.toggle_like(&api, 3).await.unwrap();
        let liked = session.comments().get(3).unwrap();
        assert_eq!((liked.like_count, liked.liked_by_me), (1, true));

        session.toggle_like(&api, 3).await.unwrap();
        let unliked = session.comments().get(3).unwrap();
        assert_eq!((unliked.like_count, unliked.liked_by_me), (0, false));
    }

    #[tokio::test]
    async fn unknown_comment_is_rejected_locally() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());

        assert_eq!(
            session.delete(&api, 42).await,
            Err(SessionError::UnknownComment(42))
        );
        assert!(!session.toggle_replying(42));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn observers_see_every_change() {
        let api = FakeApi::default();
        let mut session = PostSession::new(7, sample_post());
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.toggle_like(&api, 1).await.unwrap();
        assert!(rx.has_changed().unwrap());
        let seen = *rx.borrow_and_update();
        assert_eq!(seen, session.revision());

        session.hide_children(1);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn collapsed_replies_are_not_rendered() {
        let mut session = PostSession::new(7, sample_post());
        assert_eq!(
            session.render_outline(),
            "- Kyle: message 1 [♡ 0]\n  - Kyle: message 2 [♡ 0]\n- Kyle: message 3 [♡ 0]\n"
        );

        session.hide_children(1);
        assert!(session.visible_replies(1).is_empty());
        assert_eq!(
            session.render_outline(),
            "- Kyle: message 1 [♡ 0]\n  (replies hidden)\n- Kyle: message 3 [♡ 0]\n"
        );

        session.show_children(1);
        assert_eq!(ids(session.visible_replies(1)), vec![2]);
    }
}
