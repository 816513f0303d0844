//! One-shot sync engine tying the walkers and assembler together.

use crate::assemble::{assemble_comment, assemble_post};
use crate::comments::CommentExporter;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::posts::PostWalker;
use crate::transport::SyncTransport;
use ljsync_protocol::Record;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Where a sync run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run has started yet.
    Idle,
    /// Walking the change log and fetching post bodies.
    FetchingPosts,
    /// Exporting comment metadata and bodies.
    FetchingComments,
    /// The last run completed.
    Synced,
    /// The last run failed; partial results were discarded.
    Error,
}

/// Counters accumulated over one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Posts fetched and assembled.
    pub posts_fetched: u64,
    /// Posts dropped because their payload would not assemble.
    pub posts_dropped: u64,
    /// Comments fetched and assembled.
    pub comments_fetched: u64,
    /// Comments dropped: deleted server-side, orphaned, or unassemblable.
    pub comments_dropped: u64,
    /// Transient failures absorbed by retry budgets.
    pub retries: u64,
}

/// The product of a completed sync run.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Canonical records, all posts before all comments.
    pub records: Vec<Record>,
    /// Run counters.
    pub stats: SyncStats,
}

/// Drives one full journal sync over a transport.
///
/// A run is single-threaded and blocking; `cancel` may be called from
/// another thread and takes effect at the next loop iteration. A failed
/// run discards everything it fetched, so the caller either gets a
/// complete outcome or none.
pub struct SyncEngine<T: SyncTransport> {
    config: SyncConfig,
    transport: T,
    state: Mutex<SyncState>,
    cancelled: AtomicBool,
}

impl<T: SyncTransport> SyncEngine<T> {
    /// Creates an engine for the given account and transport.
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: Mutex::new(SyncState::Idle),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the engine's current state.
    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Requests cancellation of an in-flight run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Runs one full sync: every post, then every comment.
    pub fn sync(&self) -> SyncResult<SyncOutcome> {
        match self.run() {
            Ok(outcome) => {
                self.set_state(SyncState::Synced);
                tracing::info!(
                    posts = outcome.stats.posts_fetched,
                    comments = outcome.stats.comments_fetched,
                    retries = outcome.stats.retries,
                    "sync complete"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.set_state(SyncState::Error);
                tracing::error!(error = %err, "sync failed");
                Err(err)
            }
        }
    }

    fn run(&self) -> SyncResult<SyncOutcome> {
        let mut stats = SyncStats::default();
        let mut records = Vec::new();
        let mut post_ids = BTreeSet::new();

        self.set_state(SyncState::FetchingPosts);
        let mut walker = PostWalker::new(&self.transport, &self.config, &self.cancelled);
        let raw_posts = walker.fetch_all_posts()?;
        stats.retries += walker.retries;

        for raw in &raw_posts {
            match assemble_post(raw, &self.config.username) {
                Ok(post) => {
                    post_ids.insert(raw.item_id);
                    records.push(Record::Post(post));
                    stats.posts_fetched += 1;
                }
                Err(err) => {
                    tracing::warn!(item_id = raw.item_id, error = %err, "dropping unassemblable post");
                    stats.posts_dropped += 1;
                }
            }
        }

        self.set_state(SyncState::FetchingComments);
        let mut exporter = CommentExporter::new(&self.transport, &self.config, &self.cancelled);
        let (raw_comments, authors) = exporter.fetch_all_comments()?;
        stats.retries += exporter.retries;

        for raw in &raw_comments {
            if !post_ids.contains(&raw.post_item_id) {
                tracing::warn!(
                    comment_id = raw.comment_id,
                    post_item_id = raw.post_item_id,
                    "dropping orphaned comment"
                );
                stats.comments_dropped += 1;
                continue;
            }
            match assemble_comment(raw, &authors) {
                Ok(comment) => {
                    records.push(Record::Comment(comment));
                    stats.comments_fetched += 1;
                }
                Err(err) => {
                    tracing::warn!(comment_id = raw.comment_id, error = %err, "dropping unassemblable comment");
                    stats.comments_dropped += 1;
                }
            }
        }

        Ok(SyncOutcome { records, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::transport::MockTransport;
    use ljsync_protocol::{
        CommentBodyPage, CommentMeta, CommentMetaPage, RawComment, RawPost, SyncItem,
        SyncItemsPage,
    };
    use std::time::Duration;

    fn test_config() -> SyncConfig {
        SyncConfig::new("frank", "hunter2")
            .with_retry(RetryConfig::new(3).with_delay(Duration::ZERO))
    }

    fn items_page(items: Vec<SyncItem>) -> SyncItemsPage {
        let count = items.len() as u64;
        SyncItemsPage {
            items,
            total: count,
            count,
        }
    }

    fn raw_post(item_id: u64) -> RawPost {
        RawPost {
            item_id,
            event_time: "2008-03-01 12:00:00".into(),
            body: "hello".into(),
            subject: Some("subject".into()),
            tags_csv: None,
            url: format!("http://example.com/{item_id}.html"),
        }
    }

    fn raw_comment(comment_id: u64, post_item_id: u64) -> RawComment {
        RawComment {
            comment_id,
            post_item_id,
            poster_id: None,
            body: "reply".into(),
            subject: None,
            date: "2008-03-01T13:00:00Z".into(),
            state: None,
        }
    }

    fn script_posts(transport: &MockTransport, posts: &[u64]) {
        let items = posts
            .iter()
            .map(|id| SyncItem::parse(&format!("L-{id}"), "2008-03-01 12:00:00").unwrap())
            .collect();
        transport.push_sync_items(Ok(items_page(items)));
        transport.push_sync_items(Ok(items_page(vec![])));
        for id in posts {
            transport.push_event(Ok(Some(raw_post(*id))));
        }
    }

    fn script_comments(transport: &MockTransport, comments: &[RawComment]) {
        let max_id = comments.iter().map(|c| c.comment_id).max().unwrap_or(0);
        transport.push_meta_page(Ok(CommentMetaPage {
            max_id,
            entries: comments
                .iter()
                .map(|c| CommentMeta {
                    comment_id: c.comment_id,
                    poster_id: c.poster_id,
                })
                .collect(),
            user_names: vec![],
        }));
        transport.push_body_page(Ok(CommentBodyPage {
            comments: comments.to_vec(),
        }));
    }

    #[test]
    fn full_run_orders_posts_before_comments() {
        let transport = MockTransport::new();
        script_posts(&transport, &[1, 2]);
        script_comments(&transport, &[raw_comment(10, 1), raw_comment(11, 2)]);

        let engine = SyncEngine::new(test_config(), transport);
        assert_eq!(engine.state(), SyncState::Idle);

        let outcome = engine.sync().unwrap();
        assert_eq!(engine.state(), SyncState::Synced);
        assert_eq!(outcome.stats.posts_fetched, 2);
        assert_eq!(outcome.stats.comments_fetched, 2);
        assert_eq!(outcome.stats.retries, 0);

        let ids: Vec<&str> = outcome.records.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["post-1", "post-2", "comment-10", "comment-11"]);
    }

    #[test]
    fn orphaned_comments_are_dropped() {
        let transport = MockTransport::new();
        script_posts(&transport, &[1]);
        script_comments(&transport, &[raw_comment(10, 1), raw_comment(11, 99)]);

        let engine = SyncEngine::new(test_config(), transport);
        let outcome = engine.sync().unwrap();

        assert_eq!(outcome.stats.comments_fetched, 1);
        assert_eq!(outcome.stats.comments_dropped, 1);
        assert!(outcome
            .records
            .iter()
            .all(|record| record.id() != "comment-11"));
    }

    #[test]
    fn unassemblable_post_is_dropped_not_fatal() {
        let transport = MockTransport::new();
        let mut bad = raw_post(1);
        bad.event_time = "not a timestamp".into();
        transport.push_sync_items(Ok(items_page(vec![SyncItem::parse(
            "L-1",
            "2008-03-01 12:00:00",
        )
        .unwrap()])));
        transport.push_sync_items(Ok(items_page(vec![])));
        transport.push_event(Ok(Some(bad)));
        script_comments(&transport, &[]);

        let engine = SyncEngine::new(test_config(), transport);
        let outcome = engine.sync().unwrap();
        assert_eq!(outcome.stats.posts_fetched, 0);
        assert_eq!(outcome.stats.posts_dropped, 1);
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn failure_sets_error_state_and_discards_partials() {
        let transport = MockTransport::new();
        script_posts(&transport, &[1]);
        // Metadata pass exhausts its budget
        for _ in 0..3 {
            transport.push_meta_page(Err(SyncError::transport_retryable("timeout")));
        }

        let engine = SyncEngine::new(test_config(), transport);
        let err = engine.sync().unwrap_err();
        assert!(matches!(err, SyncError::RetriesExhausted { .. }));
        assert_eq!(engine.state(), SyncState::Error);
    }

    #[test]
    fn cancel_before_run_stops_immediately() {
        let transport = MockTransport::new();
        let engine = SyncEngine::new(test_config(), transport);
        engine.cancel();
        assert!(matches!(engine.sync(), Err(SyncError::Cancelled)));
        assert_eq!(engine.state(), SyncState::Error);
    }

    #[test]
    fn empty_journal_syncs_cleanly() {
        let transport = MockTransport::new();
        transport.push_sync_items(Ok(items_page(vec![])));
        script_comments(&transport, &[]);

        let engine = SyncEngine::new(test_config(), transport);
        let outcome = engine.sync().unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats, SyncStats::default());
        assert_eq!(engine.state(), SyncState::Synced);
    }
}
