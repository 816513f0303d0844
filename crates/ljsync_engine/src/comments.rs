//! Two-pass, id-ordered comment exporter.

use crate::auth::SessionAuthenticator;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::retry::RetryBudget;
use crate::transport::SyncTransport;
use ljsync_protocol::{CommentMetaPage, ProtocolError, RawComment};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Author identities gathered by the metadata pass.
///
/// Maps comment ids to poster ids and poster ids to display names;
/// resolution happens at lookup time, so a poster name arriving in a
/// later page than the comment that references it still resolves.
#[derive(Debug, Default)]
pub struct AuthorMap {
    comment_posters: BTreeMap<u64, Option<u64>>,
    user_names: BTreeMap<u64, String>,
}

/// Display name used when a comment has no resolvable poster.
pub const ANONYMOUS: &str = "Anonymous";

impl AuthorMap {
    /// Folds one metadata page into the map.
    pub fn absorb(&mut self, page: &CommentMetaPage) {
        for (poster_id, name) in &page.user_names {
            self.user_names.insert(*poster_id, name.clone());
        }
        for entry in &page.entries {
            self.comment_posters.insert(entry.comment_id, entry.poster_id);
        }
    }

    /// Resolves the display name for a comment id.
    ///
    /// A comment with no poster id, or whose poster id has no name
    /// entry, resolves to `Anonymous`.
    pub fn author_for(&self, comment_id: u64) -> &str {
        self.comment_posters
            .get(&comment_id)
            .copied()
            .flatten()
            .and_then(|poster_id| self.user_names.get(&poster_id))
            .map(String::as_str)
            .unwrap_or(ANONYMOUS)
    }

    /// Returns how many comment ids the map covers.
    pub fn len(&self) -> usize {
        self.comment_posters.len()
    }

    /// Returns true if no comment metadata has been absorbed.
    pub fn is_empty(&self) -> bool {
        self.comment_posters.is_empty()
    }
}

/// Pages twice through the comment-export endpoint: once for author
/// identities, once for bodies.
pub struct CommentExporter<'a, T: SyncTransport> {
    transport: &'a T,
    config: &'a SyncConfig,
    cancelled: &'a AtomicBool,
    /// Failures absorbed by retry budgets during the export.
    pub retries: u64,
}

impl<'a, T: SyncTransport> CommentExporter<'a, T> {
    /// Creates an exporter over the given transport.
    pub fn new(transport: &'a T, config: &'a SyncConfig, cancelled: &'a AtomicBool) -> Self {
        Self {
            transport,
            config,
            cancelled,
            retries: 0,
        }
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Fetches every live comment along with the completed author map.
    ///
    /// The body pass never starts before the metadata pass completes:
    /// author resolution depends on the finished map. This is a hard
    /// ordering dependency, not an optimization.
    pub fn fetch_all_comments(&mut self) -> SyncResult<(Vec<RawComment>, AuthorMap)> {
        let (authors, max_id) = self.metadata_pass()?;
        let comments = self.body_pass(max_id)?;
        Ok((comments, authors))
    }

    /// Pass 1: build the author map and learn the global max id.
    ///
    /// Pagination starts at id 0 and resumes at `highest_seen + 1`, so
    /// no id is fetched twice and none is skipped. The pass ends when
    /// the server-reported max id is no greater than the highest id
    /// consumed; an empty page before that point means the server is
    /// not making forward progress, which is a protocol error.
    fn metadata_pass(&mut self) -> SyncResult<(AuthorMap, u64)> {
        let mut authors = AuthorMap::default();
        let mut highest: Option<u64> = None;

        loop {
            self.check_cancelled()?;

            let start_id = highest.map_or(0, |id| id + 1);
            let page = {
                let mut budget = RetryBudget::new(&self.config.retry);
                let result = budget.run(|| {
                    // Sessions are minted per page, mirroring the
                    // single-use challenge discipline
                    let session = SessionAuthenticator::new(
                        self.transport,
                        &self.config.username,
                        &self.config.secret,
                    )
                    .generate_session()?;
                    self.transport.comment_meta(start_id, &session)
                });
                self.retries += u64::from(budget.failures_consumed());
                result?
            };

            authors.absorb(&page);
            if let Some(page_highest) = page.highest_entry_id() {
                highest = Some(highest.map_or(page_highest, |h| h.max(page_highest)));
            }

            let consumed = highest.unwrap_or(0);
            if page.max_id <= consumed {
                tracing::debug!(max_id = page.max_id, authors = authors.len(), "author map complete");
                return Ok((authors, page.max_id));
            }
            if page.entries.is_empty() {
                return Err(SyncError::Protocol(ProtocolError::malformed(
                    "empty metadata page before max id reached",
                )));
            }
        }
    }

    /// Pass 2: fetch comment bodies, dropping deleted comments.
    fn body_pass(&mut self, max_id: u64) -> SyncResult<Vec<RawComment>> {
        let mut comments = Vec::new();
        let mut highest: Option<u64> = None;

        loop {
            self.check_cancelled()?;

            let start_id = highest.map_or(0, |id| id + 1);
            let page = {
                let mut budget = RetryBudget::new(&self.config.retry);
                let result = budget.run(|| {
                    let session = SessionAuthenticator::new(
                        self.transport,
                        &self.config.username,
                        &self.config.secret,
                    )
                    .generate_session()?;
                    self.transport.comment_bodies(start_id, &session)
                });
                self.retries += u64::from(budget.failures_consumed());
                result?
            };

            let page_highest = page.highest_id();
            if let Some(page_highest) = page_highest {
                highest = Some(highest.map_or(page_highest, |h| h.max(page_highest)));
            }

            for comment in page.comments {
                if comment.is_deleted() {
                    tracing::debug!(comment_id = comment.comment_id, "dropping deleted comment");
                    continue;
                }
                comments.push(comment);
            }

            let consumed = highest.unwrap_or(0);
            if consumed >= max_id {
                return Ok(comments);
            }
            if page_highest.is_none() {
                return Err(SyncError::Protocol(ProtocolError::malformed(
                    "empty body page before max id reached",
                )));
            }
        }
    }
}
