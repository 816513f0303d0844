//! Cursor-paginated post walker.

use crate::auth::{Authenticator, RpcAuthenticator};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::retry::RetryBudget;
use crate::transport::{GetEventRequest, SyncItemsRequest, SyncTransport};
use ljsync_protocol::{ItemKind, RawPost};
use std::sync::atomic::{AtomicBool, Ordering};

/// Pages through the server-side change log and fetches each changed
/// post's full body.
pub struct PostWalker<'a, T: SyncTransport> {
    transport: &'a T,
    config: &'a SyncConfig,
    cancelled: &'a AtomicBool,
    /// Failures absorbed by retry budgets during the walk.
    pub retries: u64,
}

impl<'a, T: SyncTransport> PostWalker<'a, T> {
    /// Creates a walker over the given transport.
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

    /// Walks the change log from the beginning and returns every post.
    ///
    /// The cursor advances to the `time` of the last item handled, not
    /// the page's nominal end, so a retry after a partial page neither
    /// re-fetches handled items nor skips the one that failed. A page
    /// of zero items ends the walk. Items whose kind is not a post are
    /// skipped but still advance the cursor.
    pub fn fetch_all_posts(&mut self) -> SyncResult<Vec<RawPost>> {
        let mut cursor = String::new();
        let mut posts = Vec::new();

        loop {
            self.check_cancelled()?;

            let page = {
                let mut budget = RetryBudget::new(&self.config.retry);
                let result = budget.run(|| {
                    // Challenges are single-use: fresh auth per attempt
                    let tokens =
                        RpcAuthenticator::new(self.transport, &self.config.secret).authenticate()?;
                    self.transport.sync_items(&SyncItemsRequest {
                        username: self.config.username.clone(),
                        last_sync: cursor.clone(),
                        challenge: tokens.challenge,
                        response: tokens.response,
                    })
                });
                self.retries += u64::from(budget.failures_consumed());
                result?
            };

            if page.is_empty() {
                tracing::debug!(posts = posts.len(), "change log exhausted");
                return Ok(posts);
            }
            tracing::debug!(items = page.items.len(), cursor = %cursor, "walking change-log page");

            for item in page.items {
                self.check_cancelled()?;

                if item.kind == ItemKind::Post {
                    if let Some(post) = self.fetch_one(item.item_id)? {
                        posts.push(post);
                    }
                }
                cursor = item.time;
            }
        }
    }

    /// Fetches a single post under its own failure budget.
    fn fetch_one(&mut self, item_id: u64) -> SyncResult<Option<RawPost>> {
        let mut budget = RetryBudget::new(&self.config.retry);
        let result = budget.run(|| {
            let tokens =
                RpcAuthenticator::new(self.transport, &self.config.secret).authenticate()?;
            self.transport.get_event(&GetEventRequest {
                username: self.config.username.clone(),
                item_id,
                challenge: tokens.challenge,
                response: tokens.response,
            })
        });
        self.retries += u64::from(budget.failures_consumed());
        let event = result?;
        if event.is_none() {
            tracing::warn!(item_id, "server returned no event for changed post");
        }
        Ok(event)
    }
}
