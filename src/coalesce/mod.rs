pub mod scheduler;
pub mod store;
pub mod turns;

pub use scheduler::{FlushScheduler, TokioScheduler};
pub use store::{Insertion, PendingItem, PendingStore};
pub use turns::SenderTurns;

use crate::bus::{InboundEvent, MediaAttachment, OutboundMessage};
use crate::channels::base::{Dispatcher, UserDirectory};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Placeholder used when the username lookup fails.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Default coalescing window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(2000);

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// A message was delivered downstream.
    Sent,
    /// Media was buffered to wait for a caption.
    Queued,
    /// Nothing to relay (own message, or no text and no supported media).
    Skipped,
    /// The downstream send failed. The message is dropped.
    Error,
}

impl DispatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Queued => "queued",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Pairs a media attachment with a caption that follows it within the window.
///
/// Media from a sender is held in the [`PendingStore`] until either a text
/// event from the same sender arrives (dispatched together) or the shared
/// flush timer fires (dispatched alone). Text with nothing pending goes out
/// immediately. Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct CoalescingEngine {
    store: Arc<PendingStore>,
    turns: Arc<SenderTurns>,
    directory: Arc<dyn UserDirectory>,
    dispatcher: Arc<dyn Dispatcher>,
    scheduler: Arc<dyn FlushScheduler>,
    bot_user_id: Arc<str>,
    window: Duration,
    routes: Arc<HashMap<String, String>>,
}

impl CoalescingEngine {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        dispatcher: Arc<dyn Dispatcher>,
        scheduler: Arc<dyn FlushScheduler>,
        bot_user_id: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store: Arc::new(PendingStore::new()),
            turns: Arc::new(SenderTurns::new()),
            directory,
            dispatcher,
            scheduler,
            bot_user_id: bot_user_id.into(),
            window: DEFAULT_WINDOW,
            routes: Arc::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Name → Discord user id table used for DM routing.
    #[must_use]
    pub fn with_routes(mut self, routes: HashMap<String, String>) -> Self {
        self.routes = Arc::new(routes);
        self
    }

    pub fn store(&self) -> &PendingStore {
        &self.store
    }

    pub fn pending(&self) -> usize {
        self.store.len()
    }

    pub async fn handle_inbound_event(&self, event: InboundEvent) -> DispatchOutcome {
        if *event.sender_id == *self.bot_user_id {
            debug!("skipping own message from {}", event.sender_id);
            return DispatchOutcome::Skipped;
        }

        let text = event.text().map(str::to_string);
        match (event.media, text) {
            (None, None) => {
                debug!(
                    "skipping event from {}: no text or supported media",
                    event.sender_id
                );
                DispatchOutcome::Skipped
            }
            (None, Some(text)) => self.on_text(&event.sender_id, &text).await,
            (Some(media), None) => self.on_media(&event.sender_id, media).await,
            (Some(media), Some(text)) => self.on_media_with_text(&event.sender_id, media, &text).await,
        }
    }

    async fn on_text(&self, sender_id: &str, text: &str) -> DispatchOutcome {
        if let Some(item) = self.store.take_by_sender(sender_id) {
            debug!("pairing caption with pending {} from {}", item.media.kind, sender_id);
            return self
                .send(item.username, item.sender_id, Some(text), Some(item.media))
                .await;
        }
        let username = self.lookup_username(sender_id).await;
        self.send(username, sender_id.to_string(), Some(text), None)
            .await
    }

    async fn on_media(&self, sender_id: &str, media: MediaAttachment) -> DispatchOutcome {
        let username = self.lookup_username(sender_id).await;
        // held until the displaced item is delivered, so a flush or caption
        // for the new item cannot overtake it
        let _turn = self.turns.acquire(sender_id).await;
        let Insertion { displaced, arm } =
            self.store
                .swap(PendingItem::new(sender_id.to_string(), username, media));
        if arm {
            self.arm_flush();
        }
        if let Some(old) = displaced {
            debug!("new media from {} displaced a pending {}", sender_id, old.media.kind);
            self.deliver(old.username, old.sender_id, old.caption.as_deref(), Some(old.media))
                .await;
        }
        debug!("queued media from {} for up to {:?}", sender_id, self.window);
        DispatchOutcome::Queued
    }

    async fn on_media_with_text(
        &self,
        sender_id: &str,
        media: MediaAttachment,
        text: &str,
    ) -> DispatchOutcome {
        let _turn = self.turns.acquire(sender_id).await;
        let username = match self.store.take_by_sender(sender_id) {
            Some(old) => {
                let username = old.username.clone();
                self.deliver(old.username, old.sender_id, old.caption.as_deref(), Some(old.media))
                    .await;
                username
            }
            None => self.lookup_username(sender_id).await,
        };
        self.deliver(username, sender_id.to_string(), Some(text), Some(media))
            .await
    }

    /// Drain the store and dispatch every item media-only, in insertion order.
    pub async fn flush_pending(&self) {
        let items = self.store.drain_all();
        if items.is_empty() {
            return;
        }
        debug!("flushing {} pending item(s)", items.len());
        for item in items {
            self.send_pending(item).await;
        }
    }

    fn arm_flush(&self) {
        let engine = self.clone();
        self.scheduler.arm(
            self.window,
            Box::pin(async move { engine.flush_pending().await }),
        );
    }

    async fn send_pending(&self, item: PendingItem) -> DispatchOutcome {
        self.send(
            item.username,
            item.sender_id,
            item.caption.as_deref(),
            Some(item.media),
        )
        .await
    }

    /// Deliver in `sender_id`'s turn.
    async fn send(
        &self,
        username: String,
        sender_id: String,
        text: Option<&str>,
        media: Option<MediaAttachment>,
    ) -> DispatchOutcome {
        let _turn = self.turns.acquire(&sender_id).await;
        self.deliver(username, sender_id, text, media).await
    }

    /// Deliver immediately. Callers must already hold the sender's turn.
    async fn deliver(
        &self,
        username: String,
        sender_id: String,
        text: Option<&str>,
        media: Option<MediaAttachment>,
    ) -> DispatchOutcome {
        let msg = OutboundMessage::compose(username, sender_id, text, media, &self.routes);
        match self.dispatcher.dispatch(&msg).await {
            Ok(()) => {
                info!(
                    "relayed {} from {} via {}",
                    msg.shape(),
                    msg.username,
                    self.dispatcher.name()
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(
                    "failed to relay {} from {}: {:#}",
                    msg.shape(),
                    msg.sender_id,
                    e
                );
                DispatchOutcome::Error
            }
        }
    }

    async fn lookup_username(&self, sender_id: &str) -> String {
        match self.directory.username(sender_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!("username lookup failed for {}: {:#}", sender_id, e);
                UNKNOWN_USER.to_string()
            }
        }
    }
}
