//! Ephemeral paginated galleries: a bounded item list with an index cursor,
//! driven by `prev`/`next`/`close` buttons and reaped after inactivity.

use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    EditMessage, MessageId, UserId,
};
use serenity::http::Http;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const GALLERY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const GALLERY_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub const BTN_PREV: &str = "gallery:prev";
pub const BTN_NEXT: &str = "gallery:next";
pub const BTN_CLOSE: &str = "gallery:close";

#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug)]
pub struct Gallery {
    label: String,
    items: Vec<GalleryItem>,
    cursor: usize,
    owner: UserId,
    channel_id: ChannelId,
    last_interaction: Instant,
}

impl Gallery {
    /// `items` must be non-empty; callers bail out with an apology before
    /// constructing an empty gallery.
    pub fn new(label: String, items: Vec<GalleryItem>, owner: UserId, channel_id: ChannelId) -> Self {
        debug_assert!(!items.is_empty());
        Self {
            label,
            items,
            cursor: 0,
            owner,
            channel_id,
            last_interaction: Instant::now(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn at_start(&self) -> bool {
        self.cursor == 0
    }

    pub fn at_end(&self) -> bool {
        self.cursor + 1 >= self.items.len()
    }

    /// Move the cursor back one page. No-op at the first page.
    pub fn page_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor forward one page. No-op at the last page.
    pub fn page_forward(&mut self) {
        if !self.at_end() {
            self.cursor += 1;
        }
    }

    pub fn touch(&mut self) {
        self.last_interaction = Instant::now();
    }

    fn expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.last_interaction) > GALLERY_IDLE_TIMEOUT
    }

    pub fn render(&self) -> (CreateEmbed, Vec<CreateActionRow>) {
        let item = &self.items[self.cursor];

        let mut embed = CreateEmbed::new().title(&item.title).footer(
            CreateEmbedFooter::new(format!(
                "{} · {}/{}",
                self.label,
                self.cursor + 1,
                self.items.len()
            )),
        );
        if let Some(description) = &item.description {
            embed = embed.description(description);
        }
        if let Some(image_url) = &item.image_url {
            embed = embed.image(image_url);
        }
        if let Some(link) = &item.link {
            embed = embed.url(link);
        }

        (embed, vec![nav_row(self.at_start(), self.at_end())])
    }
}

fn nav_row(at_start: bool, at_end: bool) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(BTN_PREV)
            .label("Prev")
            .style(ButtonStyle::Secondary)
            .disabled(at_start),
        CreateButton::new(BTN_NEXT)
            .label("Next")
            .style(ButtonStyle::Secondary)
            .disabled(at_end),
        CreateButton::new(BTN_CLOSE)
            .label("Close")
            .style(ButtonStyle::Danger),
    ])
}

/// What the event handler should do in response to a button press.
pub enum ButtonOutcome {
    /// Re-render the gallery message with the embed and rows given.
    Update(CreateEmbed, Vec<CreateActionRow>),
    /// Gallery dismissed; strip the components.
    Close,
    /// Pressed by someone other than the invoker.
    NotOwner,
    /// No live gallery behind this message (reaped or never existed).
    Expired,
}

/// All live galleries, keyed by the message carrying them.
pub struct GalleryManager {
    galleries: scc::HashMap<u64, Gallery>,
}

impl GalleryManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            galleries: scc::HashMap::new(),
        })
    }

    pub async fn insert(&self, message_id: u64, gallery: Gallery) {
        // A command edits its own fresh response, so collisions can't happen
        let _ = self.galleries.insert_async(message_id, gallery).await;
    }

    pub async fn handle_button(
        &self,
        message_id: u64,
        custom_id: &str,
        user: UserId,
    ) -> ButtonOutcome {
        if custom_id == BTN_CLOSE {
            return match self.galleries.get_async(&message_id).await {
                Some(entry) if entry.owner() != user => ButtonOutcome::NotOwner,
                Some(entry) => {
                    drop(entry);
                    self.galleries.remove_async(&message_id).await;
                    ButtonOutcome::Close
                }
                None => ButtonOutcome::Expired,
            };
        }

        let Some(mut entry) = self.galleries.get_async(&message_id).await else {
            return ButtonOutcome::Expired;
        };

        if entry.owner() != user {
            return ButtonOutcome::NotOwner;
        }

        let gallery = entry.get_mut();
        match custom_id {
            BTN_PREV => gallery.page_back(),
            BTN_NEXT => gallery.page_forward(),
            _ => return ButtonOutcome::Expired,
        }
        gallery.touch();

        let (embed, rows) = gallery.render();
        ButtonOutcome::Update(embed, rows)
    }

    /// Periodically drop idle galleries and strip the buttons off their
    /// messages so stale controls don't linger in the channel.
    pub fn spawn_sweeper(self: &Arc<Self>, http: Arc<Http>) {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;

                let now = Instant::now();
                let mut expired: Vec<(u64, ChannelId)> = Vec::new();
                manager
                    .galleries
                    .iter_async(|message_id, gallery| {
                        if gallery.expired_at(now) {
                            expired.push((*message_id, gallery.channel_id));
                        }
                        true
                    })
                    .await;

                for (message_id, channel_id) in expired {
                    manager.galleries.remove_async(&message_id).await;
                    tracing::debug!(message_id, "reaping idle gallery");

                    let _ = channel_id
                        .edit_message(
                            &http,
                            MessageId::new(message_id),
                            EditMessage::new().components(Vec::new()),
                        )
                        .await
                        .inspect_err(|e| {
                            tracing::debug!(error = %e, message_id, "could not strip gallery buttons");
                        });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(n: usize) -> Gallery {
        let items = (0..n)
            .map(|i| GalleryItem {
                title: format!("item {i}"),
                description: None,
                image_url: None,
                link: None,
            })
            .collect();
        Gallery::new("test".into(), items, UserId::new(1), ChannelId::new(1))
    }

    #[test]
    fn cursor_never_moves_below_zero() {
        let mut g = gallery(3);
        g.page_back();
        g.page_back();
        assert_eq!(g.cursor(), 0);
        assert!(g.at_start());
    }

    #[test]
    fn cursor_never_moves_past_last_item() {
        let mut g = gallery(3);
        for _ in 0..10 {
            g.page_forward();
        }
        assert_eq!(g.cursor(), 2);
        assert!(g.at_end());
    }

    #[test]
    fn boundary_button_states_are_correct() {
        let mut g = gallery(3);
        assert!(g.at_start());
        assert!(!g.at_end());

        g.page_forward();
        assert!(!g.at_start());
        assert!(!g.at_end());

        g.page_forward();
        assert!(!g.at_start());
        assert!(g.at_end());
    }

    #[test]
    fn single_item_gallery_disables_both_directions() {
        let g = gallery(1);
        assert!(g.at_start());
        assert!(g.at_end());
    }

    #[tokio::test]
    async fn only_the_owner_may_drive_the_buttons() {
        let manager = GalleryManager::new();
        manager.insert(10, gallery(2)).await;

        let outcome = manager.handle_button(10, BTN_NEXT, UserId::new(2)).await;
        assert!(matches!(outcome, ButtonOutcome::NotOwner));

        let outcome = manager.handle_button(10, BTN_NEXT, UserId::new(1)).await;
        assert!(matches!(outcome, ButtonOutcome::Update(_, _)));
    }

    #[tokio::test]
    async fn close_removes_the_gallery() {
        let manager = GalleryManager::new();
        manager.insert(11, gallery(2)).await;

        let outcome = manager.handle_button(11, BTN_CLOSE, UserId::new(1)).await;
        assert!(matches!(outcome, ButtonOutcome::Close));

        let outcome = manager.handle_button(11, BTN_NEXT, UserId::new(1)).await;
        assert!(matches!(outcome, ButtonOutcome::Expired));
    }

    #[tokio::test]
    async fn unknown_message_reports_expired() {
        let manager = GalleryManager::new();
        let outcome = manager.handle_button(999, BTN_PREV, UserId::new(1)).await;
        assert!(matches!(outcome, ButtonOutcome::Expired));
    }
}
