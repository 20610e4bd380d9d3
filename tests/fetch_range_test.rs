// ABOUTME: Tests for range-based message fetching over a scripted platform client
// ABOUTME: Covers the hard cap, ordering and dedup, content filtering, and fail-empty
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use slackfly::errors::{AppError, AppResult};
use slackfly::slack::{MessageFetcher, MessagePage, RawMessage, SlackApi};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted response for `list_message_page`
enum PageScript {
    Page(MessagePage),
    Error,
}

/// Platform client returning a pre-scripted page sequence
struct ScriptedSlack {
    pages: Mutex<VecDeque<PageScript>>,
    history_calls: AtomicUsize,
    names: HashMap<String, String>,
    fail_name_lookups: bool,
}

impl ScriptedSlack {
    fn new(pages: Vec<PageScript>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().collect()),
            history_calls: AtomicUsize::new(0),
            names: HashMap::new(),
            fail_name_lookups: false,
        }
    }

    fn with_names(mut self, names: &[(&str, &str)]) -> Self {
        self.names = names
            .iter()
            .map(|(id, name)| ((*id).to_owned(), (*name).to_owned()))
            .collect();
        self
    }

    fn with_failing_name_lookups(mut self) -> Self {
        self.fail_name_lookups = true;
        self
    }

    fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlackApi for ScriptedSlack {
    async fn resolve_channel_id(&self, _channel_name: &str) -> AppResult<Option<String>> {
        Ok(Some("C1".to_owned()))
    }

    async fn list_message_page(
        &self,
        _channel_id: &str,
        _oldest: i64,
        _latest: i64,
        _cursor: Option<&str>,
    ) -> AppResult<MessagePage> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .pages
            .lock()
            .expect("pages lock")
            .pop_front();
        match script {
            Some(PageScript::Page(page)) => Ok(page),
            Some(PageScript::Error) => {
                Err(AppError::external_service("slack", "history call failed"))
            }
            None => Ok(MessagePage::default()),
        }
    }

    async fn recent_message_page(&self, channel_id: &str, _limit: u32) -> AppResult<MessagePage> {
        self.list_message_page(channel_id, 0, 0, None).await
    }

    async fn resolve_display_name(&self, user_id: &str) -> AppResult<Option<String>> {
        if self.fail_name_lookups {
            return Err(AppError::external_service("slack", "users.info failed"));
        }
        Ok(self.names.get(user_id).cloned())
    }

    async fn post_message(
        &self,
        _channel_id: &str,
        _text: &str,
        _blocks: Option<serde_json::Value>,
    ) -> AppResult<()> {
        Ok(())
    }
}

fn raw(ts: &str, user: &str, text: &str) -> RawMessage {
    RawMessage {
        ts: ts.to_owned(),
        user: Some(user.to_owned()),
        text: Some(text.to_owned()),
        thread_ts: None,
        bot_id: None,
        kind: Some("message".to_owned()),
    }
}

fn page_of(count: usize, start: usize, has_more: bool, cursor: Option<&str>) -> PageScript {
    let messages = (0..count)
        .map(|i| raw(&format!("{}.000000", start + i), "U1", "hello"))
        .collect();
    PageScript::Page(MessagePage {
        messages,
        next_cursor: cursor.map(str::to_owned),
        has_more,
    })
}

async fn fetch(api: Arc<ScriptedSlack>, cap: usize) -> Vec<slackfly::models::Message> {
    MessageFetcher::new(api, cap).fetch_range("C1", 0, 86_399).await
}

#[tokio::test]
async fn test_cap_is_a_hard_ceiling_and_stops_paging() {
    let api = Arc::new(ScriptedSlack::new(vec![
        page_of(60, 1000, true, Some("c1")),
        page_of(60, 2000, true, Some("c2")),
        // A third page exists but must never be requested
        page_of(60, 3000, false, None),
    ]));

    let batch = fetch(api.clone(), 100).await;

    assert_eq!(batch.len(), 100);
    assert_eq!(api.history_calls(), 2);
}

#[tokio::test]
async fn test_batch_is_strictly_ascending_without_duplicates() {
    let api = Arc::new(ScriptedSlack::new(vec![PageScript::Page(MessagePage {
        messages: vec![
            raw("100.3", "U1", "third"),
            raw("100.1", "U1", "first"),
            raw("100.1", "U2", "same instant"),
            raw("100.2", "U2", "second"),
        ],
        next_cursor: None,
        has_more: false,
    })]));

    let batch = fetch(api, 100).await;

    let ts: Vec<&str> = batch.iter().map(|m| m.ts.as_str()).collect();
    assert_eq!(ts, vec!["100.1", "100.2", "100.3"]);
    for pair in batch.windows(2) {
        assert!(pair[0].ts_seconds() < pair[1].ts_seconds());
    }
}

#[tokio::test]
async fn test_non_content_events_are_filtered_per_page() {
    let mut bot = raw("100.1", "U1", "automated");
    bot.bot_id = Some("B1".to_owned());
    let mut joined = raw("100.2", "U2", "joined the channel");
    joined.kind = Some("channel_join".to_owned());
    let mut textless = raw("100.3", "U3", "");
    textless.text = None;

    let api = Arc::new(ScriptedSlack::new(vec![PageScript::Page(MessagePage {
        messages: vec![
            bot,
            joined,
            textless,
            raw("100.4", "U4", "real message"),
            raw("100.5", "U5", "another one"),
        ],
        next_cursor: None,
        has_more: false,
    })]));

    let batch = fetch(api, 100).await;

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].text, "real message");
}

#[tokio::test]
async fn test_error_mid_pagination_returns_empty_not_partial() {
    let api = Arc::new(ScriptedSlack::new(vec![
        page_of(60, 1000, true, Some("c1")),
        PageScript::Error,
    ]));

    let batch = fetch(api.clone(), 200).await;

    // 60 messages were already gathered; the fail-empty policy discards them
    assert!(batch.is_empty());
    assert_eq!(api.history_calls(), 2);
}

#[tokio::test]
async fn test_empty_range_is_empty_not_an_error() {
    let api = Arc::new(ScriptedSlack::new(vec![PageScript::Page(
        MessagePage::default(),
    )]));

    let batch = fetch(api, 100).await;
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_display_names_are_resolved_best_effort() {
    let api = Arc::new(
        ScriptedSlack::new(vec![PageScript::Page(MessagePage {
            messages: vec![raw("100.1", "U1", "hi"), raw("100.2", "U2", "hey")],
            next_cursor: None,
            has_more: false,
        })])
        .with_names(&[("U1", "Alice")]),
    );

    let batch = fetch(api, 100).await;

    assert_eq!(batch[0].user, "Alice");
    // No mapping for U2: the raw id stays
    assert_eq!(batch[1].user, "U2");
}

#[tokio::test]
async fn test_name_lookup_failure_never_fails_the_fetch() {
    let api = Arc::new(
        ScriptedSlack::new(vec![PageScript::Page(MessagePage {
            messages: vec![raw("100.1", "U1", "hi")],
            next_cursor: None,
            has_more: false,
        })])
        .with_failing_name_lookups(),
    );

    let batch = fetch(api, 100).await;

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].user, "U1");
}

#[tokio::test]
async fn test_pagination_stops_when_cursor_is_missing() {
    // has_more claims another page but no cursor was returned
    let api = Arc::new(ScriptedSlack::new(vec![page_of(10, 1000, true, None)]));

    let batch = fetch(api.clone(), 100).await;

    assert_eq!(batch.len(), 10);
    assert_eq!(api.history_calls(), 1);
}
