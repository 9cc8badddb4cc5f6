//! Property-based tests for session save-load round-trip.
//!
//! For any valid BrowsingSession, saving through the SessionStore and loading
//! it back yields an equal session, tabs in creation order.

use chrono::{DateTime, Duration, Utc};
use darkelf_shell::database::Database;
use darkelf_shell::managers::session_store::{SessionStore, SessionStoreTrait};
use darkelf_shell::types::session::{BrowsingSession, TabSession};
use proptest::prelude::*;

// 2001-09-09 .. 2096-ish, with sub-second precision.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (1_000_000_000i64..4_000_000_000i64, 0u32..1_000_000_000u32)
        .prop_map(|(secs, nanos)| DateTime::from_timestamp(secs, nanos).unwrap())
}

fn arb_tab_fields() -> impl Strategy<Value = (String, String, Vec<String>, i64, f64, i64, i64)> {
    (
        "https?://[a-z]{3,15}\\.[a-z]{2,5}/[a-z0-9/_-]{0,30}",
        "[A-Za-z0-9 ]{0,50}",
        proptest::collection::vec("https://[a-z]{3,10}\\.org/[a-z]{0,10}", 0..5),
        0i64..1_000_000,
        0.25f64..5.0,
        0i64..3_600_000_000,
        0i64..3_600_000_000,
    )
}

fn arb_session() -> impl Strategy<Value = BrowsingSession> {
    (
        "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
        "[A-Za-z0-9 ]{1,40}",
        "[a-z]{3,12}",
        arb_instant(),
        proptest::collection::vec(arb_tab_fields(), 0..=6),
    )
        .prop_flat_map(|(id, name, persona_id, created_at, tab_fields)| {
            let tab_count = tab_fields.len();
            let active = if tab_count == 0 {
                Just(None).boxed()
            } else {
                proptest::option::of(0..tab_count).boxed()
            };
            (Just((id, name, persona_id, created_at, tab_fields)), active)
        })
        .prop_map(|((id, name, persona_id, created_at, tab_fields), active)| {
            let mut tabs = Vec::new();
            let mut tab_created = created_at;
            for (i, (url, title, mut history, scroll, zoom, gap_us, age_us)) in
                tab_fields.into_iter().enumerate()
            {
                // Non-decreasing creation times keep the vector in load order.
                tab_created = tab_created + Duration::microseconds(gap_us);
                history.push(url.clone());
                tabs.push(TabSession {
                    id: format!("{}-tab-{}", id, i),
                    url,
                    title,
                    persona_id: persona_id.clone(),
                    created_at: tab_created,
                    last_accessed: tab_created + Duration::microseconds(age_us),
                    history,
                    scroll_position: scroll,
                    zoom_factor: zoom,
                });
            }
            let last_accessed = tabs
                .iter()
                .map(|t| t.last_accessed)
                .max()
                .unwrap_or(created_at);
            let active_tab = active.map(|i| tabs[i].id.clone());
            BrowsingSession {
                id,
                name,
                persona_id,
                created_at,
                last_accessed,
                tabs,
                active_tab,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn save_then_load_is_identity(session in arb_session()) {
        let store = SessionStore::new(Database::open_in_memory().unwrap());

        store.save(&session).unwrap();
        let loaded = store.load(&session.id).unwrap();

        prop_assert_eq!(loaded, Some(session));
    }

    #[test]
    fn resave_replaces_previous_graph(first in arb_session(), second in arb_session()) {
        let store = SessionStore::new(Database::open_in_memory().unwrap());
        let mut second = second;
        // Same session, different tab set.
        second.id = first.id.clone();
        for (i, tab) in second.tabs.iter_mut().enumerate() {
            tab.id = format!("{}-second-{}", first.id, i);
        }
        second.active_tab = second.tabs.first().map(|t| t.id.clone());

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        prop_assert_eq!(store.load(&first.id).unwrap(), Some(second));
        prop_assert_eq!(store.count().unwrap(), 1);
    }
}
