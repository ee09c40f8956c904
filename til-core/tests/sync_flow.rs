//! Controller scenarios against the in-memory store.
//!
//! These cover the board's guarantees end to end: filtered listings, the
//! staleness guard on category changes, confirmed-only inserts and votes,
//! and per-fact busy tracking.

use std::sync::Arc;
use std::time::Duration;
use til_core::testing::{fact, MemoryStore, StoreOp};
use til_core::{
    Category, CategoryFilter, FactId, FetchOutcome, Operation, StoreError, SyncController,
    SyncError, VoteField, MAX_FACTS,
};

fn board(store: &Arc<MemoryStore>) -> SyncController {
    SyncController::new(store.clone())
}

fn ids(ctl: &SyncController) -> Vec<i64> {
    ctl.snapshot()
        .facts()
        .items()
        .iter()
        .map(|f| f.id.get())
        .collect()
}

// =============================================================================
// Category change
// =============================================================================

#[tokio::test]
async fn test_society_listing_is_filtered_sorted_and_capped() {
    let mut facts: Vec<_> = (1..=1200)
        .map(|id| fact(id, Category::Society, [(id * 7 % 101) as u32, 0, 0]))
        .collect();
    facts.push(fact(5000, Category::Science, [500, 0, 0]));
    let store = Arc::new(MemoryStore::with_facts(facts));
    let ctl = board(&store);

    let outcome = ctl.change_category(Category::Society.into()).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Applied { count: MAX_FACTS });

    let board = ctl.snapshot();
    let items = board.facts().items();
    assert!(items.len() <= MAX_FACTS);
    assert!(items.iter().all(|f| f.category == Category::Society));
    assert!(items
        .windows(2)
        .all(|w| w[0].votes_interesting >= w[1].votes_interesting));
    assert_eq!(
        board.facts().listed_category(),
        CategoryFilter::Only(Category::Society)
    );
}

#[tokio::test]
async fn test_later_category_wins_when_earlier_response_arrives_last() {
    let store = Arc::new(MemoryStore::with_facts(vec![
        fact(1, Category::Science, [5, 0, 0]),
        fact(2, Category::History, [4, 0, 0]),
        fact(3, Category::History, [3, 0, 0]),
    ]));
    let ctl = board(&store);
    let science_hold = store.hold(StoreOp::List);

    let science = ctl.change_category(Category::Science.into());
    let history = async {
        let outcome = ctl.change_category(Category::History.into()).await;
        science_hold.release();
        outcome
    };
    let (science, history) = tokio::join!(science, history);

    assert_eq!(history, Ok(FetchOutcome::Applied { count: 2 }));
    assert_eq!(science, Ok(FetchOutcome::Superseded));

    let board = ctl.snapshot();
    assert_eq!(ids(&ctl), vec![2, 3]);
    assert!(board
        .facts()
        .items()
        .iter()
        .all(|f| f.category == Category::History));
    assert_eq!(
        board.facts().active_category(),
        CategoryFilter::Only(Category::History)
    );
    assert!(!board.facts().is_loading());
}

#[tokio::test]
async fn test_superseded_request_does_not_clear_loading() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    let first = store.hold(StoreOp::List);
    let second = store.hold(StoreOp::List);
    let rx = ctl.subscribe();

    let technology = ctl.change_category(Category::Technology.into());
    let society = ctl.change_category(Category::Society.into());
    let driver = async {
        tokio::task::yield_now().await;
        first.release();
        // Let the stale technology response land while society is still out.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(rx.borrow().facts().is_loading());
        second.release();
    };
    let (technology, society, ()) = tokio::join!(technology, society, driver);

    assert_eq!(technology, Ok(FetchOutcome::Superseded));
    assert_eq!(society, Ok(FetchOutcome::Applied { count: 2 }));
    assert!(!rx.borrow().facts().is_loading());
}

#[tokio::test]
async fn test_superseded_failure_is_discarded() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    let hold = store.hold(StoreOp::List);

    let stale = ctl.change_category(Category::Technology.into());
    let fresh = async {
        let outcome = ctl.change_category(CategoryFilter::All).await;
        // Only the parked technology request is left to take this failure.
        store.fail_next(StoreOp::List);
        hold.release();
        outcome
    };
    let (stale, fresh) = tokio::join!(stale, fresh);

    assert_eq!(fresh, Ok(FetchOutcome::Applied { count: 3 }));
    assert_eq!(stale, Ok(FetchOutcome::Superseded));

    let board = ctl.snapshot();
    assert!(board.notice().is_none());
    assert_eq!(board.facts().len(), 3);
    assert_eq!(board.facts().active_category(), CategoryFilter::All);
    assert!(!board.facts().is_loading());
}

#[tokio::test]
async fn test_failed_category_change_keeps_stale_but_consistent_list() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.change_category(Category::Society.into()).await.unwrap();

    store.fail_next(StoreOp::List);
    let err = ctl
        .change_category(Category::Technology.into())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Network(_))));

    let board = ctl.snapshot();
    assert_eq!(ids(&ctl), vec![2, 3]);
    assert_eq!(
        board.facts().listed_category(),
        CategoryFilter::Only(Category::Society)
    );
    assert!(!board.facts().is_loading());
    let notice = board.notice().unwrap();
    assert_eq!(notice.operation, Operation::LoadFacts);
    assert_eq!(notice.message, "There was a problem getting data");
}

// =============================================================================
// Fact submission
// =============================================================================

#[tokio::test]
async fn test_submitted_fact_is_prepended_from_server_record() {
    let store = Arc::new(MemoryStore::with_sample_facts().with_year(2024));
    let ctl = board(&store);
    ctl.refresh().await.unwrap();

    ctl.toggle_form();
    ctl.edit_draft(|d| {
        d.text = "Honey never spoils".to_string();
        d.source = "https://www.smithsonianmag.com/science-nature/honey".to_string();
        d.category = "science".to_string();
    });
    let created = ctl.submit().await.unwrap();

    assert_eq!(created.id, FactId::new(4));
    assert_eq!(created.created_in, 2024);
    let board = ctl.snapshot();
    let head = &board.facts().items()[0];
    assert_eq!(head, &created);
    assert_eq!(
        (head.votes_interesting, head.votes_mindblowing, head.votes_false),
        (0, 0, 0)
    );
    assert_eq!(board.facts().len(), 4);

    // Form is cleared and closed.
    assert!(!board.form().is_open());
    assert!(!board.form().is_submitting());
    assert!(board.form().draft().text.is_empty());
    assert!(board.form().draft().source.is_empty());
    assert!(board.form().draft().category.is_empty());
}

#[tokio::test]
async fn test_submission_outside_active_filter_is_not_shown() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.change_category(Category::Society.into()).await.unwrap();

    let created = ctl
        .submit_fact("Octopuses have three hearts", "https://example.com/octopus", "science")
        .await
        .unwrap();

    assert!(store.row(created.id).is_some());
    assert_eq!(ids(&ctl), vec![2, 3]);
}

#[tokio::test]
async fn test_failed_submission_keeps_form_open_and_filled() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    store.fail_next_with(
        StoreOp::Insert,
        StoreError::Api {
            status: 409,
            message: "duplicate key value".to_string(),
        },
    );

    let err = ctl
        .submit_fact("Honey never spoils", "https://example.com/honey", "science")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Api { status: 409, .. })));

    let board = ctl.snapshot();
    assert_eq!(board.facts().len(), 3);
    assert!(board.form().is_open());
    assert!(!board.form().is_submitting());
    assert_eq!(board.form().draft().text, "Honey never spoils");
    assert_eq!(board.notice().unwrap().operation, Operation::SubmitFact);
}

#[tokio::test]
async fn test_second_submit_while_first_in_flight_is_refused() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let hold = store.hold(StoreOp::Insert);

    let first = ctl.submit_fact("Honey never spoils", "https://example.com/honey", "science");
    let second = async {
        tokio::task::yield_now().await;
        let snapshot = ctl.snapshot();
        assert!(snapshot.form().is_submitting());
        // Inputs are locked while the insert is out.
        assert!(!ctl.edit_draft(|d| d.text.clear()));
        let outcome = ctl.submit().await;
        hold.release();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert_eq!(second, Err(SyncError::SubmissionInFlight));
    assert_eq!(store.calls(StoreOp::Insert), 1);
}

#[tokio::test]
async fn test_form_stays_open_when_toggled_during_failed_submit() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let hold = store.hold(StoreOp::Insert);
    store.fail_next(StoreOp::Insert);

    let submit = ctl.submit_fact("Honey never spoils", "https://example.com/honey", "science");
    let fiddle = async {
        tokio::task::yield_now().await;
        // Toggling and closing are ignored while the insert is out.
        assert!(ctl.toggle_form());
        ctl.close_form();
        assert!(ctl.snapshot().form().is_open());
        hold.release();
    };
    let (submit, ()) = tokio::join!(submit, fiddle);

    assert!(matches!(submit, Err(SyncError::Store(_))));
    let board = ctl.snapshot();
    assert!(board.form().is_open());
    assert_eq!(board.form().draft().text, "Honey never spoils");

    // Once idle the form toggles again.
    assert!(!ctl.toggle_form());
}

// =============================================================================
// Vote casting
// =============================================================================

#[tokio::test]
async fn test_vote_replaces_record_with_server_copy() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();

    let id = FactId::new(1);
    let updated = ctl.cast_vote(id, VoteField::False).await.unwrap();
    assert_eq!(updated.votes_false, 5);

    let board = ctl.snapshot();
    let shown = board.facts().get(id).unwrap();
    assert_eq!(shown, &updated);
    assert_eq!(shown, &store.row(id).unwrap());
    assert_eq!(
        (shown.votes_interesting, shown.votes_mindblowing),
        (24, 9)
    );
    assert!(!board.is_voting(id));
    // Position unchanged.
    assert_eq!(ids(&ctl), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_false_vote_from_four_shows_five_on_board() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let id = FactId::new(1);
    assert_eq!(ctl.snapshot().facts().get(id).unwrap().votes_false, 4);

    let confirmed = ctl.cast_vote(id, VoteField::False).await.unwrap();

    let board = ctl.snapshot();
    let shown = board.facts().get(id).unwrap();
    assert_eq!(shown.votes_false, 5);
    assert_eq!(shown, &confirmed);
}

#[tokio::test]
async fn test_failed_vote_leaves_counters_and_clears_busy() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let id = FactId::new(3);
    let before = ctl.snapshot().facts().get(id).cloned().unwrap();

    store.fail_next(StoreOp::Vote);
    let err = ctl.cast_vote(id, VoteField::Interesting).await.unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));

    let board = ctl.snapshot();
    assert_eq!(board.facts().get(id), Some(&before));
    assert!(!board.is_voting(id));
    assert_eq!(board.notice().unwrap().operation, Operation::Vote(id));
}

#[tokio::test]
async fn test_counters_do_not_move_before_confirmation() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let id = FactId::new(2);
    let hold = store.hold(StoreOp::Vote);

    let vote = ctl.cast_vote(id, VoteField::Mindblowing);
    let observe = async {
        tokio::task::yield_now().await;
        let board = ctl.snapshot();
        assert!(board.is_voting(id));
        assert_eq!(board.facts().get(id).unwrap().votes_mindblowing, 2);
        hold.release();
    };
    let (vote, ()) = tokio::join!(vote, observe);

    assert_eq!(vote.unwrap().votes_mindblowing, 3);
    assert_eq!(ctl.snapshot().facts().get(id).unwrap().votes_mindblowing, 3);
}

#[tokio::test]
async fn test_votes_on_different_facts_do_not_block_each_other() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let hold = store.hold(StoreOp::Vote);

    // Fact 1's vote is parked; fact 2's goes through meanwhile.
    let slow = ctl.cast_vote(FactId::new(1), VoteField::Interesting);
    let fast = async {
        tokio::task::yield_now().await;
        assert!(ctl.is_voting(FactId::new(1)));
        let outcome = ctl.cast_vote(FactId::new(2), VoteField::Interesting).await;
        assert!(ctl.is_voting(FactId::new(1)));
        assert!(!ctl.is_voting(FactId::new(2)));
        hold.release();
        outcome
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow.unwrap().votes_interesting, 25);
    assert_eq!(fast.unwrap().votes_interesting, 12);
    assert_eq!(ctl.snapshot().votes_in_flight(), 0);
}

#[tokio::test]
async fn test_second_vote_on_same_fact_is_refused_while_updating() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let id = FactId::new(1);
    let hold = store.hold(StoreOp::Vote);

    let first = ctl.cast_vote(id, VoteField::Interesting);
    let second = async {
        tokio::task::yield_now().await;
        let outcome = ctl.cast_vote(id, VoteField::False).await;
        hold.release();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().votes_interesting, 25);
    assert_eq!(second, Err(SyncError::VoteInFlight(id)));
    assert_eq!(store.calls(StoreOp::Vote), 1);
    assert_eq!(ctl.snapshot().facts().get(id).unwrap().votes_false, 4);
}

#[tokio::test]
async fn test_vote_lands_after_category_switch() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let hold = store.hold(StoreOp::Vote);

    // The voted fact leaves the board before its vote is confirmed.
    let vote = ctl.cast_vote(FactId::new(1), VoteField::Interesting);
    let switch = async {
        tokio::task::yield_now().await;
        let outcome = ctl.change_category(Category::Society.into()).await;
        hold.release();
        outcome
    };
    let (vote, switch) = tokio::join!(vote, switch);

    assert!(vote.is_ok());
    assert!(switch.is_ok());
    assert_eq!(ids(&ctl), vec![2, 3]);
    assert!(!ctl.is_voting(FactId::new(1)));
    assert_eq!(store.row(FactId::new(1)).unwrap().votes_interesting, 25);
}

// =============================================================================
// Disputed marking
// =============================================================================

#[tokio::test]
async fn test_disputed_follows_confirmed_counters() {
    let store = Arc::new(MemoryStore::with_facts(vec![fact(
        1,
        Category::News,
        [1, 0, 1],
    )]));
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    assert!(!ctl.snapshot().facts().items()[0].is_disputed());

    ctl.cast_vote(FactId::new(1), VoteField::False).await.unwrap();
    assert!(ctl.snapshot().facts().items()[0].is_disputed());
}

#[tokio::test]
async fn test_subscribers_see_every_change() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    let mut rx = ctl.subscribe();

    ctl.refresh().await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().facts().len(), 3);

    ctl.cast_vote(FactId::new(3), VoteField::Interesting)
        .await
        .unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(
        rx.borrow_and_update()
            .facts()
            .get(FactId::new(3))
            .unwrap()
            .votes_interesting,
        9
    );
}

// =============================================================================
// Abandoned requests
// =============================================================================

#[tokio::test]
async fn test_abandoned_vote_releases_fact() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let id = FactId::new(1);
    let _hold = store.hold(StoreOp::Vote);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        ctl.cast_vote(id, VoteField::Interesting),
    )
    .await;
    assert!(outcome.is_err());

    let board = ctl.snapshot();
    assert!(!board.is_voting(id));
    assert_eq!(board.votes_in_flight(), 0);
    assert_eq!(board.facts().get(id).unwrap().votes_interesting, 24);
    assert!(board.notice().is_none());

    let again = ctl.cast_vote(id, VoteField::Interesting).await.unwrap();
    assert_eq!(again.votes_interesting, 25);
}

#[tokio::test]
async fn test_abandoned_submit_unlocks_form() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let _hold = store.hold(StoreOp::Insert);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        ctl.submit_fact("Honey never spoils", "https://example.com/honey", "science"),
    )
    .await;
    assert!(outcome.is_err());

    let board = ctl.snapshot();
    assert!(!board.form().is_submitting());
    assert!(board.form().is_open());
    assert_eq!(board.form().draft().text, "Honey never spoils");
    assert_eq!(board.facts().len(), 3);

    assert!(ctl.edit_draft(|d| d.text = "Honey never spoils, ever".to_string()));
    let created = ctl.submit().await.unwrap();
    assert_eq!(created.text, "Honey never spoils, ever");
    assert_eq!(ctl.snapshot().facts().items()[0].id, created.id);
}

#[tokio::test]
async fn test_abandoned_fetch_clears_loading() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    ctl.refresh().await.unwrap();
    let _hold = store.hold(StoreOp::List);

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        ctl.change_category(Category::Society.into()),
    )
    .await;
    assert!(outcome.is_err());

    let board = ctl.snapshot();
    assert!(!board.facts().is_loading());
    assert_eq!(board.facts().listed_category(), CategoryFilter::All);
    assert_eq!(board.facts().len(), 3);

    assert_eq!(ctl.refresh().await, Ok(FetchOutcome::Applied { count: 2 }));
}

#[tokio::test]
async fn test_abandoned_stale_fetch_leaves_latest_loading() {
    let store = Arc::new(MemoryStore::with_sample_facts());
    let ctl = board(&store);
    let _stale_hold = store.hold(StoreOp::List);
    let latest_hold = store.hold(StoreOp::List);

    let stale = tokio::time::timeout(
        Duration::from_millis(50),
        ctl.change_category(Category::Technology.into()),
    );
    let latest = ctl.change_category(Category::Society.into());
    let watch = async {
        // The stale request times out while the latest one is still parked.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ctl.snapshot().facts().is_loading());
        latest_hold.release();
    };
    let (stale, latest, ()) = tokio::join!(stale, latest, watch);

    assert!(stale.is_err());
    assert_eq!(latest, Ok(FetchOutcome::Applied { count: 2 }));
    assert!(!ctl.snapshot().facts().is_loading());
}
