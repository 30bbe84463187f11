use portal_core::prelude::*;
use portal_core::{MutationPhase, RefreshOutcome};
use portal_model::{ActivityRegistration, DressPreference, SectionCompletion};
use portal_test_utils::{fixtures, GatewayCall, Operation, ScriptedGateway};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn loaded(gateway: ScriptedGateway) -> (Arc<ScriptedGateway>, Arc<MutationOrchestrator<ScriptedGateway>>) {
    let gateway = Arc::new(gateway);
    let store = Arc::new(PortalStore::new(Arc::clone(&gateway), fixtures::token()));
    store.refresh().await.unwrap();
    (gateway, Arc::new(MutationOrchestrator::new(store)))
}

#[tokio::test]
async fn test_rsvp_confirmation_flows_through_refresh() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::pending_aggregate(),
    ))
    .await;
    let store = orchestrator.store();
    assert_eq!(store.completion().map(|c| c.rsvp), Some(false));

    let input: RsvpInput =
        serde_json::from_value(serde_json::json!({"status": "confirmed", "number_of_attendees": 2}))
            .unwrap();
    let outcome = orchestrator.update_rsvp(&input).await.unwrap();

    assert_eq!(outcome.confirmed.number_of_attendees, 2);
    assert_eq!(store.completion().map(|c| c.rsvp), Some(true));
    assert_eq!(
        store.aggregate().map(|a| a.guest.number_of_attendees),
        Some(2)
    );

    // The applied fetch was issued after the write resolved.
    let calls = gateway.calls();
    let write_at = calls
        .iter()
        .position(|call| call.operation() == Operation::Rsvp)
        .unwrap();
    let last_fetch_at = calls
        .iter()
        .rposition(|call| call.operation() == Operation::Fetch)
        .unwrap();
    assert!(last_fetch_at > write_at);
    assert_eq!(
        store.snapshot().map(|s| s.sequence),
        outcome.refresh.ok().map(|r| r.sequence())
    );
}

#[tokio::test]
async fn test_legacy_dress_preference_completes_dress() {
    let mut aggregate = fixtures::pending_aggregate();
    aggregate.dress_codes = vec![fixtures::dress_code(1)];
    aggregate.dress_preferences = vec![DressPreference {
        dress_code_id: Some(DressCodeId(1)),
        planned_outfit: Some("Blue dress".to_string()),
        ..DressPreference::default()
    }];
    let (_, orchestrator) = loaded(ScriptedGateway::with_guest(fixtures::token(), aggregate)).await;

    assert_eq!(orchestrator.store().completion().map(|c| c.dress), Some(true));
}

#[tokio::test]
async fn test_unflagged_activity_without_registrations_is_incomplete() {
    let mut aggregate = fixtures::pending_aggregate();
    aggregate.activities = vec![fixtures::activity(5, Some(false))];
    aggregate.activity_registrations = vec![];
    let (_, orchestrator) = loaded(ScriptedGateway::with_guest(fixtures::token(), aggregate)).await;

    assert_eq!(
        orchestrator.store().completion().map(|c| c.activities),
        Some(false)
    );
}

#[tokio::test]
async fn test_out_of_order_fetches_keep_last_issued() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::pending_aggregate(),
    ))
    .await;
    let store = Arc::clone(orchestrator.store());

    let mut hold = gateway.hold_next_fetch();
    let early = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.refresh().await }
    });
    hold.wait_until_issued().await;

    gateway.update_guest(&fixtures::token(), |aggregate| {
        aggregate.food_preference = Some(Default::default());
    });
    let late = store.refresh().await.unwrap();
    assert!(late.is_applied());

    hold.release();
    let early = early.await.unwrap().unwrap();
    assert!(!early.is_applied());
    assert!(early.sequence() < late.sequence());

    assert_eq!(store.completion().map(|c| c.food), Some(true));
    assert_eq!(store.snapshot().map(|s| s.sequence), Some(late.sequence()));
}

#[tokio::test]
async fn test_failed_mutation_leaves_store_unchanged() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::pending_aggregate(),
    ))
    .await;
    let store = orchestrator.store();
    let before = store.snapshot().unwrap();
    let fetches_before = gateway.fetch_count();

    gateway.fail_next(
        Operation::Travel,
        GatewayError::validation("Invalid travel data", [("arrival_date", "must be a date")]),
    );
    let err = orchestrator
        .update_travel(&TravelInput::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(portal_gateway::ErrorKind::Validation));
    assert!(!err.is_retryable());
    assert_eq!(store.snapshot().unwrap(), before);
    assert_eq!(store.completion(), Some(SectionCompletion::default()));
    assert_eq!(gateway.fetch_count(), fetches_before);
    assert_eq!(
        orchestrator
            .status(MutationKind::Travel)
            .last_error
            .map(|e| e.detail),
        Some("Invalid travel data".to_string())
    );
}

#[tokio::test]
async fn test_rapid_hotel_updates_converge_on_last_refresh() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::pending_aggregate(),
    ))
    .await;

    let mut hold = gateway.hold_next_fetch();
    let first = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            orchestrator
                .update_hotel_preference(&HotelInput::custom("Casa Azul", None))
                .await
        }
    });
    hold.wait_until_issued().await;
    assert_eq!(
        orchestrator.phase(MutationKind::Hotel),
        MutationPhase::Invalidating
    );

    let second = orchestrator
        .update_hotel_preference(&HotelInput::suggested(HotelId(2)))
        .await
        .unwrap();
    assert!(second.refresh.as_ref().is_ok_and(RefreshOutcome::is_applied));

    hold.release();
    let first = first.await.unwrap().unwrap();
    assert_eq!(
        first.refresh.as_ref().ok().map(RefreshOutcome::is_applied),
        Some(false)
    );

    let hotel = orchestrator.store().aggregate().and_then(|a| a.hotel_info).unwrap();
    assert_eq!(hotel.suggested_hotel_id, Some(HotelId(2)));
    assert_eq!(hotel.custom_hotel_name, None);
    assert_eq!(orchestrator.status(MutationKind::Hotel).completed, 2);
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn test_concurrent_refreshes_settle_on_one_snapshot() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::complete_aggregate(),
    ))
    .await;
    let store = orchestrator.store();

    let (a, b) = futures::future::join(store.refresh(), store.refresh()).await;
    let applied = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|outcome| outcome.is_applied())
        .count();

    assert!(applied >= 1);
    assert!(!store.is_loading());
    assert_eq!(store.status(), LoadState::Ready);
    assert_eq!(gateway.fetch_count(), 3);
}

#[tokio::test]
async fn test_token_switch_never_shows_previous_guest() {
    let other = GuestToken::new("XY98ZW76");
    let mut other_aggregate = fixtures::pending_aggregate();
    other_aggregate.guest.id = 99;
    let (gateway, orchestrator) = loaded(
        ScriptedGateway::with_guest(fixtures::token(), fixtures::complete_aggregate())
            .and_guest(other.clone(), other_aggregate),
    )
    .await;
    let store = Arc::clone(orchestrator.store());
    assert!(store.completion().is_some_and(|c| c.is_complete()));

    let mut hold = gateway.hold_next_fetch();
    let switch = tokio::spawn({
        let store = Arc::clone(&store);
        let other = other.clone();
        async move { store.switch_token(other).await }
    });
    hold.wait_until_issued().await;

    // Nothing of the previous guest is visible while the new token loads.
    assert_eq!(store.status(), LoadState::NeverLoaded);
    assert!(store.aggregate().is_none());
    assert!(store.is_loading());

    hold.release();
    switch.await.unwrap().unwrap();
    assert_eq!(store.aggregate().map(|a| a.guest.id), Some(99));
    assert_eq!(store.completion(), Some(SectionCompletion::default()));
}

#[tokio::test]
async fn test_fetch_from_previous_token_is_dropped() {
    let other = GuestToken::new("XY98ZW76");
    let (gateway, orchestrator) = loaded(
        ScriptedGateway::with_guest(fixtures::token(), fixtures::complete_aggregate())
            .and_guest(other.clone(), fixtures::pending_aggregate()),
    )
    .await;
    let store = Arc::clone(orchestrator.store());

    let mut hold = gateway.hold_next_fetch();
    let stale = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.refresh().await }
    });
    hold.wait_until_issued().await;

    store.switch_token(other.clone()).await.unwrap();
    hold.release();
    let stale = stale.await.unwrap().unwrap();

    assert!(!stale.is_applied());
    assert_eq!(store.token(), other);
    assert_eq!(store.completion(), Some(SectionCompletion::default()));
}

#[tokio::test]
async fn test_bulk_activity_update_is_local_only() {
    let mut aggregate = fixtures::pending_aggregate();
    aggregate.activities = vec![
        fixtures::activity(5, Some(false)),
        fixtures::activity(6, Some(false)),
    ];
    let (gateway, orchestrator) =
        loaded(ScriptedGateway::with_guest(fixtures::token(), aggregate)).await;
    let calls_before = gateway.calls().len();

    let completion = orchestrator
        .set_activity_registrations([ActivityId(5), ActivityId(6)])
        .unwrap();

    assert!(completion.activities);
    assert_eq!(gateway.calls().len(), calls_before);
    assert_eq!(gateway.write_count(), 0);
    let server = gateway.server_state(&fixtures::token()).unwrap();
    assert_eq!(server.guest.registered_activities, None);

    // Server truth comes back on the next refresh.
    orchestrator.store().refresh().await.unwrap();
    assert_eq!(
        orchestrator.store().completion().map(|c| c.activities),
        Some(false)
    );
}

#[tokio::test]
async fn test_legacy_registration_rows_count_until_unregistered() {
    let mut aggregate = fixtures::pending_aggregate();
    aggregate.activities = vec![fixtures::activity(5, None)];
    aggregate.activity_registrations = vec![ActivityRegistration {
        activity_id: ActivityId(5),
        registered_at: Some("2026-08-01T10:00:00Z".to_string()),
    }];
    let (gateway, orchestrator) =
        loaded(ScriptedGateway::with_guest(fixtures::token(), aggregate)).await;
    assert_eq!(
        orchestrator.store().completion().map(|c| c.activities),
        Some(true)
    );

    let outcome = orchestrator.toggle_activity(ActivityId(5)).await.unwrap();

    assert!(!outcome.confirmed.is_registered);
    assert_eq!(
        gateway.calls().last(),
        Some(&GatewayCall::Fetch(fixtures::token()))
    );
    assert!(gateway
        .calls()
        .contains(&GatewayCall::Unregister(fixtures::token(), ActivityId(5))));
    assert_eq!(
        orchestrator.store().completion().map(|c| c.activities),
        Some(false)
    );
}

#[tokio::test]
async fn test_auth_failure_invalidates_session_but_keeps_data() {
    let (gateway, orchestrator) = loaded(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::complete_aggregate(),
    ))
    .await;
    let store = orchestrator.store();

    gateway.fail_next(Operation::Fetch, GatewayError::auth("Session expired"));
    let err = store.refresh().await.unwrap_err();

    assert!(!err.is_retryable());
    assert!(store.session_invalid());
    assert_eq!(store.status(), LoadState::Stale);
    assert!(store.completion().is_some_and(|c| c.is_complete()));
}

#[tokio::test]
async fn test_subscribers_see_loading_then_ready() {
    let gateway = Arc::new(ScriptedGateway::with_guest(
        fixtures::token(),
        fixtures::pending_aggregate(),
    ));
    let store = Arc::new(PortalStore::new(Arc::clone(&gateway), fixtures::token()));
    let mut views = store.subscribe();
    assert_eq!(views.borrow().status, LoadState::NeverLoaded);

    let mut hold = gateway.hold_next_fetch();
    let task = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.refresh().await }
    });
    hold.wait_until_issued().await;
    assert!(views.borrow_and_update().is_loading);

    hold.release();
    task.await.unwrap().unwrap();
    views.changed().await.unwrap();
    let view = views.borrow_and_update().clone();
    assert!(!view.is_loading);
    assert_eq!(view.status, LoadState::Ready);
    assert_eq!(view.completion(), Some(SectionCompletion::default()));
}
