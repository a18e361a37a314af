mod common;

use common::{open_flaky, FlakyStore};
use tierboard_core::db::open_db_in_memory;
use tierboard_core::repo::layout_repo::persist_layout;
use tierboard_core::{
    BoardError, CollectionState, ContainerId, Hover, ItemId, MoveEffect, Namespace, Outcome,
    RecordStore, SessionPhase, SkipReason, StoreError, StoredRecord, SyncStatus, Tier, TierId,
    DEFAULT_TIERS,
};

fn move_to(
    board: &mut common::FlakyBoard<'_>,
    item_id: &ItemId,
    to: ContainerId,
) -> Outcome<MoveEffect> {
    let (source, _) = board.state().locate(item_id).unwrap();
    board.begin_drag(item_id.clone(), source);
    board.update_drag_target(&Hover::container(to));
    board.drop_drag()
}

#[test]
fn empty_store_is_seeded_with_default_tiers_once() {
    let conn = open_db_in_memory().unwrap();
    let first_ids: Vec<TierId> = {
        let board = open_flaky(&conn, true);
        let labels: Vec<&str> = board
            .state()
            .tiers
            .iter()
            .map(|tier| tier.label.as_str())
            .collect();
        let expected: Vec<&str> = DEFAULT_TIERS.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, expected);
        board.state().tiers.iter().map(|tier| tier.id.clone()).collect()
    };

    let reopened = open_flaky(&conn, true);
    let reopened_ids: Vec<TierId> = reopened
        .state()
        .tiers
        .iter()
        .map(|tier| tier.id.clone())
        .collect();
    assert_eq!(reopened_ids, first_ids);
}

#[test]
fn unseeded_board_starts_empty() {
    let conn = open_db_in_memory().unwrap();
    let board = open_flaky(&conn, false);
    assert!(board.state().tiers.is_empty());
    assert!(board.state().sidebar.is_empty());
    assert!(board.sync_status().is_synced());
}

#[test]
fn tier_edits_validate_and_persist() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);

    assert!(matches!(
        board.create_tier("   ", "#ffffff"),
        Err(BoardError::InvalidLabel)
    ));
    assert!(matches!(
        board.create_tier("S", "red"),
        Err(BoardError::InvalidColor(ref value)) if value == "red"
    ));
    assert!(board.state().tiers.is_empty());

    let s = board.create_tier("  S ", "#FF7F7F").unwrap().applied().unwrap();
    let a = board.create_tier("A", "#ffbf7f").unwrap().applied().unwrap();
    assert_eq!(board.state().tier(&s).unwrap().label, "S");
    assert_eq!(board.state().tier(&s).unwrap().color, "#ff7f7f");

    board.rename_tier(&s, "Super").unwrap();
    board.recolor_tier(&a, "#00AA00").unwrap();
    assert!(matches!(
        board.rename_tier(&s, ""),
        Err(BoardError::InvalidLabel)
    ));
    assert_eq!(board.reorder_tier(&s, 99), Outcome::Applied(1));

    let missing = TierId::from("gone");
    assert_eq!(
        board.rename_tier(&missing, "x").unwrap(),
        Outcome::Skipped(SkipReason::TierNotFound(missing.clone()))
    );
    assert_eq!(
        board.reorder_tier(&missing, 0),
        Outcome::Skipped(SkipReason::TierNotFound(missing))
    );

    let reopened = open_flaky(&conn, false);
    let tiers: Vec<(&str, &str)> = reopened
        .state()
        .tiers
        .iter()
        .map(|tier| (tier.label.as_str(), tier.color.as_str()))
        .collect();
    assert_eq!(tiers, vec![("A", "#00aa00"), ("Super", "#ff7f7f")]);
}

#[test]
fn deleting_tier_returns_items_to_sidebar_end() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let s = board.create_tier("S", "#ff7f7f").unwrap().applied().unwrap();
    let first = board.add_item(b"1".to_vec()).applied().unwrap();
    let second = board.add_item(b"2".to_vec()).applied().unwrap();
    move_to(&mut board, &first, ContainerId::Tier(s.clone()));

    assert_eq!(board.delete_tier(&s), Outcome::Applied(()));
    assert!(board.state().tiers.is_empty());
    assert_eq!(board.state().sidebar, vec![second, first]);
    assert_eq!(
        board.delete_tier(&s),
        Outcome::Skipped(SkipReason::TierNotFound(s))
    );
}

#[test]
fn deleting_tier_under_drag_cancels_session() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let s = board.create_tier("S", "#ff7f7f").unwrap().applied().unwrap();
    let item = board.add_item(b"1".to_vec()).applied().unwrap();

    board.begin_drag(item.clone(), ContainerId::Sidebar);
    board.update_drag_target(&Hover::container(ContainerId::Tier(s.clone())));
    board.delete_tier(&s);

    assert_eq!(board.session_phase(), SessionPhase::Idle);
    assert_eq!(board.state().sidebar, vec![item]);
}

#[test]
fn capture_window_holds_off_mutations() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let s = board.create_tier("S", "#ff7f7f").unwrap().applied().unwrap();
    let item = board.add_item(b"1".to_vec()).applied().unwrap();

    let view = board.open_capture_window();
    assert!(board.is_capture_window_open());
    assert_eq!(view.sidebar_item_ids(), vec![item.clone()]);
    let before = board.state().clone();

    assert_eq!(
        board.add_item(b"2".to_vec()),
        Outcome::Skipped(SkipReason::CaptureWindowOpen)
    );
    assert_eq!(
        board.create_tier("A", "#ffbf7f").unwrap(),
        Outcome::Skipped(SkipReason::CaptureWindowOpen)
    );
    assert_eq!(
        board.delete_tier(&s),
        Outcome::Skipped(SkipReason::CaptureWindowOpen)
    );
    assert_eq!(board.reset(), Outcome::Skipped(SkipReason::CaptureWindowOpen));
    assert_eq!(
        move_to(&mut board, &item, ContainerId::Tier(s.clone())),
        Outcome::Skipped(SkipReason::CaptureWindowOpen)
    );
    assert_eq!(board.session_phase(), SessionPhase::Idle);
    assert_eq!(board.state(), &before);

    board.close_capture_window();
    assert!(move_to(&mut board, &item, ContainerId::Tier(s)).is_applied());
}

#[test]
fn failed_blob_write_is_unsynced_until_retry() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);

    board.store().fail_writes.set(true);
    let item = board.add_item(b"payload".to_vec()).applied().unwrap();
    assert_eq!(board.state().sidebar, vec![item.clone()]);
    assert!(board.handle(&item).is_some());
    assert!(matches!(board.sync_status(), SyncStatus::Unsynced { .. }));
    assert!(board
        .store()
        .get(Namespace::Blobs, item.as_str())
        .unwrap()
        .is_none());

    assert!(matches!(
        board.retry_sync(),
        Err(BoardError::Store(StoreError::QuotaExceeded))
    ));

    // A later layout write alone does not recover the lost payload.
    board.store().fail_writes.set(false);
    board.create_tier("S", "#ff7f7f").unwrap();
    assert!(!board.sync_status().is_synced());

    board.retry_sync().unwrap();
    assert_eq!(board.sync_status(), &SyncStatus::Synced);
    let stored = board
        .store()
        .get(Namespace::Blobs, item.as_str())
        .unwrap()
        .unwrap();
    assert_eq!(stored.payload, b"payload".to_vec());

    let reopened = open_flaky(&conn, false);
    assert_eq!(reopened.state(), board.state());
}

#[test]
fn failed_move_keeps_memory_authoritative() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let s = board.create_tier("S", "#ff7f7f").unwrap().applied().unwrap();
    let item = board.add_item(b"1".to_vec()).applied().unwrap();

    board.store().fail_writes.set(true);
    let effect = move_to(&mut board, &item, ContainerId::Tier(s.clone()))
        .applied()
        .unwrap();
    assert!(matches!(effect, MoveEffect::Moved { .. }));
    assert_eq!(board.state().tier(&s).unwrap().item_ids, vec![item.clone()]);
    assert!(!board.sync_status().is_synced());

    // The store still has the old layout.
    let stale = open_flaky(&conn, false);
    assert_eq!(stale.state().sidebar, vec![item.clone()]);

    board.store().fail_writes.set(false);
    board.retry_sync().unwrap();
    let reopened = open_flaky(&conn, false);
    assert_eq!(reopened.state().tier(&s).unwrap().item_ids, vec![item]);
}

#[test]
fn handles_are_released_exactly_once() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let items: Vec<ItemId> = (0..3u8)
        .map(|n| board.add_item(vec![n]).applied().unwrap())
        .collect();
    assert_eq!(board.handle_provider().acquired, 3);

    board.begin_drag(items[1].clone(), ContainerId::Sidebar);
    board.update_drag_target(&Hover::trash());
    assert!(matches!(
        board.drop_drag(),
        Outcome::Applied(MoveEffect::Deleted { .. })
    ));
    assert_eq!(board.handle_provider().released_total(), 1);

    board.reset();
    assert_eq!(board.handle_provider().released_total(), 3);
    assert_eq!(board.handle_provider().max_releases_per_handle(), 1);
    assert!(board.display_handles().is_empty());
}

#[test]
fn reset_purges_items_and_restores_defaults() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, true);
    let custom = board.create_tier("Custom", "#123456").unwrap().applied().unwrap();
    let item = board.add_item(b"1".to_vec()).applied().unwrap();
    move_to(&mut board, &item, ContainerId::Tier(custom.clone()));

    assert_eq!(board.reset(), Outcome::Applied(()));
    assert_eq!(board.state().tiers.len(), DEFAULT_TIERS.len());
    assert!(board.state().tier(&custom).is_none());
    assert_eq!(board.state().item_count(), 0);
    assert!(board.sync_status().is_synced());
    assert!(board.store().get_all(Namespace::Blobs).unwrap().is_empty());

    let reopened = open_flaky(&conn, true);
    assert_eq!(reopened.state(), board.state());
}

#[test]
fn failed_reset_still_resets_memory() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let item = board.add_item(b"1".to_vec()).applied().unwrap();

    board.store().fail_writes.set(true);
    assert_eq!(board.reset(), Outcome::Applied(()));
    assert_eq!(board.state().item_count(), 0);
    assert!(!board.sync_status().is_synced());

    board.store().fail_writes.set(false);
    board.retry_sync().unwrap();
    assert!(board
        .store()
        .get(Namespace::Blobs, item.as_str())
        .unwrap()
        .is_none());
    let reopened = open_flaky(&conn, false);
    assert!(!reopened.state().contains_item(&item));
}

#[test]
fn trash_drop_with_failed_delete_stays_deleted_after_retry() {
    let conn = open_db_in_memory().unwrap();
    let mut board = open_flaky(&conn, false);
    let doomed = board.add_item(b"doomed".to_vec()).applied().unwrap();
    let kept = board.add_item(b"kept".to_vec()).applied().unwrap();

    board.store().fail_writes.set(true);
    board.begin_drag(doomed.clone(), ContainerId::Sidebar);
    board.update_drag_target(&Hover::trash());
    assert!(matches!(
        board.drop_drag(),
        Outcome::Applied(MoveEffect::Deleted { .. })
    ));
    assert!(!board.state().contains_item(&doomed));
    assert!(!board.sync_status().is_synced());

    // A later layout write alone does not settle the outstanding delete.
    board.store().fail_writes.set(false);
    board.create_tier("S", "#ff7f7f").unwrap();
    assert!(!board.sync_status().is_synced());
    assert!(board
        .store()
        .get(Namespace::Blobs, doomed.as_str())
        .unwrap()
        .is_some());

    board.retry_sync().unwrap();
    assert_eq!(board.sync_status(), &SyncStatus::Synced);
    assert!(board
        .store()
        .get(Namespace::Blobs, doomed.as_str())
        .unwrap()
        .is_none());

    let reopened = open_flaky(&conn, false);
    assert!(!reopened.state().contains_item(&doomed));
    assert_eq!(reopened.state().sidebar, vec![kept]);
}

#[test]
fn open_repairs_dangling_ids_and_adopts_orphans() {
    let conn = open_db_in_memory().unwrap();
    let kept = ItemId::from("kept");
    let orphan = ItemId::from("orphan");
    let mut tier = Tier::new("S", "#ff7f7f");
    tier.item_ids = vec![ItemId::from("dangling"), kept.clone()];
    let tier_id = tier.id.clone();
    {
        let store = FlakyStore::new(&conn);
        let state = CollectionState {
            tiers: vec![tier],
            sidebar: vec![kept.clone()],
        };
        persist_layout(&store, &state).unwrap();
        store
            .put_all(
                Namespace::Blobs,
                &[
                    StoredRecord::new("kept", vec![1]),
                    StoredRecord::new("orphan", vec![2]),
                ],
            )
            .unwrap();
    }

    let board = open_flaky(&conn, false);
    assert_eq!(board.state().tier(&tier_id).unwrap().item_ids, vec![kept]);
    assert_eq!(board.state().sidebar, vec![orphan.clone()]);
    assert!(board.handle(&orphan).is_some());
    board.state().check_conservation().unwrap();

    // The repaired layout was written back.
    let reopened = open_flaky(&conn, false);
    assert_eq!(reopened.state(), board.state());
}
