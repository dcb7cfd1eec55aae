//! Integration tests for the pallet load-assignment engine.
//!
//! These exercise the public API end to end: capacity estimates, limit
//! checks, quantity suggestions, the drag/drop machine and the cache
//! reconciling against an in-memory planning service.

use pallet_core::config::UNITS_PER_LEVEL;
use pallet_core::{
    can_add, can_merge, levels_for, max_addable, stacked_height, stacked_weight, unit_weight,
    Assignment, DragEffect, DragPhase, DragSource, Destination, LineItem, MemoryPlanner,
    OrderBook, Pallet, PalletCache, PalletConfig, PalletError, PalletId, PieceId, PieceSpec,
    PieceType, PositionId, TransferMachine,
};
use pretty_assertions::assert_eq;

fn board(id: u64) -> PieceSpec {
    PieceSpec::new(id, 400.0, 300.0)
}

fn order_file() -> OrderBook {
    let mut book = OrderBook::new(42);
    book.pieces
        .push(PieceType::new(board(1).with_color("white"), 200).with_position(1));
    let large = PieceSpec::new(2, 800.0, 600.0).with_color("white");
    book.pieces.push(PieceType::new(large, 100).with_position(1));
    book.pallets.push(Pallet::new(1, 1, Destination::Edgebanding));
    book.pallets.push(Pallet::new(2, 2, Destination::Edgebanding));
    book.recompute_assigned();
    book
}

// ==================== Capacity properties ====================

#[test]
fn test_unit_weight_scenario() {
    let weight = unit_weight(&board(1));
    assert!((weight - 1.404).abs() < 1e-9);
}

#[test]
fn test_levels_and_height_scenario() {
    assert_eq!(UNITS_PER_LEVEL, 50);
    assert_eq!(levels_for(120), 3);
    assert_eq!(stacked_height(&[Assignment::new(board(1), 120)]), 54.0);
}

#[test]
fn test_height_changes_only_at_level_boundaries() {
    let height = |n| stacked_height(&[Assignment::new(board(1), n)]);
    for n in 1..=200u32 {
        let delta = height(n + 1) - height(n);
        if n % UNITS_PER_LEVEL == 0 {
            assert_eq!(delta, 18.0, "step expected after {} pieces", n);
        } else {
            assert_eq!(delta, 0.0, "no step expected after {} pieces", n);
        }
    }
}

#[test]
fn test_weight_non_decreasing_in_every_item() {
    let base = vec![
        Assignment::new(board(1), 3),
        Assignment::new(PieceSpec::new(2, 800.0, 600.0), 7),
        Assignment::new(board(3).with_unit_weight(0.0), 2),
    ];
    for idx in 0..base.len() {
        let mut items = base.clone();
        let mut last = stacked_weight(&items);
        for _ in 0..25 {
            items[idx].quantity += 1;
            let next = stacked_weight(&items);
            assert!(next >= last);
            last = next;
        }
    }
}

// ==================== Limits and advisors ====================

#[test]
fn test_can_add_pass_is_stable_under_merge() {
    let cases = [(10, 10), (100, 200), (300, 190), (0, 498)];
    for (existing_n, candidate_n) in cases {
        let existing = vec![Assignment::new(board(1), existing_n)];
        let candidate = vec![Assignment::new(board(2), candidate_n)];
        if can_add(&existing, &candidate, 700.0, 1440.0).allowed {
            let merged: Vec<_> = existing.iter().chain(&candidate).cloned().collect();
            assert!(can_add(&merged, &[], 700.0, 1440.0).allowed);
        }
    }
}

#[test]
fn test_max_addable_bounds() {
    let heavy = board(9).with_unit_weight(65.0);
    let piece = board(1).with_unit_weight(5.0);
    for existing_n in [0u32, 1, 5, 10, 11, 50] {
        let existing = vec![Assignment::new(heavy.clone(), existing_n)];
        for available in [0u32, 1, 3, 10, 100] {
            let n = max_addable(&piece, &existing, available, 700.0, 1440.0);
            assert!(n <= available);
        }
    }
}

#[test]
fn test_max_addable_weight_scenario() {
    let existing = vec![Assignment::new(board(9).with_unit_weight(65.0), 10)];
    let piece = board(1).with_unit_weight(5.0);
    assert_eq!(max_addable(&piece, &existing, 500, 700.0, 1440.0), 10);
    assert_eq!(max_addable(&piece, &existing, 500, 700.0, 1_000_000.0), 10);
}

#[test]
fn test_merge_scenario_different_destinations() {
    let a = Pallet::new(1, 1, Destination::Drilling);
    let b = Pallet::new(2, 2, Destination::Cutting);
    assert!(!can_merge(&a, &b).allowed);
}

// ==================== Transfer machine ====================

#[test]
fn test_gesture_exclusivity() {
    let piece = PieceType::new(board(1), 10);
    let mut machine = TransferMachine::new();
    machine.start(DragSource::Pool(&piece)).unwrap();
    machine.enter(PalletId(1));
    assert_eq!(machine.phase(), DragPhase::Hover);

    assert!(matches!(
        machine.start(DragSource::Pool(&piece)),
        Err(PalletError::GestureInProgress)
    ));
}

// ==================== End-to-end session ====================

#[tokio::test]
async fn test_operator_session() {
    let planner = MemoryPlanner::new(order_file());
    let mut cache = PalletCache::new(planner, 42, PalletConfig::default());
    cache.fetch(false).await.unwrap();
    assert_eq!(cache.stats().pallet_count, 2);

    // Drag the whole unassigned stock of piece 1 onto pallet 1.
    let mut machine = TransferMachine::new();
    let piece = cache.piece(PieceId(1)).unwrap().clone();
    machine.start(DragSource::Pool(&piece)).unwrap();
    machine.enter(PalletId(1));
    let transition = cache.drop_on(&mut machine, PalletId(1)).await.unwrap();
    assert!(matches!(transition.effect, DragEffect::Transfer(_)));
    assert_eq!(cache.pallet(PalletId(1)).unwrap().quantity_of(PieceId(1)), 200);
    assert_eq!(cache.piece(PieceId(1)).unwrap().available(), 0);

    // Piece 2 weighs 5.616 kg; only what the advisor suggests fits.
    let advice = cache.suggest(PalletId(1), PieceId(2)).unwrap();
    assert_eq!(advice.max, 74);
    cache
        .edit(
            PalletId(1),
            vec![LineItem::new(1, 200), LineItem::new(2, advice.max)],
            None,
            None,
        )
        .await
        .unwrap();
    assert!(!cache.pallet(PalletId(1)).unwrap().limit_report().is_over());

    // Moving pallet 1 onto its own source is refused without a call.
    let source = cache.pallet(PalletId(1)).unwrap();
    machine
        .start(DragSource::Pallet {
            pallet: &source,
            piece_id: PieceId(2),
        })
        .unwrap();
    let calls = cache.service().calls().len();
    let transition = cache.drop_on(&mut machine, PalletId(1)).await.unwrap();
    match transition.effect {
        DragEffect::Rejected { reason, .. } => assert!(reason.contains("Already on this pallet")),
        other => panic!("Expected rejection, got {:?}", other),
    }
    assert_eq!(cache.service().calls().len(), calls);

    // The rest goes to a new pallet, then the full one is closed.
    let rest = cache.piece(PieceId(2)).unwrap().available();
    cache
        .create(
            PositionId(1),
            Some(Destination::Edgebanding),
            vec![LineItem::new(2, rest)],
            "",
        )
        .await
        .unwrap();
    cache.close(PalletId(1), Some("full".into())).await.unwrap();

    let stats = cache.stats();
    assert_eq!(stats.pallet_count, 3);
    assert_eq!(stats.closed_count, 1);
    assert_eq!(stats.total_pieces, 300);
    assert!(cache.pieces().iter().all(|p| p.is_fully_assigned()));

    // Deleting the empty pallet is reflected at once.
    cache.delete(PalletId(2)).await.unwrap();
    assert_eq!(cache.stats().pallet_count, 2);
}

#[test]
fn test_order_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.json");
    let book = order_file();
    book.write_json_file(&path).unwrap();

    let loaded = OrderBook::from_json_file(&path).unwrap();
    assert_eq!(loaded, book);
}
