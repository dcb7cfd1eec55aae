//! In-process planning service over one order.

use std::cell::{Cell, RefCell};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    CreatedPallet, LineItem, NewPallet, PalletEdit, PalletStats, PlanRequest, PlanningError,
    PlanningService,
};
use crate::advisor::max_addable;
use crate::error::{PalletError, Result};
use crate::model::{Assignment, OrderId, Pallet, PalletId, PieceId, PieceType};
use crate::transfer::TransferRequest;

type PlanResult<T> = std::result::Result<T, PlanningError>;

/// One order's pieces and pallets, as stored by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub order_id: OrderId,
    #[serde(default)]
    pub pieces: Vec<PieceType>,
    #[serde(default)]
    pub pallets: Vec<Pallet>,
}

impl OrderBook {
    pub fn new(order_id: impl Into<OrderId>) -> Self {
        Self {
            order_id: order_id.into(),
            pieces: Vec::new(),
            pallets: Vec::new(),
        }
    }

    /// Load an order book from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PalletError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut book: OrderBook = serde_json::from_str(&content)?;
        book.recompute_assigned();
        book.check()?;
        Ok(book)
    }

    /// Reject pieces with non-positive dimensions or more assigned than planned.
    pub fn check(&self) -> Result<()> {
        for piece in &self.pieces {
            if let Some((field, value)) = piece.spec.invalid_dimension() {
                return Err(PalletError::InvalidGeometry {
                    piece_id: piece.id(),
                    field,
                    value,
                });
            }
            if !piece.is_consistent() {
                return Err(PalletError::Overcommitted {
                    piece_id: piece.id(),
                    requested: piece.assigned,
                    available: piece.planned,
                });
            }
        }
        Ok(())
    }

    /// Write the order book as pretty JSON.
    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Recompute every piece's `assigned` from pallet contents.
    pub fn recompute_assigned(&mut self) {
        for piece in &mut self.pieces {
            piece.assigned = self
                .pallets
                .iter()
                .map(|p| p.quantity_of(piece.spec.id))
                .sum();
        }
    }

    fn piece(&self, piece_id: PieceId) -> PlanResult<&PieceType> {
        self.pieces
            .iter()
            .find(|p| p.id() == piece_id)
            .ok_or_else(|| PlanningError::rejected(format!("Piece {} not found", piece_id)))
    }

    fn pallet_index(&self, pallet_id: PalletId) -> PlanResult<usize> {
        self.pallets
            .iter()
            .position(|p| p.id == pallet_id)
            .ok_or(PlanningError::NotFound)
    }

    fn next_pallet_id(&self) -> PalletId {
        PalletId(self.pallets.iter().map(|p| p.id.0).max().unwrap_or(0) + 1)
    }

    fn next_number(&self) -> u32 {
        self.pallets.iter().map(|p| p.number).max().unwrap_or(0) + 1
    }

    /// Load `items` onto `pallet`, checking stock. `returned` is the quantity
    /// of a piece type the pallet gave back before reloading.
    fn load(
        &self,
        pallet: &mut Pallet,
        items: &[LineItem],
        returned: impl Fn(PieceId) -> u32,
    ) -> PlanResult<()> {
        for item in items {
            if item.quantity == 0 {
                return Err(PlanningError::rejected(format!(
                    "Quantity for piece {} must be positive",
                    item.piece_id
                )));
            }
            let piece = self.piece(item.piece_id)?;
            let available = piece.available() + returned(item.piece_id);
            if item.quantity > available {
                return Err(PlanningError::rejected(format!(
                    "Piece {}: requested {}, only {} available",
                    item.piece_id, item.quantity, available
                )));
            }
            pallet
                .add(Assignment::new(piece.spec.clone(), item.quantity))
                .map_err(|e| PlanningError::rejected(e.to_string()))?;
        }
        Ok(())
    }

    pub fn create(&mut self, request: NewPallet) -> PlanResult<CreatedPallet> {
        self.recompute_assigned();
        let mut pallet = Pallet::new(self.next_pallet_id(), self.next_number(), request.destination)
            .with_limits(request.max_weight_kg, request.max_height_mm);
        pallet.notes = request.notes;
        self.load(&mut pallet, &request.items, |_| 0)?;

        let created = CreatedPallet {
            pallet_id: pallet.id,
            number: pallet.number,
            stats: PalletStats::from(&pallet),
        };
        info!(pallet = %pallet.id, number = pallet.number, "pallet created");
        self.pallets.push(pallet);
        self.recompute_assigned();
        Ok(created)
    }

    pub fn edit(&mut self, request: PalletEdit) -> PlanResult<PalletStats> {
        self.recompute_assigned();
        let idx = self.pallet_index(request.pallet_id)?;
        let current = &self.pallets[idx];
        if current.is_closed() {
            return Err(PlanningError::rejected(format!(
                "Pallet {} is closed",
                current.number
            )));
        }

        let mut edited = current.clone();
        edited.assignments.clear();
        if let Some(destination) = request.destination {
            edited.destination = destination;
        }
        if let Some(notes) = request.notes {
            edited.notes = notes;
        }
        self.load(&mut edited, &request.items, |id| current.quantity_of(id))?;

        let stats = PalletStats::from(&edited);
        self.pallets[idx] = edited;
        self.recompute_assigned();
        Ok(stats)
    }

    pub fn delete(&mut self, pallet_id: PalletId) -> PlanResult<()> {
        let idx = self.pallet_index(pallet_id)?;
        self.pallets.remove(idx);
        self.recompute_assigned();
        info!(pallet = %pallet_id, "pallet deleted");
        Ok(())
    }

    pub fn close(&mut self, pallet_id: PalletId, notes: Option<String>) -> PlanResult<()> {
        let idx = self.pallet_index(pallet_id)?;
        let pallet = &mut self.pallets[idx];
        if let Some(notes) = notes {
            pallet.notes = notes;
        }
        pallet.close();
        info!(pallet = %pallet_id, "pallet closed");
        Ok(())
    }

    pub fn transfer(&mut self, request: &TransferRequest) -> PlanResult<()> {
        self.recompute_assigned();
        if request.quantity == 0 {
            return Err(PlanningError::rejected("Quantity must be positive"));
        }
        if request.source == Some(request.target) {
            return Err(PlanningError::rejected("Already on this pallet"));
        }

        let target_idx = self.pallet_index(request.target)?;
        let mut target = self.pallets[target_idx].clone();

        let (spec, source) = match request.source {
            Some(source_id) => {
                let idx = self.pallet_index(source_id)?;
                let mut source = self.pallets[idx].clone();
                let spec = source
                    .assignment(request.piece_id)
                    .map(|a| a.piece.clone())
                    .ok_or_else(|| {
                        PlanningError::rejected(format!(
                            "Piece {} is not on pallet {}",
                            request.piece_id, source.number
                        ))
                    })?;
                if source.quantity_of(request.piece_id) < request.quantity {
                    return Err(PlanningError::rejected(format!(
                        "Pallet {} holds only {} of piece {}",
                        source.number,
                        source.quantity_of(request.piece_id),
                        request.piece_id
                    )));
                }
                source
                    .remove(request.piece_id, request.quantity)
                    .map_err(|e| PlanningError::rejected(e.to_string()))?;
                (spec, Some((idx, source)))
            }
            None => {
                let piece = self.piece(request.piece_id)?;
                if piece.available() < request.quantity {
                    return Err(PlanningError::rejected(format!(
                        "Piece {}: requested {}, only {} available",
                        request.piece_id,
                        request.quantity,
                        piece.available()
                    )));
                }
                (piece.spec.clone(), None)
            }
        };

        target
            .add(Assignment::new(spec, request.quantity))
            .map_err(|e| PlanningError::rejected(e.to_string()))?;

        self.pallets[target_idx] = target;
        if let Some((idx, source)) = source {
            self.pallets[idx] = source;
        }
        self.recompute_assigned();
        debug!(?request, "units transferred");
        Ok(())
    }

    /// Fill pallets piece type by piece type using the quantity advisor.
    pub fn plan(&mut self, request: PlanRequest) -> PlanResult<Vec<PalletId>> {
        self.recompute_assigned();
        let queue: Vec<(PieceType, u32)> = self
            .pieces
            .iter()
            .filter(|p| p.position == Some(request.position) && p.available() > 0)
            .map(|p| (p.clone(), p.available()))
            .collect();

        let fresh = |book: &OrderBook, planned: &[Pallet]| {
            let id = PalletId(book.next_pallet_id().0 + planned.len() as u64);
            let number = book.next_number() + planned.len() as u32;
            Pallet::new(id, number, request.destination)
                .with_limits(request.max_weight_kg, request.max_height_mm)
        };

        let mut planned: Vec<Pallet> = Vec::new();
        let mut current = fresh(&*self, &planned);

        for (piece, mut remaining) in queue {
            while remaining > 0 {
                let n = max_addable(
                    &piece.spec,
                    &current.assignments,
                    remaining,
                    current.max_weight_kg,
                    current.max_height_mm,
                );
                let added = n > 0 && current.add(Assignment::new(piece.spec.clone(), n)).is_ok();
                if added {
                    remaining -= n;
                    continue;
                }
                if current.is_empty() {
                    return Err(PlanningError::rejected(format!(
                        "Piece {} does not fit on an empty pallet",
                        piece.id()
                    )));
                }
                planned.push(current);
                current = fresh(&*self, &planned);
            }
        }
        if !current.is_empty() {
            planned.push(current);
        }

        let ids: Vec<PalletId> = planned.iter().map(|p| p.id).collect();
        info!(position = %request.position, pallets = ids.len(), "pallets planned");
        self.pallets.extend(planned);
        self.recompute_assigned();
        Ok(ids)
    }
}

/// Planning service backed by an in-memory [`OrderBook`].
///
/// Can be switched offline to simulate an unreachable service. Every call
/// is recorded by name.
#[derive(Debug)]
pub struct MemoryPlanner {
    book: RefCell<OrderBook>,
    offline: Cell<bool>,
    calls: RefCell<Vec<&'static str>>,
}

impl MemoryPlanner {
    pub fn new(book: OrderBook) -> Self {
        Self {
            book: RefCell::new(book),
            offline: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot of the stored order.
    pub fn snapshot(&self) -> OrderBook {
        let mut book = self.book.borrow().clone();
        book.recompute_assigned();
        book
    }

    /// Mutate the stored order directly, as another operator would.
    pub fn with_book<R>(&self, f: impl FnOnce(&mut OrderBook) -> R) -> R {
        f(&mut self.book.borrow_mut())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Names of the calls received so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn enter(&self, name: &'static str) -> PlanResult<()> {
        self.calls.borrow_mut().push(name);
        if self.offline.get() {
            return Err(PlanningError::Connection("service offline".into()));
        }
        Ok(())
    }

    fn check_order(&self, order: OrderId) -> PlanResult<()> {
        if self.book.borrow().order_id != order {
            return Err(PlanningError::NotFound);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl PlanningService for MemoryPlanner {
    async fn fetch_pallets(&self, order: OrderId) -> PlanResult<Vec<Pallet>> {
        self.enter("fetch_pallets")?;
        self.check_order(order)?;
        Ok(self.book.borrow().pallets.clone())
    }

    async fn fetch_pieces(&self, order: OrderId) -> PlanResult<Vec<PieceType>> {
        self.enter("fetch_pieces")?;
        self.check_order(order)?;
        Ok(self.snapshot().pieces)
    }

    async fn create_pallet(&self, request: NewPallet) -> PlanResult<CreatedPallet> {
        self.enter("create_pallet")?;
        self.book.borrow_mut().create(request)
    }

    async fn edit_pallet(&self, request: PalletEdit) -> PlanResult<PalletStats> {
        self.enter("edit_pallet")?;
        self.book.borrow_mut().edit(request)
    }

    async fn delete_pallet(&self, pallet_id: PalletId) -> PlanResult<()> {
        self.enter("delete_pallet")?;
        self.book.borrow_mut().delete(pallet_id)
    }

    async fn close_pallet(&self, pallet_id: PalletId, notes: Option<String>) -> PlanResult<()> {
        self.enter("close_pallet")?;
        self.book.borrow_mut().close(pallet_id, notes)
    }

    async fn transfer_units(&self, request: &TransferRequest) -> PlanResult<()> {
        self.enter("transfer_units")?;
        self.book.borrow_mut().transfer(request)
    }

    async fn plan_pallets(&self, request: PlanRequest) -> PlanResult<Vec<PalletId>> {
        self.enter("plan_pallets")?;
        self.book.borrow_mut().plan(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Destination, PieceSpec, PositionId};
    use pretty_assertions::assert_eq;

    fn book() -> OrderBook {
        let mut book = OrderBook::new(1);
        let white = PieceSpec::new(10, 400.0, 300.0).with_color("white");
        book.pieces.push(PieceType::new(white, 120).with_position(1));
        let heavy = PieceSpec::new(11, 600.0, 400.0).with_unit_weight(20.0);
        book.pieces.push(PieceType::new(heavy, 40).with_position(1));
        book
    }

    fn new_pallet(items: Vec<LineItem>) -> NewPallet {
        NewPallet {
            position: PositionId(1),
            destination: Destination::Drilling,
            items,
            max_weight_kg: 700.0,
            max_height_mm: 1440.0,
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_updates_assigned() {
        let mut book = book();
        let created = book.create(new_pallet(vec![LineItem::new(10, 30)])).unwrap();
        assert_eq!(created.number, 1);
        assert_eq!(created.stats.pieces, 30);
        assert_eq!(book.pieces[0].assigned, 30);
        assert_eq!(book.pieces[0].available(), 90);
    }

    #[test]
    fn test_create_rejects_overcommit() {
        let mut book = book();
        let err = book.create(new_pallet(vec![LineItem::new(10, 121)])).unwrap_err();
        assert!(matches!(err, PlanningError::Rejected { .. }));
        assert!(book.pallets.is_empty());
    }

    #[test]
    fn test_create_rejects_over_weight() {
        let mut book = book();
        let err = book.create(new_pallet(vec![LineItem::new(11, 36)])).unwrap_err();
        match err {
            PlanningError::Rejected { reason } => assert!(reason.contains("Weight")),
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_edit_replaces_contents() {
        let mut book = book();
        let created = book.create(new_pallet(vec![LineItem::new(10, 100)])).unwrap();
        // The pallet's own 100 pieces count as available again.
        let stats = book
            .edit(PalletEdit {
                pallet_id: created.pallet_id,
                items: vec![LineItem::new(10, 110), LineItem::new(11, 2)],
                destination: Some(Destination::Shipping),
                notes: None,
            })
            .unwrap();
        assert_eq!(stats.pieces, 112);
        assert_eq!(book.pallets[0].destination, Destination::Shipping);
        assert_eq!(book.pieces[0].assigned, 110);
    }

    #[test]
    fn test_closed_pallet_cannot_be_edited() {
        let mut book = book();
        let created = book.create(new_pallet(vec![LineItem::new(10, 5)])).unwrap();
        book.close(created.pallet_id, Some("done".into())).unwrap();
        let err = book
            .edit(PalletEdit {
                pallet_id: created.pallet_id,
                items: vec![],
                destination: None,
                notes: None,
            })
            .unwrap_err();
        assert!(matches!(err, PlanningError::Rejected { .. }));
        assert_eq!(book.pallets[0].notes, "done");
    }

    #[test]
    fn test_delete_returns_pieces_to_pool() {
        let mut book = book();
        let created = book.create(new_pallet(vec![LineItem::new(10, 50)])).unwrap();
        book.delete(created.pallet_id).unwrap();
        assert_eq!(book.pieces[0].available(), 120);
        assert_eq!(book.delete(created.pallet_id), Err(PlanningError::NotFound));
    }

    #[test]
    fn test_transfer_between_pallets() {
        let mut book = book();
        let a = book.create(new_pallet(vec![LineItem::new(10, 50)])).unwrap();
        let b = book.create(new_pallet(vec![])).unwrap();

        book.transfer(&TransferRequest {
            source: Some(a.pallet_id),
            target: b.pallet_id,
            piece_id: PieceId(10),
            quantity: 50,
        })
        .unwrap();

        assert!(book.pallets[0].is_empty());
        assert_eq!(book.pallets[1].quantity_of(PieceId(10)), 50);
        assert_eq!(book.pieces[0].assigned, 50);
    }

    #[test]
    fn test_transfer_from_pool_respects_available() {
        let mut book = book();
        let a = book.create(new_pallet(vec![])).unwrap();
        let err = book
            .transfer(&TransferRequest {
                source: None,
                target: a.pallet_id,
                piece_id: PieceId(10),
                quantity: 121,
            })
            .unwrap_err();
        assert!(matches!(err, PlanningError::Rejected { .. }));
    }

    #[test]
    fn test_failed_transfer_leaves_source_untouched() {
        let mut book = book();
        let a = book.create(new_pallet(vec![LineItem::new(11, 30)])).unwrap();
        let b = book.create(new_pallet(vec![LineItem::new(11, 10)])).unwrap();

        let err = book
            .transfer(&TransferRequest {
                source: Some(a.pallet_id),
                target: b.pallet_id,
                piece_id: PieceId(11),
                quantity: 30,
            })
            .unwrap_err();
        assert!(matches!(err, PlanningError::Rejected { .. }));
        assert_eq!(book.pallets[0].quantity_of(PieceId(11)), 30);
        assert_eq!(book.pallets[1].quantity_of(PieceId(11)), 10);
    }

    #[test]
    fn test_plan_assigns_everything_within_limits() {
        let mut book = book();
        let ids = book
            .plan(PlanRequest {
                position: PositionId(1),
                destination: Destination::Warehouse,
                max_weight_kg: 300.0,
                max_height_mm: 1440.0,
            })
            .unwrap();

        assert!(ids.len() >= 2);
        assert!(book.pieces.iter().all(|p| p.is_fully_assigned()));
        for pallet in &book.pallets {
            assert!(!pallet.limit_report().is_over());
        }
    }

    #[tokio::test]
    async fn test_offline_planner_reports_connection_error() {
        let planner = MemoryPlanner::new(book());
        planner.set_offline(true);
        let err = planner.fetch_pallets(OrderId(1)).await.unwrap_err();
        assert!(matches!(err, PlanningError::Connection(_)));
        assert_eq!(planner.calls(), vec!["fetch_pallets"]);
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let planner = MemoryPlanner::new(book());
        let err = planner.fetch_pallets(OrderId(99)).await.unwrap_err();
        assert_eq!(err, PlanningError::NotFound);
    }

    #[test]
    fn test_order_file_rejects_zero_thickness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        let json = r#"{
            "order_id": 1,
            "pieces": [
                {
                    "id": 3,
                    "length_mm": 400.0,
                    "width_mm": 300.0,
                    "thickness_mm": 0.0,
                    "planned": 10
                }
            ]
        }"#;
        std::fs::write(&path, json).unwrap();

        let err = OrderBook::from_json_file(&path).unwrap_err();
        assert!(matches!(
            err,
            PalletError::InvalidGeometry {
                field: "thickness_mm",
                ..
            }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_check_rejects_more_assigned_than_planned() {
        let mut book = book();
        book.create(new_pallet(vec![LineItem::new(11, 10)])).unwrap();
        book.pieces[1].planned = 5;
        book.recompute_assigned();

        let err = book.check().unwrap_err();
        assert!(matches!(
            err,
            PalletError::Overcommitted {
                requested: 10,
                available: 5,
                ..
            }
        ));
        book.pieces[1].planned = 40;
        assert!(book.check().is_ok());
    }
}
