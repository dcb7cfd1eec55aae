//! Client-side pallet cache with optimistic updates and silent refresh.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CacheStats, RefreshSchedule};
use crate::advisor::{advise, QuantityAdvice};
use crate::config::PalletConfig;
use crate::error::{PalletError, Result};
use crate::model::{
    Assignment, Destination, OrderId, Pallet, PalletId, PalletStatus, PieceId, PieceType,
    PositionId,
};
use crate::planning::{
    CreatedPallet, LineItem, NewPallet, PalletEdit, PalletStats, PlanRequest, PlanningError,
    PlanningService,
};
use crate::transfer::{DragEffect, TransferMachine, TransferRequest, Transition};
use crate::validation::{can_add, validate_against_stock, validate_submission};

/// Reconciliation status of one pallet in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Matches the last fetched state.
    #[default]
    Confirmed,
    /// Deleted locally, waiting for the next fetch.
    PendingDelete,
    /// Closed locally, waiting for the next fetch.
    PendingClose,
}

/// A visible pallet with its reconciliation status.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub pallet: Pallet,
    pub sync: SyncState,
}

/// Authoritative client-side snapshot of one order's pallets.
///
/// Fetched pallets are kept as confirmed state; optimistic delete and close
/// live in a pending overlay on top of it, resolved by the next fetch.
pub struct PalletCache<S> {
    service: S,
    order_id: OrderId,
    config: PalletConfig,
    confirmed: Vec<Pallet>,
    pieces: Vec<PieceType>,
    pending: BTreeMap<PalletId, SyncState>,
    loaded: bool,
    loading: watch::Sender<bool>,
    revision: u64,
}

impl<S: PlanningService> PalletCache<S> {
    pub fn new(service: S, order_id: impl Into<OrderId>, config: PalletConfig) -> Self {
        Self {
            service,
            order_id: order_id.into(),
            config,
            confirmed: Vec::new(),
            pieces: Vec::new(),
            pending: BTreeMap::new(),
            loaded: false,
            loading: watch::channel(false).0,
            revision: 0,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Whether the first, blocking load is in flight.
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Receiver for the loading flag, readable while a fetch is pending.
    pub fn loading_state(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Whether a fetch has completed at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Counter bumped whenever the visible content changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Visible pallets with their sync state.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.confirmed
            .iter()
            .filter_map(|pallet| {
                let sync = self.sync_state(pallet.id);
                match sync {
                    SyncState::PendingDelete => None,
                    SyncState::PendingClose => {
                        let mut pallet = pallet.clone();
                        pallet.status = PalletStatus::Closed;
                        Some(CacheEntry { pallet, sync })
                    }
                    SyncState::Confirmed => Some(CacheEntry {
                        pallet: pallet.clone(),
                        sync,
                    }),
                }
            })
            .collect()
    }

    /// Visible pallets.
    pub fn pallets(&self) -> Vec<Pallet> {
        self.entries().into_iter().map(|e| e.pallet).collect()
    }

    /// One visible pallet.
    pub fn pallet(&self, pallet_id: PalletId) -> Option<Pallet> {
        self.entries()
            .into_iter()
            .find(|e| e.pallet.id == pallet_id)
            .map(|e| e.pallet)
    }

    pub fn sync_state(&self, pallet_id: PalletId) -> SyncState {
        self.pending.get(&pallet_id).copied().unwrap_or_default()
    }

    /// Piece types of the order as last fetched.
    pub fn pieces(&self) -> &[PieceType] {
        &self.pieces
    }

    pub fn piece(&self, piece_id: PieceId) -> Option<&PieceType> {
        self.pieces.iter().find(|p| p.id() == piece_id)
    }

    /// Aggregates over the visible pallets, recomputed on every call.
    pub fn stats(&self) -> CacheStats {
        CacheStats::from_pallets(&self.pallets())
    }

    /// Suggested maximum quantity of a piece type for a pallet.
    pub fn suggest(&self, pallet_id: PalletId, piece_id: PieceId) -> Result<QuantityAdvice> {
        let pallet = self
            .pallet(pallet_id)
            .ok_or(PalletError::PalletNotFound { pallet_id })?;
        let piece = self
            .piece(piece_id)
            .ok_or(PalletError::PieceNotFound { piece_id })?;
        let available = if pallet.is_closed() {
            0
        } else {
            piece.available()
        };
        Ok(advise(
            &piece.spec,
            &pallet.assignments,
            available,
            pallet.max_weight_kg,
            pallet.max_height_mm,
        ))
    }

    /// Fetch pallets and pieces from the planning service.
    ///
    /// Only the first non-silent load raises the loading flag. The cache is
    /// replaced only when the fetched state differs from what is held.
    /// Returns whether the visible content changed.
    pub async fn fetch(&mut self, silent: bool) -> Result<bool> {
        if !self.loaded && !silent {
            self.loading.send_replace(true);
        }
        debug!(order = %self.order_id, silent, "fetching pallets");

        let fetched = self.fetch_remote().await;
        self.loading.send_replace(false);

        let (pallets, pieces) = match fetched {
            Ok(state) => state,
            Err(PlanningError::NotFound) if !self.loaded => {
                info!(order = %self.order_id, "no pallets yet");
                (Vec::new(), Vec::new())
            }
            Err(err) => {
                warn!(order = %self.order_id, error = %err, "pallet fetch failed");
                return Err(err.into());
            }
        };
        self.loaded = true;

        let resolved = self.resolve_pending(&pallets);
        let changed = resolved || pallets != self.confirmed || pieces != self.pieces;
        if changed {
            self.confirmed = pallets;
            self.pieces = pieces;
            self.revision += 1;
            debug!(revision = self.revision, "pallet cache updated");
        }
        Ok(changed)
    }

    async fn fetch_remote(
        &self,
    ) -> std::result::Result<(Vec<Pallet>, Vec<PieceType>), PlanningError> {
        let pallets = self.service.fetch_pallets(self.order_id).await?;
        let pieces = self.service.fetch_pieces(self.order_id).await?;
        Ok((pallets, pieces))
    }

    /// Drop every pending tag; the fetched state is authoritative.
    fn resolve_pending(&mut self, fetched: &[Pallet]) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for (pallet_id, state) in std::mem::take(&mut self.pending) {
            let server = fetched.iter().find(|p| p.id == pallet_id);
            let confirmed = match state {
                SyncState::PendingDelete => server.is_none(),
                SyncState::PendingClose => server.is_some_and(Pallet::is_closed),
                SyncState::Confirmed => true,
            };
            if !confirmed {
                warn!(pallet = %pallet_id, ?state, "server state contradicts local change");
            }
        }
        true
    }

    /// Silent fetch after a successful mutation. A failure here is only logged:
    /// the mutation itself went through.
    async fn reconcile(&mut self) {
        if let Err(err) = self.fetch(true).await {
            warn!(error = %err, "reconciling fetch failed");
        }
    }

    fn resolve_items(&self, items: &[LineItem]) -> Result<Vec<Assignment>> {
        items
            .iter()
            .map(|item| {
                let piece = self.piece(item.piece_id).ok_or(PalletError::PieceNotFound {
                    piece_id: item.piece_id,
                })?;
                Ok(Assignment::new(piece.spec.clone(), item.quantity))
            })
            .collect()
    }

    /// Create a pallet. Validated and limit-checked locally first.
    pub async fn create(
        &mut self,
        position: PositionId,
        destination: Option<Destination>,
        items: Vec<LineItem>,
        notes: impl Into<String>,
    ) -> Result<CreatedPallet> {
        let assignments = self.resolve_items(&items)?;
        validate_submission(destination, &assignments)?;
        validate_against_stock(&assignments, &self.pieces, |_| 0)?;
        let verdict = can_add(
            &[],
            &assignments,
            self.config.max_weight_kg,
            self.config.max_height_mm,
        );
        if let Some(reason) = verdict.reason {
            return Err(PalletError::LimitExceeded { reason });
        }
        let destination = destination.ok_or(PalletError::MissingDestination)?;

        let request = NewPallet {
            position,
            destination,
            items,
            max_weight_kg: self.config.max_weight_kg,
            max_height_mm: self.config.max_height_mm,
            notes: notes.into(),
        };
        let created = self.service.create_pallet(request).await.map_err(|err| {
            warn!(error = %err, "create pallet failed");
            PalletError::from(err)
        })?;
        info!(pallet = %created.pallet_id, number = created.number, "pallet created");
        self.reconcile().await;
        Ok(created)
    }

    /// Replace a pallet's contents, optionally changing destination and notes.
    pub async fn edit(
        &mut self,
        pallet_id: PalletId,
        items: Vec<LineItem>,
        destination: Option<Destination>,
        notes: Option<String>,
    ) -> Result<PalletStats> {
        let pallet = self
            .pallet(pallet_id)
            .ok_or(PalletError::PalletNotFound { pallet_id })?;
        pallet.ensure_open()?;

        let assignments = self.resolve_items(&items)?;
        validate_submission(Some(destination.unwrap_or(pallet.destination)), &assignments)?;
        validate_against_stock(&assignments, &self.pieces, |a| {
            pallet.quantity_of(a.piece_id())
        })?;
        let verdict = can_add(
            &[],
            &assignments,
            pallet.max_weight_kg,
            pallet.max_height_mm,
        );
        if let Some(reason) = verdict.reason {
            return Err(PalletError::LimitExceeded { reason });
        }

        let request = PalletEdit {
            pallet_id,
            items,
            destination,
            notes,
        };
        let stats = self.service.edit_pallet(request).await.map_err(|err| {
            warn!(pallet = %pallet_id, error = %err, "edit pallet failed");
            PalletError::from(err)
        })?;
        self.reconcile().await;
        Ok(stats)
    }

    /// Delete a pallet. Hidden immediately, then confirmed by a silent fetch.
    ///
    /// A failed request is reported but the pallet stays hidden until the
    /// next fetch brings back the server's state.
    pub async fn delete(&mut self, pallet_id: PalletId) -> Result<()> {
        if self.pallet(pallet_id).is_none() {
            return Err(PalletError::PalletNotFound { pallet_id });
        }
        self.mark(pallet_id, SyncState::PendingDelete);

        self.service.delete_pallet(pallet_id).await.map_err(|err| {
            warn!(pallet = %pallet_id, error = %err, "delete pallet failed");
            PalletError::from(err)
        })?;
        self.reconcile().await;
        Ok(())
    }

    /// Close a pallet. Shown closed immediately, then confirmed by a silent fetch.
    pub async fn close(&mut self, pallet_id: PalletId, notes: Option<String>) -> Result<()> {
        let pallet = self
            .pallet(pallet_id)
            .ok_or(PalletError::PalletNotFound { pallet_id })?;
        pallet.ensure_open()?;
        self.mark(pallet_id, SyncState::PendingClose);

        self.service
            .close_pallet(pallet_id, notes)
            .await
            .map_err(|err| {
                warn!(pallet = %pallet_id, error = %err, "close pallet failed");
                PalletError::from(err)
            })?;
        self.reconcile().await;
        Ok(())
    }

    fn mark(&mut self, pallet_id: PalletId, state: SyncState) {
        self.pending.insert(pallet_id, state);
        self.revision += 1;
        debug!(pallet = %pallet_id, ?state, "optimistic update");
    }

    /// Move units onto a pallet, from the pool or from another pallet.
    ///
    /// Checked against the cached pallets before the request goes out.
    pub async fn transfer(&mut self, request: TransferRequest) -> Result<()> {
        self.check_transfer(&request)?;
        self.service
            .transfer_units(&request)
            .await
            .map_err(|err| {
                warn!(?request, error = %err, "transfer failed");
                PalletError::from(err)
            })?;
        info!(
            piece = %request.piece_id,
            quantity = request.quantity,
            target = %request.target,
            "units transferred"
        );
        self.reconcile().await;
        Ok(())
    }

    fn check_transfer(&self, request: &TransferRequest) -> Result<()> {
        let piece_id = request.piece_id;
        if request.quantity == 0 {
            return Err(PalletError::InvalidQuantity { piece_id });
        }
        if request.source == Some(request.target) {
            return Err(PalletError::SamePallet {
                pallet_id: request.target,
            });
        }
        let target = self.pallet(request.target).ok_or(PalletError::PalletNotFound {
            pallet_id: request.target,
        })?;
        target.ensure_open()?;

        let (spec, available) = match request.source {
            Some(pallet_id) => {
                let source = self
                    .pallet(pallet_id)
                    .ok_or(PalletError::PalletNotFound { pallet_id })?;
                let assignment = source
                    .assignment(piece_id)
                    .ok_or(PalletError::NothingToMove { piece_id })?;
                (assignment.piece.clone(), assignment.quantity)
            }
            None => {
                let piece = self
                    .piece(piece_id)
                    .ok_or(PalletError::PieceNotFound { piece_id })?;
                (piece.spec.clone(), piece.available())
            }
        };
        if request.quantity > available {
            return Err(PalletError::Overcommitted {
                piece_id,
                requested: request.quantity,
                available,
            });
        }

        let candidate = Assignment::new(spec, request.quantity);
        let verdict = can_add(
            &target.assignments,
            std::slice::from_ref(&candidate),
            target.max_weight_kg,
            target.max_height_mm,
        );
        match verdict.reason {
            Some(reason) => Err(PalletError::LimitExceeded { reason }),
            None => Ok(()),
        }
    }

    /// Drop the machine's current item on a cached pallet.
    ///
    /// The machine returns to idle before the transfer is sent. A rejected
    /// drop makes no service call.
    pub async fn drop_on(
        &mut self,
        machine: &mut TransferMachine,
        target: PalletId,
    ) -> Result<Transition> {
        let Some(pallet) = self.pallet(target) else {
            machine.end();
            return Err(PalletError::PalletNotFound { pallet_id: target });
        };
        let transition = machine.drop_on(&pallet);
        if let DragEffect::Transfer(request) = &transition.effect {
            self.transfer(request.clone()).await?;
        }
        Ok(transition)
    }

    /// Ask the planning service to create pallets for a position's free pieces.
    pub async fn plan(
        &mut self,
        position: PositionId,
        destination: Destination,
    ) -> Result<Vec<PalletId>> {
        let request = PlanRequest {
            position,
            destination,
            max_weight_kg: self.config.max_weight_kg,
            max_height_mm: self.config.max_height_mm,
        };
        let ids = self.service.plan_pallets(request).await.map_err(|err| {
            warn!(position = %position, error = %err, "planning failed");
            PalletError::from(err)
        })?;
        self.reconcile().await;
        Ok(ids)
    }

    /// Wait for the next scheduled tick, then refresh silently.
    pub async fn refresh_on(&mut self, schedule: &mut RefreshSchedule) -> Result<bool> {
        schedule.tick().await;
        self.fetch(true).await
    }

    /// Schedule matching the configured refresh interval.
    pub fn refresh_schedule(&self) -> RefreshSchedule {
        RefreshSchedule::new(self.config.refresh_interval())
    }
}
