//! Arbitration between the cell list and the tree document.
//!
//! At any instant exactly one side is authoritative:
//!
//! - An external change to the cells re-serializes the tree and installs it,
//!   then waits for the surface to report that installation back
//!   (`AwaitingSelfEcho`). Notifications in that state are swallowed.
//! - A user edit on the tree starts a debounce (`Debouncing`). When it fires
//!   the tree is parsed, diffed against the last-synced cells and the result
//!   written to the store. Writes from this path update the snapshot too, so
//!   they never bounce back as a re-serialization.
//!
//! Time is passed in explicitly; the coordinator never sleeps or spawns.

use std::time::{Duration, Instant};

use crate::document::TreeDocument;
use crate::editing::diff::{CellDiff, diff_cells, merge_structural, reconcile_markdown_ids, same_structure};
use crate::editing::surface::EditorSurface;
use crate::models::{Cell, CellId, CellStore};
use crate::parsing::{ParsedCells, parse_detailed, parse_markup_detailed, serialize};

/// What kind of edit the surface reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Only inline marks changed (bold, italic, code)
    Formatting,
    /// Text was inserted or removed, or blocks changed
    Text,
}

/// Debounce and echo delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub format_debounce: Duration,
    pub text_debounce: Duration,
    /// After this long an unobserved self-echo is presumed to have happened
    pub echo_timeout: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            format_debounce: Duration::from_millis(50),
            text_debounce: Duration::from_millis(300),
            echo_timeout: Duration::from_millis(100),
        }
    }
}

impl SyncTimings {
    pub fn debounce_for(&self, kind: EditKind) -> Duration {
        match kind {
            EditKind::Formatting => self.format_debounce,
            EditKind::Text => self.text_debounce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    /// The coordinator installed `pending` trees whose change notifications
    /// have not all been seen yet
    AwaitingSelfEcho { pending: u32, deadline: Instant },
    /// A user edit is waiting to be parsed
    Debouncing { kind: EditKind, deadline: Instant },
}

/// How a surface change notification was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDisposition {
    /// Treated as the echo of our own installation
    EchoSuppressed,
    /// A new debounce window was opened
    Scheduled { deadline: Instant },
    /// Coalesced into the open window, which was pushed back
    Rescheduled { deadline: Instant },
}

/// Result of driving the coordinator forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No deadline has passed
    Nothing,
    /// No echo arrived in time; back to idle
    EchoTimedOut,
    /// Parsed, and the cells already matched
    Unchanged,
    /// Parsed; these markdown cells got new text
    ContentUpdated(Vec<CellId>),
    /// Parsed; the cell list was rebuilt
    Restructured,
    /// Neither the tree nor the markup could be read; cells left as they were
    ParseFailed,
}

#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    state: SyncState,
    timings: SyncTimings,
    snapshot: Vec<Cell>,
    parses: usize,
}

impl SyncCoordinator {
    pub fn new(timings: SyncTimings) -> Self {
        Self {
            state: SyncState::Idle,
            timings,
            snapshot: Vec::new(),
            parses: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn timings(&self) -> SyncTimings {
        self.timings
    }

    /// The cells as of the last settle point
    pub fn snapshot(&self) -> &[Cell] {
        &self.snapshot
    }

    /// Number of parse/diff cycles run so far
    pub fn parse_count(&self) -> usize {
        self.parses
    }

    /// When `tick` next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SyncState::Idle => None,
            SyncState::AwaitingSelfEcho { deadline, .. } | SyncState::Debouncing { deadline, .. } => {
                Some(deadline)
            }
        }
    }

    /// Serialize `cells` and install the tree unconditionally.
    pub fn install<S: EditorSurface>(&mut self, cells: &[Cell], surface: &mut S, now: Instant) {
        if let SyncState::Debouncing { .. } = self.state {
            log::debug!("Installing over a pending edit; the edit is discarded");
        }
        surface.install(serialize(cells));
        let pending = match self.state {
            SyncState::AwaitingSelfEcho { pending, .. } => pending + 1,
            _ => 1,
        };
        self.state = SyncState::AwaitingSelfEcho {
            pending,
            deadline: now + self.timings.echo_timeout,
        };
        self.snapshot = cells.to_vec();
        log::debug!("Installed tree for {} cells, awaiting {pending} echo(es)", cells.len());
    }

    /// The cell list changed from outside the coordinator.
    ///
    /// Returns whether a new tree was installed. Callers should `flush` first
    /// so a pending user edit is not overwritten.
    pub fn on_external_change<S: EditorSurface>(
        &mut self,
        cells: &[Cell],
        surface: &mut S,
        now: Instant,
    ) -> bool {
        if same_structure(&self.snapshot, cells) && self.snapshot == cells {
            log::trace!("External change matches snapshot; nothing to install");
            return false;
        }
        self.install(cells, surface, now);
        true
    }

    /// The surface reported a change to its tree.
    pub fn on_surface_change(&mut self, kind: EditKind, now: Instant) -> EditDisposition {
        match self.state {
            SyncState::AwaitingSelfEcho { pending, deadline } => {
                self.state = if pending <= 1 {
                    SyncState::Idle
                } else {
                    SyncState::AwaitingSelfEcho {
                        pending: pending - 1,
                        deadline,
                    }
                };
                log::trace!("Swallowed self-echo, state now {:?}", self.state);
                EditDisposition::EchoSuppressed
            }
            SyncState::Idle => {
                let deadline = now + self.timings.debounce_for(kind);
                self.state = SyncState::Debouncing { kind, deadline };
                log::debug!("Debouncing {kind:?} edit");
                EditDisposition::Scheduled { deadline }
            }
            SyncState::Debouncing { kind: current, .. } => {
                let kind = if self.timings.debounce_for(kind) >= self.timings.debounce_for(current) {
                    kind
                } else {
                    current
                };
                let deadline = now + self.timings.debounce_for(kind);
                self.state = SyncState::Debouncing { kind, deadline };
                EditDisposition::Rescheduled { deadline }
            }
        }
    }

    /// Fire whatever deadline has passed.
    pub fn tick<S: EditorSurface>(
        &mut self,
        now: Instant,
        store: &mut CellStore,
        surface: &mut S,
    ) -> TickOutcome {
        match self.state {
            SyncState::AwaitingSelfEcho { pending, deadline } if now >= deadline => {
                log::debug!("No echo seen for {pending} install(s); presuming it happened");
                self.state = SyncState::Idle;
                TickOutcome::EchoTimedOut
            }
            SyncState::Debouncing { deadline, .. } if now >= deadline => {
                self.run_parse(now, store, surface)
            }
            _ => TickOutcome::Nothing,
        }
    }

    /// Run a pending debounced parse right now.
    pub fn flush<S: EditorSurface>(
        &mut self,
        now: Instant,
        store: &mut CellStore,
        surface: &mut S,
    ) -> TickOutcome {
        match self.state {
            SyncState::Debouncing { .. } => self.run_parse(now, store, surface),
            _ => TickOutcome::Nothing,
        }
    }

    fn run_parse<S: EditorSurface>(
        &mut self,
        now: Instant,
        store: &mut CellStore,
        surface: &mut S,
    ) -> TickOutcome {
        self.parses += 1;
        self.state = SyncState::Idle;

        let Some(ParsedCells {
            mut cells,
            conversions,
            ..
        }) = read_surface(surface)
        else {
            return TickOutcome::ParseFailed;
        };

        reconcile_markdown_ids(&self.snapshot, &mut cells);
        let outcome = match diff_cells(&self.snapshot, &cells) {
            CellDiff::Unchanged => TickOutcome::Unchanged,
            CellDiff::ContentOnly(updates) => {
                let ids = updates
                    .into_iter()
                    .filter(|update| store.apply_content_from_sync(&update.id, &update.content))
                    .map(|update| update.id)
                    .collect();
                TickOutcome::ContentUpdated(ids)
            }
            CellDiff::Structural => {
                store.replace_from_sync(merge_structural(&self.snapshot, cells));
                TickOutcome::Restructured
            }
        };
        self.snapshot = store.get_cells().to_vec();
        log::debug!("Parse #{} settled: {outcome:?}", self.parses);

        if conversions > 0 {
            log::debug!("{conversions} block(s) converted while parsing; reinstalling tree");
            self.install(store.get_cells(), surface, now);
        }
        outcome
    }
}

/// Tree JSON first, rendered markup second.
fn read_surface<S: EditorSurface>(surface: &S) -> Option<ParsedCells> {
    match surface.to_json().and_then(TreeDocument::from_json) {
        Ok(doc) => return Some(parse_detailed(&doc)),
        Err(err) => log::warn!("Tree export failed ({err}); falling back to markup"),
    }
    match surface.to_markup() {
        Ok(markup) => Some(parse_markup_detailed(&markup)),
        Err(err) => {
            log::warn!("Markup export failed ({err}); keeping last-known cells");
            None
        }
    }
}
