//! Rectangular block operations.
//!
//! A block operation moves through a small state machine: the user frames
//! an area (`DefiningArea`), the framed items are collected
//! (`SelectingItems`), then one command executes and the operation returns
//! to `Idle`. Executing returns the [`PickedItemsList`] the undo stack
//! stores.
//!
//! Deprecated zone-fill segments follow the geometry of a block move,
//! copy, or delete so stale fills do not detach from their boards, but
//! they are regenerable data and never appear in the undo records.

use boardkit_board::board::Board;
use boardkit_board::item::{BoardItem, ItemKind};
use boardkit_board::track::{Track, TrackKind};
use boardkit_core::geometry::{BoundingBox, Point};
use tracing::{debug, warn};

use crate::undo::PickedItemsList;

/// The command a block executes once its items are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCommand {
    Move,
    Drag,
    Copy,
    Delete,
    Rotate,
    Flip,
    /// Frame-only command: the area is used to drive the view, no board
    /// mutation happens.
    Zoom,
}

/// Progress of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStage {
    #[default]
    Idle,
    DefiningArea,
    SelectingItems,
    Executing,
}

/// Which item categories a block considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOptions {
    pub include_modules: bool,
    pub include_locked_modules: bool,
    pub include_tracks: bool,
    pub include_zones: bool,
    /// Graphic items: segments, texts, dimensions, targets.
    pub include_drawings: bool,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            include_modules: true,
            include_locked_modules: false,
            include_tracks: true,
            include_zones: true,
            include_drawings: true,
        }
    }
}

/// Indices of the framed items, per board collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSelection {
    pub tracks: Vec<usize>,
    pub zone_segments: Vec<usize>,
    pub modules: Vec<usize>,
    pub drawings: Vec<usize>,
    pub zones: Vec<usize>,
}

impl BlockSelection {
    /// Count of real items; zone segments are not counted.
    pub fn len(&self) -> usize {
        self.tracks.len() + self.modules.len() + self.drawings.len() + self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One in-flight block operation.
#[derive(Debug, Clone)]
pub struct BlockOperation {
    pub command: BlockCommand,
    pub options: BlockOptions,
    stage: BlockStage,
    anchor: Point,
    area: BoundingBox,
    selection: BlockSelection,
}

impl BlockOperation {
    pub fn new(command: BlockCommand) -> Self {
        Self {
            command,
            options: BlockOptions::default(),
            stage: BlockStage::Idle,
            anchor: Point::default(),
            area: BoundingBox::new(Point::default(), Point::default()),
            selection: BlockSelection::default(),
        }
    }

    pub fn stage(&self) -> BlockStage {
        self.stage
    }

    pub fn area(&self) -> BoundingBox {
        self.area
    }

    pub fn selection(&self) -> &BlockSelection {
        &self.selection
    }

    /// Starts framing at `corner`.
    pub fn begin(&mut self, corner: Point) {
        self.stage = BlockStage::DefiningArea;
        self.anchor = corner;
        self.area = BoundingBox::new(corner, corner);
        self.selection = BlockSelection::default();
    }

    /// Extends the frame to the moving corner.
    pub fn drag_to(&mut self, corner: Point) {
        if self.stage != BlockStage::DefiningArea {
            return;
        }
        self.area = BoundingBox::new(
            Point::new(self.anchor.x.min(corner.x), self.anchor.y.min(corner.y)),
            Point::new(self.anchor.x.max(corner.x), self.anchor.y.max(corner.y)),
        );
    }

    /// Closes the frame and collects the items inside it. Returns the
    /// number of items selected; zero sends the operation back to idle.
    pub fn finish_area(&mut self, board: &Board) -> usize {
        if self.stage != BlockStage::DefiningArea {
            warn!(stage = ?self.stage, "finish_area outside of framing");
            return 0;
        }
        self.selection = select_items(board, &self.area, &self.options);
        debug!(
            command = ?self.command,
            items = self.selection.len(),
            zone_segments = self.selection.zone_segments.len(),
            "block framed"
        );
        if self.selection.is_empty() && self.selection.zone_segments.is_empty() {
            self.stage = BlockStage::Idle;
            0
        } else {
            self.stage = BlockStage::SelectingItems;
            self.selection.len()
        }
    }

    pub fn cancel(&mut self) {
        *self = BlockOperation::new(self.command);
    }

    fn take_selection(&mut self) -> Option<BlockSelection> {
        if self.stage != BlockStage::SelectingItems {
            warn!(stage = ?self.stage, "block executed without a selection");
            return None;
        }
        self.stage = BlockStage::Executing;
        Some(std::mem::take(&mut self.selection))
    }

    fn finish(&mut self) {
        self.stage = BlockStage::Idle;
    }

    /// Translates the selection by `vector`.
    pub fn execute_move(&mut self, board: &mut Board, vector: Point) -> PickedItemsList {
        let Some(selection) = self.take_selection() else {
            return PickedItemsList::new();
        };
        let undo = block_move(board, &selection, vector);
        self.finish();
        undo
    }

    /// Duplicates the selection and translates the copies by `vector`.
    pub fn execute_copy(&mut self, board: &mut Board, vector: Point) -> PickedItemsList {
        let Some(selection) = self.take_selection() else {
            return PickedItemsList::new();
        };
        let undo = block_copy(board, &selection, vector);
        self.finish();
        undo
    }

    /// Deletes the selection.
    pub fn execute_delete(&mut self, board: &mut Board) -> PickedItemsList {
        let Some(selection) = self.take_selection() else {
            return PickedItemsList::new();
        };
        let undo = block_delete(board, selection);
        self.finish();
        undo
    }

    /// Rotates the selection 90 degrees counterclockwise about its
    /// centroid.
    pub fn execute_rotate(&mut self, board: &mut Board) -> PickedItemsList {
        let Some(selection) = self.take_selection() else {
            return PickedItemsList::new();
        };
        let undo = block_rotate(board, &selection, None);
        self.finish();
        undo
    }

    /// Mirrors the selection to the opposite board side about its
    /// centroid.
    pub fn execute_flip(&mut self, board: &mut Board) -> PickedItemsList {
        let Some(selection) = self.take_selection() else {
            return PickedItemsList::new();
        };
        let undo = block_flip(board, &selection);
        self.finish();
        undo
    }
}

/// Collects everything inside `area` that the options admit. Small items
/// match by intersection, modules and zones by full containment.
pub fn select_items(board: &Board, area: &BoundingBox, options: &BlockOptions) -> BlockSelection {
    let mut selection = BlockSelection::default();

    if options.include_tracks {
        for (index, track) in board.tracks().iter().enumerate() {
            if area.intersects(&track.bounding_box()) {
                selection.tracks.push(index);
            }
        }
        for (index, segment) in board.zone_segments().iter().enumerate() {
            if area.intersects(&segment.bounding_box()) {
                selection.zone_segments.push(index);
            }
        }
    }
    if options.include_modules {
        for (index, module) in board.modules.iter().enumerate() {
            if module.locked && !options.include_locked_modules {
                continue;
            }
            if area.contains_box(&module.bounding_box()) {
                selection.modules.push(index);
            }
        }
    }
    if options.include_drawings {
        for (index, item) in board.drawings.iter().enumerate() {
            if item.hit_test_rect(area) {
                selection.drawings.push(index);
            }
        }
    }
    if options.include_zones {
        for (index, zone) in board.zones.iter().enumerate() {
            if area.contains_box(&zone.bounding_box()) {
                selection.zones.push(index);
            }
        }
    }
    selection
}

/// Bounding box of the selected items, the frame the centroid comes from.
pub fn selection_box(board: &Board, selection: &BlockSelection) -> BoundingBox {
    let mut bbox: Option<BoundingBox> = None;
    let mut merge = |b: BoundingBox| match &mut bbox {
        Some(acc) => acc.merge(&b),
        None => bbox = Some(b),
    };
    for &i in &selection.tracks {
        merge(board.tracks()[i].bounding_box());
    }
    for &i in &selection.modules {
        merge(board.modules[i].bounding_box());
    }
    for &i in &selection.drawings {
        merge(board.drawings[i].bounding_box());
    }
    for &i in &selection.zones {
        merge(board.zones[i].bounding_box());
    }
    bbox.unwrap_or_else(|| BoundingBox::new(Point::default(), Point::default()))
}

fn centroid(board: &Board, selection: &BlockSelection) -> Point {
    selection_box(board, selection).center()
}

pub fn block_move(board: &mut Board, selection: &BlockSelection, vector: Point) -> PickedItemsList {
    let mut undo = PickedItemsList::new();
    for &i in &selection.tracks {
        undo.push_changed(BoardItem::Track(board.tracks()[i].clone()));
        board.track_mut(i).translate(vector);
    }
    for &i in &selection.zone_segments {
        board.zone_segment_mut(i).translate(vector);
    }
    for &i in &selection.modules {
        undo.push_changed(BoardItem::Module(board.modules[i].clone()));
        board.modules[i].translate(vector);
    }
    for &i in &selection.drawings {
        undo.push_changed(board.drawings[i].clone());
        board.drawings[i].translate(vector);
    }
    for &i in &selection.zones {
        undo.push_changed(BoardItem::Zone(board.zones[i].clone()));
        board.zones[i].translate(vector);
    }
    board.invalidate_connectivity();
    undo
}

pub fn block_copy(board: &mut Board, selection: &BlockSelection, vector: Point) -> PickedItemsList {
    let mut undo = PickedItemsList::new();

    // Clone everything first; insertion reshuffles indices.
    let mut new_tracks: Vec<Track> = selection
        .tracks
        .iter()
        .map(|&i| board.tracks()[i].clone())
        .collect();
    let mut new_zone_segments: Vec<Track> = selection
        .zone_segments
        .iter()
        .map(|&i| board.zone_segments()[i].clone())
        .collect();
    let mut new_items: Vec<BoardItem> = selection
        .modules
        .iter()
        .map(|&i| BoardItem::Module(board.modules[i].clone()))
        .chain(selection.drawings.iter().map(|&i| board.drawings[i].clone()))
        .chain(
            selection
                .zones
                .iter()
                .map(|&i| BoardItem::Zone(board.zones[i].clone())),
        )
        .collect();

    for track in &mut new_tracks {
        track.tstamp = boardkit_board::fresh_tstamp();
        track.translate(vector);
        let kind = match track.kind {
            TrackKind::Segment => ItemKind::Track,
            TrackKind::Via { .. } => ItemKind::Via,
            TrackKind::ZoneSegment => ItemKind::ZoneSegment,
        };
        undo.push_new(kind, track.tstamp);
    }
    for segment in &mut new_zone_segments {
        segment.tstamp = boardkit_board::fresh_tstamp();
        segment.translate(vector);
    }
    for item in &mut new_items {
        item.set_tstamp(boardkit_board::fresh_tstamp());
        item.translate(vector);
        undo.push_new(item.kind(), item.tstamp());
    }

    for track in new_tracks {
        board.add_track(track);
    }
    for segment in new_zone_segments {
        board.add_zone_segment(segment);
    }
    for item in new_items {
        match item {
            BoardItem::Module(module) => board.add_module(module),
            BoardItem::Zone(zone) => board.add_zone(zone),
            other => board.add_drawing(other),
        }
    }
    undo
}

pub fn block_delete(board: &mut Board, selection: BlockSelection) -> PickedItemsList {
    let mut undo = PickedItemsList::new();

    let mut tracks = selection.tracks;
    tracks.sort_unstable_by(|a, b| b.cmp(a));
    for i in tracks {
        undo.push_deleted(BoardItem::Track(board.remove_track(i)));
    }
    let mut zone_segments = selection.zone_segments;
    zone_segments.sort_unstable_by(|a, b| b.cmp(a));
    for i in zone_segments {
        board.remove_zone_segment(i);
    }
    let mut modules = selection.modules;
    modules.sort_unstable_by(|a, b| b.cmp(a));
    for i in modules {
        undo.push_deleted(BoardItem::Module(board.modules.remove(i)));
    }
    let mut drawings = selection.drawings;
    drawings.sort_unstable_by(|a, b| b.cmp(a));
    for i in drawings {
        undo.push_deleted(board.drawings.remove(i));
    }
    let mut zones = selection.zones;
    zones.sort_unstable_by(|a, b| b.cmp(a));
    for i in zones {
        undo.push_deleted(BoardItem::Zone(board.zones.remove(i)));
    }
    board.invalidate_connectivity();
    undo
}

/// Rotates the selection by 90 degrees counterclockwise about `center`,
/// defaulting to the selection centroid.
pub fn block_rotate(
    board: &mut Board,
    selection: &BlockSelection,
    center: Option<Point>,
) -> PickedItemsList {
    let center = center.unwrap_or_else(|| centroid(board, selection));
    let angle = 900;
    let mut undo = PickedItemsList::new();
    for &i in &selection.tracks {
        undo.push_changed(BoardItem::Track(board.tracks()[i].clone()));
        board.track_mut(i).rotate(center, angle);
    }
    for &i in &selection.zone_segments {
        board.zone_segment_mut(i).rotate(center, angle);
    }
    for &i in &selection.modules {
        undo.push_changed(BoardItem::Module(board.modules[i].clone()));
        board.modules[i].rotate(center, angle);
    }
    for &i in &selection.drawings {
        undo.push_changed(board.drawings[i].clone());
        board.drawings[i].rotate(center, angle);
    }
    for &i in &selection.zones {
        undo.push_changed(BoardItem::Zone(board.zones[i].clone()));
        board.zones[i].rotate(center, angle);
    }
    board.invalidate_connectivity();
    undo
}

/// Mirrors the selection to the opposite board side about its centroid.
pub fn block_flip(board: &mut Board, selection: &BlockSelection) -> PickedItemsList {
    let center = centroid(board, selection);
    let mut undo = PickedItemsList::new();
    for &i in &selection.tracks {
        undo.push_changed(BoardItem::Track(board.tracks()[i].clone()));
        board.track_mut(i).flip(center);
    }
    for &i in &selection.zone_segments {
        board.zone_segment_mut(i).flip(center);
    }
    for &i in &selection.modules {
        undo.push_changed(BoardItem::Module(board.modules[i].clone()));
        board.modules[i].flip(center);
    }
    for &i in &selection.drawings {
        undo.push_changed(board.drawings[i].clone());
        board.drawings[i].flip(center);
    }
    for &i in &selection.zones {
        undo.push_changed(BoardItem::Zone(board.zones[i].clone()));
        board.zones[i].flip(center);
    }
    board.invalidate_connectivity();
    undo
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardkit_board::module::Module;
    use boardkit_core::layer::LAYER_FRONT;
    use boardkit_core::units::mm_to_iu;

    fn mm(v: f64) -> i32 {
        mm_to_iu(v)
    }

    fn framed(board: &Board, x1: f64, y1: f64, x2: f64, y2: f64) -> BlockSelection {
        let area = BoundingBox::new(
            Point::new(mm(x1), mm(y1)),
            Point::new(mm(x2), mm(y2)),
        );
        select_items(board, &area, &BlockOptions::default())
    }

    fn simple_board() -> Board {
        let mut board = Board::new();
        board.nets.add(1, "GND").unwrap();
        board.add_track(Track::new_segment(
            Point::new(mm(10.0), mm(10.0)),
            Point::new(mm(20.0), mm(10.0)),
            mm(0.25),
            LAYER_FRONT,
            1,
        ));
        let mut module = Module::new("R_0805");
        module.position = Point::new(mm(15.0), mm(15.0));
        board.add_module(module);
        board
    }

    #[test]
    fn selection_respects_category_options() {
        let board = simple_board();
        let area = BoundingBox::new(Point::new(0, 0), Point::new(mm(40.0), mm(40.0)));

        let all = select_items(&board, &area, &BlockOptions::default());
        assert_eq!(all.tracks.len(), 1);
        assert_eq!(all.modules.len(), 1);

        let no_tracks = select_items(
            &board,
            &area,
            &BlockOptions {
                include_tracks: false,
                ..BlockOptions::default()
            },
        );
        assert!(no_tracks.tracks.is_empty());
        assert_eq!(no_tracks.modules.len(), 1);
    }

    #[test]
    fn locked_modules_stay_out_unless_asked() {
        let mut board = simple_board();
        board.modules[0].locked = true;
        let selection = framed(&board, 0.0, 0.0, 40.0, 40.0);
        assert!(selection.modules.is_empty());

        let area = BoundingBox::new(Point::new(0, 0), Point::new(mm(40.0), mm(40.0)));
        let with_locked = select_items(
            &board,
            &area,
            &BlockOptions {
                include_locked_modules: true,
                ..BlockOptions::default()
            },
        );
        assert_eq!(with_locked.modules.len(), 1);
    }

    #[test]
    fn rotate_records_items_but_not_zone_segments() {
        let mut board = simple_board();
        board.add_track(Track::new_segment(
            Point::new(mm(10.0), mm(20.0)),
            Point::new(mm(20.0), mm(20.0)),
            mm(0.25),
            LAYER_FRONT,
            1,
        ));
        board.add_zone_segment(Track::new_segment(
            Point::new(mm(12.0), mm(12.0)),
            Point::new(mm(18.0), mm(12.0)),
            mm(0.2),
            LAYER_FRONT,
            1,
        ));
        let old_segment_start = board.zone_segments()[0].start;

        let mut op = BlockOperation::new(BlockCommand::Rotate);
        op.begin(Point::new(0, 0));
        op.drag_to(Point::new(mm(40.0), mm(40.0)));
        assert_eq!(op.stage(), BlockStage::DefiningArea);
        let count = op.finish_area(&board);
        assert_eq!(count, 3);
        assert_eq!(op.stage(), BlockStage::SelectingItems);

        let undo = op.execute_rotate(&mut board);
        assert_eq!(op.stage(), BlockStage::Idle);
        // Two tracks and the module; the zone segment is not recorded.
        assert_eq!(undo.len(), 3);
        assert_ne!(board.zone_segments()[0].start, old_segment_start);
    }

    #[test]
    fn copy_duplicates_with_fresh_identity() {
        let mut board = simple_board();
        let original_tstamp = board.tracks()[0].tstamp;
        let selection = framed(&board, 0.0, 0.0, 40.0, 40.0);

        let undo = block_copy(&mut board, &selection, Point::new(mm(30.0), 0));
        assert_eq!(undo.len(), 2);
        assert!(undo.iter().all(|r| r.kind == crate::undo::UndoKind::New));

        assert_eq!(board.track_count(), 2);
        assert_eq!(board.modules.len(), 2);
        let copy = board
            .tracks()
            .iter()
            .find(|t| t.tstamp != original_tstamp)
            .expect("a copied track exists");
        assert_eq!(copy.start, Point::new(mm(40.0), mm(10.0)));
    }

    #[test]
    fn delete_returns_the_removed_items() {
        let mut board = simple_board();
        let selection = framed(&board, 0.0, 0.0, 40.0, 40.0);

        let undo = block_delete(&mut board, selection);
        assert_eq!(undo.len(), 2);
        assert!(undo
            .iter()
            .all(|r| r.kind == crate::undo::UndoKind::Deleted && r.snapshot.is_some()));
        assert_eq!(board.track_count(), 0);
        assert!(board.modules.is_empty());
    }

    #[test]
    fn move_translates_and_snapshots_prior_state() {
        let mut board = simple_board();
        let selection = framed(&board, 0.0, 0.0, 40.0, 40.0);
        let undo = block_move(&mut board, &selection, Point::new(mm(5.0), mm(5.0)));

        assert_eq!(undo.len(), 2);
        assert_eq!(
            board.tracks()[0].start,
            Point::new(mm(15.0), mm(15.0))
        );
        let snapshot = undo
            .iter()
            .find(|r| r.item_kind == ItemKind::Track)
            .and_then(|r| r.snapshot.as_ref())
            .expect("track snapshot");
        assert_eq!(snapshot.position(), Point::new(mm(10.0), mm(10.0)));
    }

    #[test]
    fn rotate_turns_every_item_about_the_same_pivot() {
        use boardkit_board::zone::{Contour, Zone};
        use boardkit_core::geometry::rotate_point;

        let mut board = simple_board();
        let mut zone = Zone::new(LAYER_FRONT, 1);
        zone.outline = Contour(vec![
            Point::new(mm(5.0), mm(5.0)),
            Point::new(mm(25.0), mm(5.0)),
            Point::new(mm(25.0), mm(25.0)),
            Point::new(mm(5.0), mm(25.0)),
        ]);
        board.add_zone(zone);

        let track_start = board.tracks()[0].start;
        let module_pos = board.modules[0].position;
        let corner = board.zones[0].outline.0[0];

        let selection = framed(&board, 0.0, 0.0, 40.0, 40.0);
        let pivot = Point::new(mm(15.0), mm(15.0));
        block_rotate(&mut board, &selection, Some(pivot));

        assert_eq!(board.tracks()[0].start, rotate_point(track_start, pivot, 900));
        assert_eq!(board.modules[0].position, rotate_point(module_pos, pivot, 900));
        assert_eq!(board.zones[0].outline.0[0], rotate_point(corner, pivot, 900));
    }
}
