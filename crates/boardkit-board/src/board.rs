//! The board container: ordered item collections, net tables, layer table,
//! and design settings.

use boardkit_core::geometry::Point;
use boardkit_core::layer::{standard_layer_name, LayerMask, LayerNum, EDGE_CUTS};
use tracing::debug;

use crate::drawing::{Dimension, DrawSegment, Target, TextItem};
use crate::item::{BoardItem, ItemKind};
use crate::module::Module;
use crate::netinfo::{NetClasses, NetInfoList};
use crate::pad::Pad;
use crate::settings::{DesignSettings, LayerInfo, LayerType, PageSettings, TitleBlock, ZoneSettings};
use crate::track::{Track, TrackKind};
use crate::zone::Zone;

/// The root aggregate owning every item of a design.
///
/// Tracks and vias live in one sequence kept sorted by net code; several
/// connectivity algorithms seek the per-net sub-range by binary search, so
/// every structural mutation goes through the methods below and preserves
/// the order. The board has no internal synchronization; callers serialize
/// access.
#[derive(Debug, Clone)]
pub struct Board {
    /// File format version the board was read from.
    pub version: i32,
    /// Host program tag from the file header.
    pub host: (String, String),
    tracks: Vec<Track>,
    /// Deprecated zone-fill segments, kept apart from real tracks like the
    /// legacy boards that still carry them.
    zone_segments: Vec<Track>,
    pub modules: Vec<Module>,
    /// Free-standing graphics: drawings, texts, dimensions, targets.
    pub drawings: Vec<BoardItem>,
    pub zones: Vec<Zone>,
    pub nets: NetInfoList,
    pub net_classes: NetClasses,
    pub design_settings: DesignSettings,
    pub zone_settings: ZoneSettings,
    pub page: PageSettings,
    pub title_block: TitleBlock,
    pub layers: Vec<LayerInfo>,
    highlighted_net: Option<i32>,
    ratsnest_valid: bool,
}

impl Board {
    pub fn new() -> Self {
        let layers = (0..=EDGE_CUTS)
            .map(|number| LayerInfo {
                number,
                name: standard_layer_name(number),
                layer_type: if boardkit_core::layer::is_copper_layer(number) {
                    LayerType::Signal
                } else {
                    LayerType::User
                },
                visible: true,
            })
            .collect();
        Self {
            version: 3,
            host: ("boardkit".to_string(), env!("CARGO_PKG_VERSION").to_string()),
            tracks: Vec::new(),
            zone_segments: Vec::new(),
            modules: Vec::new(),
            drawings: Vec::new(),
            zones: Vec::new(),
            nets: NetInfoList::new(),
            net_classes: NetClasses::new(),
            design_settings: DesignSettings::default(),
            zone_settings: ZoneSettings::default(),
            page: PageSettings::default(),
            title_block: TitleBlock::default(),
            layers,
            highlighted_net: None,
            ratsnest_valid: false,
        }
    }

    /// Removes every item and resets the tables to a fresh board.
    pub fn clear(&mut self) {
        *self = Board::new();
    }

    // --- tracks -----------------------------------------------------------

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Mutable access to one track. Callers must not change the net code
    /// through this reference; that goes through [`Board::set_track_net`]
    /// so the sort order survives.
    pub fn track_mut(&mut self, index: usize) -> &mut Track {
        self.ratsnest_valid = false;
        &mut self.tracks[index]
    }

    /// Inserts a track at its best insertion point: the end of its net's
    /// sub-range, found by binary search. Returns the insertion index.
    pub fn add_track(&mut self, track: Track) -> usize {
        let index = self.tracks.partition_point(|t| t.net <= track.net);
        self.tracks.insert(index, track);
        self.ratsnest_valid = false;
        index
    }

    pub fn remove_track(&mut self, index: usize) -> Track {
        self.ratsnest_valid = false;
        self.tracks.remove(index)
    }

    /// Moves a track to another net, re-inserting it at the right position.
    /// Returns the new index.
    pub fn set_track_net(&mut self, index: usize, net: i32) -> usize {
        let mut track = self.tracks.remove(index);
        track.net = net;
        self.add_track(track)
    }

    /// Index range of the net's tracks (`GetStartNetCode`/`GetEndNetCode`
    /// seek, one binary search each).
    pub fn tracks_of_net(&self, net: i32) -> std::ops::Range<usize> {
        let start = self.tracks.partition_point(|t| t.net < net);
        let end = self.tracks.partition_point(|t| t.net <= net);
        start..end
    }

    /// First track of the net in board order, if the net has copper.
    pub fn first_track_of_net(&self, net: i32) -> Option<&Track> {
        let range = self.tracks_of_net(net);
        self.tracks.get(range.start).filter(|t| t.net == net)
    }

    /// Last track of the net in board order.
    pub fn last_track_of_net(&self, net: i32) -> Option<&Track> {
        let range = self.tracks_of_net(net);
        if range.is_empty() {
            None
        } else {
            self.tracks.get(range.end - 1)
        }
    }

    pub fn track_index_by_tstamp(&self, tstamp: u64) -> Option<usize> {
        self.tracks.iter().position(|t| t.tstamp == tstamp)
    }

    /// First via covering `p` on a layer of `mask`, excluding indices in
    /// `skip`.
    pub fn via_at(&self, p: Point, mask: LayerMask, skip: &dyn Fn(usize) -> bool) -> Option<usize> {
        self.tracks.iter().enumerate().position(|(i, t)| {
            !skip(i) && t.is_via() && t.start == p && t.layer_mask().intersects(mask)
        })
    }

    // --- deprecated zone segments ----------------------------------------

    pub fn zone_segments(&self) -> &[Track] {
        &self.zone_segments
    }

    pub fn add_zone_segment(&mut self, mut segment: Track) {
        segment.kind = TrackKind::ZoneSegment;
        let index = self
            .zone_segments
            .partition_point(|t| t.net <= segment.net);
        self.zone_segments.insert(index, segment);
    }

    pub fn remove_zone_segment(&mut self, index: usize) -> Track {
        self.zone_segments.remove(index)
    }

    pub fn zone_segment_mut(&mut self, index: usize) -> &mut Track {
        &mut self.zone_segments[index]
    }

    // --- other collections ------------------------------------------------

    /// Adds a free-standing graphic item at the front of the drawing list.
    ///
    /// Only drawing-family items belong here; tracks, modules, and zones
    /// have their own collections.
    pub fn add_drawing(&mut self, item: BoardItem) {
        debug_assert!(matches!(
            item.kind(),
            ItemKind::Drawing | ItemKind::Text | ItemKind::Dimension | ItemKind::Target
        ));
        self.drawings.insert(0, item);
    }

    pub fn add_draw_segment(&mut self, segment: DrawSegment) {
        self.drawings.insert(0, BoardItem::Drawing(segment));
    }

    pub fn add_text(&mut self, text: TextItem) {
        self.drawings.insert(0, BoardItem::Text(text));
    }

    pub fn add_dimension(&mut self, dimension: Dimension) {
        self.drawings.insert(0, BoardItem::Dimension(dimension));
    }

    pub fn add_target(&mut self, target: Target) {
        self.drawings.insert(0, BoardItem::Target(target));
    }

    pub fn add_module(&mut self, module: Module) {
        self.ratsnest_valid = false;
        self.modules.insert(0, module);
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.push(zone);
    }

    /// Finds a module by its reference designator ("R5", "U3", ...); the
    /// hook a schematic cross-probing bridge calls.
    pub fn find_module_by_reference(&self, reference: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.reference.text == reference)
    }

    /// First pad at `p` on a layer of `mask`, across all modules.
    pub fn pad_at(&self, p: Point, mask: LayerMask) -> Option<(&Module, &Pad)> {
        for module in &self.modules {
            if let Some(pad) = module.pad_at(p, mask) {
                return Some((module, pad));
            }
        }
        None
    }

    // --- layers -----------------------------------------------------------

    pub fn layer_name(&self, layer: LayerNum) -> String {
        self.layers
            .iter()
            .find(|l| l.number == layer)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| standard_layer_name(layer))
    }

    pub fn set_layer_info(&mut self, info: LayerInfo) {
        if let Some(slot) = self.layers.iter_mut().find(|l| l.number == info.number) {
            *slot = info;
        } else {
            self.layers.push(info);
            self.layers.sort_by_key(|l| l.number);
        }
    }

    pub fn is_layer_enabled(&self, layer: LayerNum) -> bool {
        self.design_settings.enabled_layers.contains(layer)
    }

    // --- connectivity status ----------------------------------------------

    pub fn highlighted_net(&self) -> Option<i32> {
        self.highlighted_net
    }

    pub fn set_highlighted_net(&mut self, net: Option<i32>) {
        self.highlighted_net = net;
    }

    pub fn is_ratsnest_valid(&self) -> bool {
        self.ratsnest_valid
    }

    pub fn invalidate_connectivity(&mut self) {
        self.ratsnest_valid = false;
    }

    /// Recomputes the board-level connectivity summary: the number of nets
    /// that have pads but no copper at all. Cheap enough to run after bulk
    /// operations; callers invoke it once per batch, not per item.
    pub fn recompute_ratsnest(&mut self) -> usize {
        let mut unrouted = 0;
        for net in self.nets.iter() {
            if net.code == crate::NET_UNCONNECTED {
                continue;
            }
            let has_pads = self
                .modules
                .iter()
                .any(|m| m.pads.iter().any(|p| p.net == net.code));
            let has_copper = self.first_track_of_net(net.code).is_some()
                || self.zones.iter().any(|z| z.net == net.code && z.is_filled);
            if has_pads && !has_copper {
                unrouted += 1;
            }
        }
        self.ratsnest_valid = true;
        debug!(unrouted, "ratsnest recomputed");
        unrouted
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::ViaType;

    fn seg(net: i32, x: i32) -> Track {
        Track::new_segment(Point::new(x, 0), Point::new(x + 100, 0), 10, 0, net)
    }

    fn net_codes(board: &Board) -> Vec<i32> {
        board.tracks().iter().map(|t| t.net).collect()
    }

    #[test]
    fn tracks_stay_sorted_by_net() {
        let mut board = Board::new();
        for net in [3, 1, 2, 1, 3, 0, 2] {
            board.add_track(seg(net, net * 1000));
        }
        assert_eq!(net_codes(&board), vec![0, 1, 1, 2, 2, 3, 3]);

        board.remove_track(2);
        board.add_track(seg(2, 5000));
        let codes = net_codes(&board);
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn insertion_appends_within_net_range() {
        let mut board = Board::new();
        let a = seg(1, 0);
        let b = seg(1, 1000);
        let (ta, tb) = (a.tstamp, b.tstamp);
        board.add_track(a);
        board.add_track(b);
        let range = board.tracks_of_net(1);
        assert_eq!(board.tracks()[range.start].tstamp, ta);
        assert_eq!(board.tracks()[range.end - 1].tstamp, tb);
    }

    #[test]
    fn net_range_lookup() {
        let mut board = Board::new();
        for net in [1, 1, 2, 4] {
            board.add_track(seg(net, 0));
        }
        assert_eq!(board.tracks_of_net(1), 0..2);
        assert_eq!(board.tracks_of_net(2), 2..3);
        assert_eq!(board.tracks_of_net(3), 3..3);
        assert!(board.first_track_of_net(3).is_none());
        assert!(board.first_track_of_net(4).is_some());
    }

    #[test]
    fn set_track_net_reorders() {
        let mut board = Board::new();
        board.add_track(seg(1, 0));
        board.add_track(seg(3, 0));
        let new_index = board.set_track_net(0, 5);
        assert_eq!(new_index, 1);
        assert_eq!(net_codes(&board), vec![3, 5]);
    }

    #[test]
    fn via_lookup_respects_mask_and_skip() {
        let mut board = Board::new();
        let via = Track::new_via(Point::new(50, 50), 600, ViaType::Through, 1);
        let idx = board.add_track(via);
        let found = board.via_at(Point::new(50, 50), LayerMask::ALL_COPPER, &|_| false);
        assert_eq!(found, Some(idx));
        let skipped = board.via_at(Point::new(50, 50), LayerMask::ALL_COPPER, &|i| i == idx);
        assert_eq!(skipped, None);
    }

    #[test]
    fn ratsnest_counts_unrouted_nets() {
        let mut board = Board::new();
        board.nets.add(1, "GND").unwrap();
        let mut module = Module::new("R");
        let mut pad = Pad::new("1", crate::pad::PadShape::Circle, crate::pad::PadAttribute::ThruHole);
        pad.net = 1;
        module.pads.push(pad);
        board.add_module(module);
        assert_eq!(board.recompute_ratsnest(), 1);

        board.add_track(seg(1, 0));
        assert_eq!(board.recompute_ratsnest(), 0);
        assert!(board.is_ratsnest_valid());
    }

    proptest::proptest! {
        #[test]
        fn any_insertion_order_keeps_tracks_sorted(nets in proptest::collection::vec(0i32..6, 0..40)) {
            let mut board = Board::new();
            for (i, &net) in nets.iter().enumerate() {
                board.add_track(seg(net, i as i32 * 10));
            }
            let codes = net_codes(&board);
            let mut sorted = codes.clone();
            sorted.sort();
            proptest::prop_assert_eq!(codes, sorted);
            // Within one net, file order is arrival order.
            for net in 0..6 {
                let range = board.tracks_of_net(net);
                let xs: Vec<i32> = board.tracks()[range].iter().map(|t| t.start.x).collect();
                let mut expected = xs.clone();
                expected.sort();
                proptest::prop_assert_eq!(xs, expected);
            }
        }
    }
}
