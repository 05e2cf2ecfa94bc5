//! Track connectivity walks and post-route cleanup.
//!
//! All transient marks live in local sets keyed by track index or tstamp;
//! the persisted `status` word of a track is never used as scratch space.

use std::collections::HashSet;

use boardkit_board::board::Board;
use boardkit_board::item::BoardItem;
use boardkit_board::track::Track;
use boardkit_core::geometry::Point;
use boardkit_core::layer::LayerMask;
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::undo::PickedItemsList;

/// First track touching `p` on a layer of `mask`, excluding the tstamps in
/// `exclude`. Vias match on their center, segments on either endpoint.
pub fn find_track_at(
    board: &Board,
    p: Point,
    mask: LayerMask,
    exclude: &HashSet<u64>,
) -> Option<usize> {
    board.tracks().iter().position(|t| {
        !exclude.contains(&t.tstamp) && t.layer_mask().intersects(mask) && touches(t, p)
    })
}

/// Whether two layer spans meeting at `p` are electrically joined there:
/// they overlap directly, or a via or pad at `p` bridges them.
fn joined_at(board: &Board, p: Point, a: LayerMask, b: LayerMask) -> bool {
    if a.intersects(b) {
        return true;
    }
    if let Some(via_index) = board.via_at(p, a, &|_| false) {
        if board.tracks()[via_index].layer_mask().intersects(b) {
            return true;
        }
    }
    if let Some((_, pad)) = board.pad_at(p, a) {
        if pad.layers.intersects(b) {
            return true;
        }
    }
    false
}

fn touches(track: &Track, p: Point) -> bool {
    track.start == p || (!track.is_via() && track.end == p)
}

/// Other endpoint of `track` as seen from `p`; a via has a single point.
fn far_end(track: &Track, p: Point) -> Point {
    if track.is_via() || track.start != p {
        track.start
    } else {
        track.end
    }
}

/// Collects the connected cluster of same-net tracks reachable from
/// `start`, in visit order. Visited marks are a local set.
pub fn mark_trace(board: &Board, start: usize) -> Vec<usize> {
    let net = board.tracks()[start].net;
    let range = board.tracks_of_net(net);

    let mut visited: HashSet<usize> = HashSet::new();
    let mut order = Vec::new();
    let mut queue = vec![start];
    visited.insert(start);

    while let Some(index) = queue.pop() {
        order.push(index);
        let track = &board.tracks()[index];
        let points: SmallVec<[Point; 2]> = if track.is_via() {
            smallvec![track.start]
        } else {
            smallvec![track.start, track.end]
        };
        for p in points {
            for other in range.clone() {
                if visited.contains(&other) {
                    continue;
                }
                let candidate = &board.tracks()[other];
                if touches(candidate, p)
                    && joined_at(board, p, track.layer_mask(), candidate.layer_mask())
                {
                    visited.insert(other);
                    queue.push(other);
                }
            }
        }
    }
    order
}

/// The two free ends of a linear chain of tracks: endpoints used by exactly
/// one chain member. `None` when the chain is closed or branches.
pub fn chain_ends(board: &Board, chain: &[usize]) -> Option<(Point, Point)> {
    let mut counts: Vec<(Point, usize)> = Vec::new();
    let mut bump = |p: Point| {
        match counts.iter_mut().find(|(q, _)| *q == p) {
            Some((_, n)) => *n += 1,
            None => counts.push((p, 1)),
        }
    };
    for &index in chain {
        let track = &board.tracks()[index];
        if track.is_via() {
            continue;
        }
        bump(track.start);
        bump(track.end);
    }
    let ends: Vec<Point> = counts
        .iter()
        .filter(|(_, n)| *n == 1)
        .map(|(p, _)| *p)
        .collect();
    match ends.as_slice() {
        [a, b] => Some((*a, *b)),
        _ => None,
    }
}

/// Layer span usable for a continuation leaving `p`: the union of the
/// layers of every new-chain track touching `p`, widened by any via or pad
/// sitting on `p`.
fn end_mask(board: &Board, p: Point, chain: &[usize]) -> LayerMask {
    let mut mask = LayerMask::NONE;
    for &index in chain {
        let track = &board.tracks()[index];
        if touches(track, p) {
            mask |= track.layer_mask();
        }
    }
    if let Some(via_index) = board.via_at(p, mask, &|_| false) {
        mask |= board.tracks()[via_index].layer_mask();
    }
    if let Some((_, pad)) = board.pad_at(p, mask) {
        mask |= pad.layers;
    }
    mask
}

/// Depth-first path search over the old tracks of one net.
struct PathSearch<'a> {
    board: &'a Board,
    net: i32,
    target: Point,
    target_mask: LayerMask,
    /// Tstamps of the new chain, never part of a redundant path.
    forbidden: &'a HashSet<u64>,
    visited: HashSet<usize>,
    path: Vec<usize>,
}

impl PathSearch<'_> {
    fn walk(&mut self, from: Point, from_mask: LayerMask) -> bool {
        if from == self.target && from_mask.intersects(self.target_mask) && !self.path.is_empty() {
            return true;
        }
        for index in self.board.tracks_of_net(self.net) {
            if self.visited.contains(&index) {
                continue;
            }
            let track = &self.board.tracks()[index];
            if self.forbidden.contains(&track.tstamp) || !touches(track, from) {
                continue;
            }
            if !joined_at(self.board, from, from_mask, track.layer_mask()) {
                continue;
            }
            self.visited.insert(index);
            self.path.push(index);
            // A via widens the layer span in place, a segment moves the
            // walk along.
            let next = far_end(track, from);
            let next_mask = track.layer_mask();
            if self.walk(next, next_mask) {
                return true;
            }
            self.path.pop();
        }
        false
    }
}

/// After routing a new chain, removes the old connection it replaced.
///
/// `new_chain` names the just-placed tracks by tstamp. When the old tracks
/// of the same net contain a path joining the new chain's two free ends,
/// that path is redundant and is deleted; the removals are recorded in
/// `undo`. Returns the number of tracks removed. The status words of all
/// surviving tracks are left exactly as they were.
pub fn erase_redundant_track(
    board: &mut Board,
    new_chain: &[u64],
    undo: &mut PickedItemsList,
) -> usize {
    let forbidden: HashSet<u64> = new_chain.iter().copied().collect();
    let chain_indices: Vec<usize> = board
        .tracks()
        .iter()
        .enumerate()
        .filter(|(_, t)| forbidden.contains(&t.tstamp))
        .map(|(i, _)| i)
        .collect();
    if chain_indices.is_empty() {
        return 0;
    }
    let net = board.tracks()[chain_indices[0]].net;
    if chain_indices
        .iter()
        .any(|&i| board.tracks()[i].net != net)
    {
        return 0;
    }

    let Some((start_pt, end_pt)) = chain_ends(board, &chain_indices) else {
        return 0;
    };
    let start_mask = end_mask(board, start_pt, &chain_indices);
    let target_mask = end_mask(board, end_pt, &chain_indices);

    let mut search = PathSearch {
        board,
        net,
        target: end_pt,
        target_mask,
        forbidden: &forbidden,
        visited: HashSet::new(),
        path: Vec::new(),
    };
    if !search.walk(start_pt, start_mask) {
        return 0;
    }

    // Delete by tstamp; indices shift as tracks come out.
    let doomed: Vec<u64> = search
        .path
        .iter()
        .map(|&i| board.tracks()[i].tstamp)
        .collect();
    let mut removed = 0;
    for tstamp in doomed {
        if let Some(index) = board.track_index_by_tstamp(tstamp) {
            let track = board.remove_track(index);
            undo.push_deleted(BoardItem::Track(track));
            removed += 1;
        }
    }
    debug!(net, removed, "redundant track erased");
    removed
}

/// Drags one endpoint of a segment to `new_pos`, pulling the endpoints of
/// connected same-net tracks along so the junction stays joined. Every
/// mutated track is recorded in the returned list before the change.
pub fn drag_track_endpoint(
    board: &mut Board,
    index: usize,
    move_start: bool,
    new_pos: Point,
) -> PickedItemsList {
    let mut undo = PickedItemsList::new();
    let dragged = &board.tracks()[index];
    let old_pos = if move_start { dragged.start } else { dragged.end };
    if old_pos == new_pos {
        return undo;
    }
    let net = dragged.net;
    let mask = dragged.layer_mask();

    let followers: Vec<usize> = board
        .tracks_of_net(net)
        .filter(|&i| {
            i != index && {
                let t = &board.tracks()[i];
                touches(t, old_pos) && joined_at(board, old_pos, mask, t.layer_mask())
            }
        })
        .collect();

    undo.push_changed(BoardItem::Track(board.tracks()[index].clone()));
    {
        let track = board.track_mut(index);
        if move_start {
            track.start = new_pos;
        } else {
            track.end = new_pos;
        }
    }
    for follower in followers {
        undo.push_changed(BoardItem::Track(board.tracks()[follower].clone()));
        let track = board.track_mut(follower);
        if track.start == old_pos {
            track.start = new_pos;
        }
        if !track.is_via() && track.end == old_pos {
            track.end = new_pos;
        }
    }
    undo
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardkit_core::layer::{LAYER_BACK, LAYER_FRONT};
    use boardkit_core::units::mm_to_iu;

    fn mm(v: f64) -> i32 {
        mm_to_iu(v)
    }

    fn board_with_net() -> Board {
        let mut board = Board::new();
        board.nets.add(1, "GND").unwrap();
        board
    }

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64, layer: i32) -> Track {
        Track::new_segment(
            Point::new(mm(x1), mm(y1)),
            Point::new(mm(x2), mm(y2)),
            mm(0.25),
            layer,
            1,
        )
    }

    #[test]
    fn mark_trace_collects_a_connected_chain() {
        let mut board = board_with_net();
        board.add_track(seg(0.0, 0.0, 10.0, 0.0, LAYER_FRONT));
        board.add_track(seg(10.0, 0.0, 20.0, 0.0, LAYER_FRONT));
        // Different layer, no via: not joined.
        board.add_track(seg(20.0, 0.0, 30.0, 0.0, LAYER_BACK));

        let chain = mark_trace(&board, 0);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn mark_trace_crosses_a_via() {
        let mut board = board_with_net();
        board.add_track(seg(0.0, 0.0, 10.0, 0.0, LAYER_FRONT));
        board.add_track(Track::new_via(
            Point::new(mm(10.0), 0),
            mm(0.6),
            boardkit_board::track::ViaType::Through,
            1,
        ));
        board.add_track(seg(10.0, 0.0, 20.0, 0.0, LAYER_BACK));

        let chain = mark_trace(&board, 0);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn redundant_old_route_is_removed() {
        let mut board = board_with_net();
        // Old two-segment detour from (0,0) to (20,0).
        let old1 = seg(0.0, 0.0, 10.0, 5.0, LAYER_FRONT);
        let old2 = seg(10.0, 5.0, 20.0, 0.0, LAYER_FRONT);
        board.add_track(old1);
        board.add_track(old2);
        // New direct segment between the same ends.
        let new_track = seg(0.0, 0.0, 20.0, 0.0, LAYER_FRONT);
        let new_tstamp = new_track.tstamp;
        board.add_track(new_track);

        let mut undo = PickedItemsList::new();
        let removed = erase_redundant_track(&mut board, &[new_tstamp], &mut undo);
        assert_eq!(removed, 2);
        assert_eq!(undo.len(), 2);
        assert_eq!(board.track_count(), 1);
        assert_eq!(board.tracks()[0].tstamp, new_tstamp);

        // A second pass finds nothing left to delete.
        let mut second = PickedItemsList::new();
        assert_eq!(erase_redundant_track(&mut board, &[new_tstamp], &mut second), 0);
        assert!(second.is_empty());
        assert_eq!(board.track_count(), 1);
    }

    #[test]
    fn unrelated_route_survives_cleanup() {
        let mut board = board_with_net();
        let other = seg(50.0, 50.0, 60.0, 50.0, LAYER_FRONT);
        board.add_track(other);
        let new_track = seg(0.0, 0.0, 20.0, 0.0, LAYER_FRONT);
        let new_tstamp = new_track.tstamp;
        board.add_track(new_track);

        let mut undo = PickedItemsList::new();
        let removed = erase_redundant_track(&mut board, &[new_tstamp], &mut undo);
        assert_eq!(removed, 0);
        assert!(undo.is_empty());
        assert_eq!(board.track_count(), 2);
    }

    #[test]
    fn cleanup_never_touches_status_words() {
        let mut board = board_with_net();
        let mut survivor = seg(50.0, 50.0, 60.0, 50.0, LAYER_FRONT);
        survivor.status = 0xDEAD;
        let survivor_tstamp = survivor.tstamp;
        board.add_track(survivor);
        let new_track = seg(0.0, 0.0, 20.0, 0.0, LAYER_FRONT);
        let new_tstamp = new_track.tstamp;
        board.add_track(new_track);

        let mut undo = PickedItemsList::new();
        erase_redundant_track(&mut board, &[new_tstamp], &mut undo);
        let index = board.track_index_by_tstamp(survivor_tstamp).unwrap();
        assert_eq!(board.tracks()[index].status, 0xDEAD);
    }

    #[test]
    fn drag_pulls_connected_endpoints_along() {
        let mut board = board_with_net();
        board.add_track(seg(0.0, 0.0, 10.0, 0.0, LAYER_FRONT));
        board.add_track(seg(10.0, 0.0, 20.0, 0.0, LAYER_FRONT));

        let undo = drag_track_endpoint(&mut board, 0, false, Point::new(mm(10.0), mm(3.0)));
        assert_eq!(undo.len(), 2);
        assert_eq!(board.tracks()[0].end, Point::new(mm(10.0), mm(3.0)));
        assert_eq!(board.tracks()[1].start, Point::new(mm(10.0), mm(3.0)));
    }

    proptest::proptest! {
        // A trace walk reports only tracks of the seed net and mutates
        // nothing, whatever junk lives in the status words.
        #[test]
        fn mark_trace_stays_on_the_seed_net(
            statuses in proptest::collection::vec(proptest::num::u32::ANY, 1..12),
        ) {
            let mut board = board_with_net();
            board.nets.add(2, "VCC").unwrap();
            for (i, &status) in statuses.iter().enumerate() {
                let x = i as f64 * 10.0;
                let mut t = seg(x, 0.0, x + 10.0, 0.0, LAYER_FRONT);
                if i % 3 == 2 {
                    t.net = 2;
                }
                t.status = status;
                board.add_track(t);
            }
            let before: Vec<u32> = board.tracks().iter().map(|t| t.status).collect();
            let seed = board.tracks_of_net(1).start;
            let chain = mark_trace(&board, seed);
            for &index in &chain {
                proptest::prop_assert_eq!(board.tracks()[index].net, 1);
            }
            let after: Vec<u32> = board.tracks().iter().map(|t| t.status).collect();
            proptest::prop_assert_eq!(before, after);
        }
    }
}
