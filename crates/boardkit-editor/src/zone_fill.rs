//! Copper zone filling.
//!
//! The fill pipeline works in millimeter space on closed polylines: the
//! zone outline is shrunk inward by the clearance plus half the minimum
//! copper width, obstacles (foreign tracks and pads, keepouts, higher
//! priority zones) are subtracted, and the result is tessellated back to
//! integer-unit polygons stored on the zone. Thermal reliefs cut a gap
//! ring around same-net through-hole pads and bridge it with four spokes.
//!
//! Filling is deterministic: the same board produces the same polygons.

use boardkit_board::board::Board;
use boardkit_board::pad::{Pad, PadAttribute};
use boardkit_board::zone::{PadConnection, Zone};
use boardkit_core::geometry::Point;
use boardkit_core::units::{iu_to_mm, mm_to_iu};
use cavalier_contours::polyline::{
    BooleanOp, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Zone fill failures that leave the zone unfilled but the board intact.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ZoneFillError {
    #[error("zone outline has fewer than 3 corners")]
    DegenerateOutline,

    /// The outline shrinks to nothing at the requested clearance.
    #[error("zone collapses to nothing at clearance {clearance_mm} mm")]
    Collapsed { clearance_mm: f64 },

    /// The progress callback asked to stop.
    #[error("zone fill cancelled")]
    Cancelled,
}

/// Computes the fill polygons of one zone without mutating the board.
pub fn fill_zone(board: &Board, zone_index: usize) -> Result<Vec<Vec<Point>>, ZoneFillError> {
    let zone = &board.zones[zone_index];
    if zone
        .keepout
        .as_ref()
        .is_some_and(|k| k.no_copper_pour)
    {
        return Ok(Vec::new());
    }
    if zone.outline.0.len() < 3 {
        return Err(ZoneFillError::DegenerateOutline);
    }

    let shrink = iu_to_mm(zone.clearance + zone.min_thickness / 2);
    let outline = prepare_polygon(&zone.outline.0);

    // Negative offset shrinks a CW-oriented closed polyline inward. The
    // offset algorithm can panic on degenerate self-intersecting input,
    // so the call is fenced off.
    let offset = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        outline.parallel_offset(-shrink)
    }));
    let mut regions: Vec<Polyline> = match offset {
        Ok(regions) => regions,
        Err(_) => {
            warn!(zone = zone_index, "polygon offset failed, zone left unfilled");
            Vec::new()
        }
    };
    for hole in &zone.holes {
        if hole.0.len() < 3 {
            continue;
        }
        let hole_pline = prepare_polygon(&hole.0);
        regions = subtract(regions, &hole_pline);
    }
    if regions.is_empty() {
        return Err(ZoneFillError::Collapsed {
            clearance_mm: shrink,
        });
    }

    for obstacle in collect_obstacles(board, zone) {
        regions = subtract(regions, &obstacle);
        if regions.is_empty() {
            return Err(ZoneFillError::Collapsed {
                clearance_mm: shrink,
            });
        }
    }

    let mut polys: Vec<Vec<Point>> = regions
        .iter()
        .map(|p| tessellate(p, zone.arc_segments.max(8)))
        .filter(|p| p.len() >= 3)
        .collect();

    polys.extend(thermal_spokes(board, zone));
    Ok(polys)
}

/// Fills one zone in place. Keepout zones end up empty and unfilled.
pub fn fill_zone_in_place(board: &mut Board, zone_index: usize) -> Result<usize, ZoneFillError> {
    let polys = fill_zone(board, zone_index)?;
    let count = polys.len();
    let zone = &mut board.zones[zone_index];
    zone.filled_polys = polys;
    zone.is_filled = count > 0;
    debug!(zone = zone_index, polygons = count, "zone filled");
    Ok(count)
}

/// Fills every fillable zone, highest priority first. Returns how many
/// zones failed to fill.
///
/// `progress` is called before each zone with (done, total); returning
/// `false` cancels between zones, leaving already-filled zones filled.
/// A zone that fails to fill is reported and counted, not fatal for the
/// batch. The connectivity summary is recomputed once at the end, not
/// per zone.
pub fn fill_all_zones(
    board: &mut Board,
    progress: &mut dyn FnMut(usize, usize) -> bool,
) -> Result<usize, ZoneFillError> {
    let mut order: Vec<usize> = (0..board.zones.len())
        .filter(|&i| {
            !board.zones[i]
                .keepout
                .as_ref()
                .is_some_and(|k| k.no_copper_pour)
        })
        .collect();
    order.sort_by_key(|&i| std::cmp::Reverse(board.zones[i].priority));

    let total = order.len();
    let mut errors = 0;
    for (done, &index) in order.iter().enumerate() {
        if !progress(done, total) {
            return Err(ZoneFillError::Cancelled);
        }
        match fill_zone_in_place(board, index) {
            Ok(_) => {}
            Err(err @ (ZoneFillError::Collapsed { .. } | ZoneFillError::DegenerateOutline)) => {
                warn!(zone = index, %err, "zone fill failed");
                let zone = &mut board.zones[index];
                zone.filled_polys.clear();
                zone.is_filled = false;
                errors += 1;
            }
            Err(cancel) => return Err(cancel),
        }
    }
    let unrouted = board.recompute_ratsnest();
    info!(total, errors, unrouted, "zone fill pass finished");
    Ok(errors)
}

// --- geometry helpers ----------------------------------------------------

fn to_mm(p: Point) -> (f64, f64) {
    (iu_to_mm(p.x), iu_to_mm(p.y))
}

/// Builds a clean, CW-oriented closed polyline from integer-unit corners.
fn prepare_polygon(corners: &[Point]) -> Polyline {
    let tolerance = 1e-4;
    let mut clean: Vec<(f64, f64)> = Vec::with_capacity(corners.len());
    for &c in corners {
        let p = to_mm(c);
        match clean.last() {
            Some(&(x, y)) if (p.0 - x).abs() < tolerance && (p.1 - y).abs() < tolerance => {}
            _ => clean.push(p),
        }
    }
    if clean.len() > 1 {
        let first = clean[0];
        let last = clean[clean.len() - 1];
        if (first.0 - last.0).abs() < tolerance && (first.1 - last.1).abs() < tolerance {
            clean.pop();
        }
    }

    let mut signed_area = 0.0;
    for i in 0..clean.len() {
        let (x1, y1) = clean[i];
        let (x2, y2) = clean[(i + 1) % clean.len()];
        signed_area += x1 * y2 - x2 * y1;
    }
    if signed_area > 0.0 {
        clean.reverse();
    }

    let mut pline = Polyline::new();
    for (x, y) in clean {
        pline.add_vertex(PlineVertex::new(x, y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// A circle as a two-vertex closed polyline with semicircular bulges.
fn circle_pline(center: Point, radius_mm: f64) -> Polyline {
    let (cx, cy) = to_mm(center);
    let mut pline = Polyline::new();
    pline.add_vertex(PlineVertex::new(cx - radius_mm, cy, 1.0));
    pline.add_vertex(PlineVertex::new(cx + radius_mm, cy, 1.0));
    pline.set_is_closed(true);
    pline
}

/// A stadium (capsule) around a segment, the clearance hull of a track.
fn stadium_pline(a: Point, b: Point, radius_mm: f64) -> Polyline {
    let (ax, ay) = to_mm(a);
    let (bx, by) = to_mm(b);
    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return circle_pline(a, radius_mm);
    }
    let nx = -dy / len * radius_mm;
    let ny = dx / len * radius_mm;
    let mut pline = Polyline::new();
    pline.add_vertex(PlineVertex::new(ax + nx, ay + ny, 0.0));
    pline.add_vertex(PlineVertex::new(bx + nx, by + ny, 1.0));
    pline.add_vertex(PlineVertex::new(bx - nx, by - ny, 0.0));
    pline.add_vertex(PlineVertex::new(ax - nx, ay - ny, 1.0));
    pline.set_is_closed(true);
    pline
}

/// Subtracts `obstacle` from every region, keeping the surviving outer
/// loops. Holes the subtraction opens are dropped; the stored fill is a
/// set of simple polygons.
fn subtract(regions: Vec<Polyline>, obstacle: &Polyline) -> Vec<Polyline> {
    let mut next = Vec::with_capacity(regions.len());
    for region in regions {
        let result = region.boolean(obstacle, BooleanOp::Not);
        for out in result.pos_plines {
            next.push(out.pline);
        }
    }
    next
}

/// Whether the pad receives a thermal relief in this zone.
fn pad_gets_thermal(zone: &Zone, pad: &Pad) -> bool {
    match zone.connect_pads {
        PadConnection::Thermal => true,
        PadConnection::ThermalReliefsForThtOnly => {
            matches!(pad.attribute, PadAttribute::ThruHole | PadAttribute::NpThruHole)
        }
        PadConnection::Solid | PadConnection::None => false,
    }
}

/// Collects every copper obstacle the fill must clear, in a fixed order.
fn collect_obstacles(board: &Board, zone: &Zone) -> Vec<Polyline> {
    let clearance = iu_to_mm(zone.clearance);
    let mut obstacles = Vec::new();

    for track in board.tracks().iter().chain(board.zone_segments()) {
        if track.net == zone.net || !track.layer_mask().contains(zone.layer) {
            continue;
        }
        let radius = iu_to_mm(track.width) / 2.0 + clearance;
        obstacles.push(stadium_pline(track.start, track.end, radius));
    }

    for module in &board.modules {
        for pad in &module.pads {
            if !pad.layers.contains(zone.layer) {
                continue;
            }
            let position = module.pad_position(pad);
            let pad_radius = iu_to_mm(pad.enclosing_radius());
            if pad.net == zone.net && zone.net != 0 {
                if pad_gets_thermal(zone, pad) {
                    obstacles.push(circle_pline(
                        position,
                        pad_radius + iu_to_mm(zone.thermal_gap),
                    ));
                }
                // Solid connection: no cutout at all.
                continue;
            }
            obstacles.push(circle_pline(position, pad_radius + clearance));
        }
    }

    for other in &board.zones {
        if other.tstamp == zone.tstamp || other.layer != zone.layer {
            continue;
        }
        let carves = other
            .keepout
            .as_ref()
            .is_some_and(|k| k.no_copper_pour)
            || (other.priority > zone.priority && other.net != zone.net);
        if carves && other.outline.0.len() >= 3 {
            obstacles.push(prepare_polygon(&other.outline.0));
        }
    }
    obstacles
}

/// Four bridge rectangles across the thermal gap of same-net pads.
fn thermal_spokes(board: &Board, zone: &Zone) -> Vec<Vec<Point>> {
    let mut spokes = Vec::new();
    if zone.net == 0 {
        return spokes;
    }
    for module in &board.modules {
        for pad in &module.pads {
            if pad.net != zone.net
                || !pad.layers.contains(zone.layer)
                || !pad_gets_thermal(zone, pad)
            {
                continue;
            }
            let position = module.pad_position(pad);
            if !zone.hit_test(position) {
                continue;
            }
            let reach = pad.enclosing_radius() + zone.thermal_gap + zone.min_thickness;
            let half_w = zone.thermal_bridge_width / 2;
            // Horizontal and vertical bars through the pad center.
            spokes.push(rectangle(position, reach, half_w));
            spokes.push(rectangle(position, half_w, reach));
        }
    }
    spokes
}

fn rectangle(center: Point, half_x: i32, half_y: i32) -> Vec<Point> {
    vec![
        Point::new(center.x - half_x, center.y - half_y),
        Point::new(center.x + half_x, center.y - half_y),
        Point::new(center.x + half_x, center.y + half_y),
        Point::new(center.x - half_x, center.y + half_y),
    ]
}

/// Flattens a polyline with bulge arcs into integer-unit corners.
/// `arc_segments` is the approximation count for a full circle.
fn tessellate(pline: &Polyline, arc_segments: i32) -> Vec<Point> {
    let verts = &pline.vertex_data;
    let count = verts.len();
    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let v1 = verts[i];
        let v2 = verts[(i + 1) % count];
        points.push(Point::new(mm_to_iu(v1.x), mm_to_iu(v1.y)));

        if v1.bulge.abs() > 1e-5 {
            let theta = 4.0 * v1.bulge.atan();
            let chord = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
            if chord < 1e-6 {
                continue;
            }
            let radius = chord / (2.0 * (theta / 2.0).sin());
            let dist_to_center = radius.abs() * (theta.abs() / 2.0).cos();
            let mx = (v1.x + v2.x) / 2.0;
            let my = (v1.y + v2.y) / 2.0;
            let nx = -(v2.y - v1.y) / chord;
            let ny = (v2.x - v1.x) / chord;
            let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
            let cx = mx + nx * dist_to_center * sign;
            let cy = my + ny * dist_to_center * sign;
            let start_angle = (v1.y - cy).atan2(v1.x - cx);
            let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
            if v1.bulge > 0.0 {
                if end_angle <= start_angle {
                    end_angle += 2.0 * std::f64::consts::PI;
                }
            } else if end_angle >= start_angle {
                end_angle -= 2.0 * std::f64::consts::PI;
            }
            let span = (end_angle - start_angle).abs();
            let steps = ((arc_segments as f64 * span / (2.0 * std::f64::consts::PI)).ceil()
                as usize)
                .max(1);
            for j in 1..steps {
                let t = j as f64 / steps as f64;
                let angle = start_angle + (end_angle - start_angle) * t;
                points.push(Point::new(
                    mm_to_iu(cx + radius.abs() * angle.cos()),
                    mm_to_iu(cy + radius.abs() * angle.sin()),
                ));
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardkit_board::track::Track;
    use boardkit_board::zone::Contour;
    use boardkit_core::layer::LAYER_FRONT;

    fn mm(v: f64) -> i32 {
        mm_to_iu(v)
    }

    fn square_zone(net: i32) -> Zone {
        let mut zone = Zone::new(LAYER_FRONT, net);
        zone.outline = Contour(vec![
            Point::new(0, 0),
            Point::new(mm(20.0), 0),
            Point::new(mm(20.0), mm(20.0)),
            Point::new(0, mm(20.0)),
        ]);
        zone
    }

    fn board_with_zone() -> Board {
        let mut board = Board::new();
        board.nets.add(1, "GND").unwrap();
        board.nets.add(2, "VCC").unwrap();
        board.add_zone(square_zone(1));
        board
    }

    #[test]
    fn empty_board_zone_fills_to_one_polygon() {
        let board = board_with_zone();
        let polys = fill_zone(&board, 0).unwrap();
        assert_eq!(polys.len(), 1);
        // Pulled inward from every edge.
        let shrink = board.zones[0].clearance + board.zones[0].min_thickness / 2;
        for p in &polys[0] {
            assert!(p.x >= shrink - 1 && p.x <= mm(20.0) - shrink + 1);
            assert!(p.y >= shrink - 1 && p.y <= mm(20.0) - shrink + 1);
        }
    }

    #[test]
    fn fill_is_deterministic() {
        let mut board = board_with_zone();
        board.add_track(Track::new_segment(
            Point::new(mm(5.0), mm(10.0)),
            Point::new(mm(15.0), mm(10.0)),
            mm(0.25),
            LAYER_FRONT,
            2,
        ));
        let first = fill_zone(&board, 0).unwrap();
        let second = fill_zone(&board, 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn foreign_track_splits_the_fill() {
        let mut board = board_with_zone();
        let plain = fill_zone(&board, 0).unwrap();
        assert_eq!(plain.len(), 1);
        // Crosses the whole zone, cutting the copper in two.
        board.add_track(Track::new_segment(
            Point::new(mm(-5.0), mm(10.0)),
            Point::new(mm(25.0), mm(10.0)),
            mm(0.25),
            LAYER_FRONT,
            2,
        ));
        let with_obstacle = fill_zone(&board, 0).unwrap();
        assert_eq!(with_obstacle.len(), 2);
    }

    #[test]
    fn same_net_track_is_not_an_obstacle() {
        let mut board = board_with_zone();
        let plain = fill_zone(&board, 0).unwrap();
        board.add_track(Track::new_segment(
            Point::new(mm(5.0), mm(10.0)),
            Point::new(mm(15.0), mm(10.0)),
            mm(0.25),
            LAYER_FRONT,
            1,
        ));
        let with_track = fill_zone(&board, 0).unwrap();
        assert_eq!(plain, with_track);
    }

    #[test]
    fn degenerate_outline_is_reported() {
        let mut board = Board::new();
        let mut zone = Zone::new(LAYER_FRONT, 0);
        zone.outline = Contour(vec![Point::new(0, 0), Point::new(mm(1.0), 0)]);
        board.add_zone(zone);
        assert_eq!(
            fill_zone(&board, 0),
            Err(ZoneFillError::DegenerateOutline)
        );
    }

    #[test]
    fn keepout_zone_stays_empty() {
        let mut board = Board::new();
        let mut zone = square_zone(0);
        zone.keepout = Some(boardkit_board::zone::KeepoutParams {
            no_tracks: false,
            no_vias: false,
            no_copper_pour: true,
        });
        board.add_zone(zone);
        let mut always = |_done: usize, _total: usize| true;
        // Keepouts are not fillable and not failures.
        let errors = fill_all_zones(&mut board, &mut always).unwrap();
        assert_eq!(errors, 0);
        assert!(!board.zones[0].is_filled);
    }

    #[test]
    fn failed_zones_are_counted_not_fatal() {
        let mut board = board_with_zone();
        for _ in 0..2 {
            let mut broken = Zone::new(LAYER_FRONT, 1);
            broken.outline = Contour(vec![Point::new(0, 0), Point::new(mm(1.0), 0)]);
            board.add_zone(broken);
        }
        let mut always = |_: usize, _: usize| true;
        let errors = fill_all_zones(&mut board, &mut always).unwrap();
        assert_eq!(errors, 2);
        // The good zone still filled.
        assert!(board.zones[0].is_filled);
        assert!(!board.zones[1].is_filled);
        assert!(!board.zones[2].is_filled);
    }

    #[test]
    fn cancellation_stops_between_zones() {
        let mut board = board_with_zone();
        board.add_zone(square_zone(1));
        let mut cancel_after_first = |done: usize, _total: usize| done == 0;
        let err = fill_all_zones(&mut board, &mut cancel_after_first).unwrap_err();
        assert_eq!(err, ZoneFillError::Cancelled);
        // The first zone was filled before the cancel point.
        assert!(board.zones.iter().any(|z| z.is_filled));
    }

    #[test]
    fn fill_pass_revalidates_connectivity() {
        let mut board = board_with_zone();
        board.invalidate_connectivity();
        let mut always = |_: usize, _: usize| true;
        let errors = fill_all_zones(&mut board, &mut always).unwrap();
        assert_eq!(errors, 0);
        assert!(board.is_ratsnest_valid());
        assert!(board.zones[0].is_filled);
        assert!(!board.zones[0].filled_polys.is_empty());
    }
}
