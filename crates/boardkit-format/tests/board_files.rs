//! End-to-end tests of the board file parser and serializer.

use boardkit_board::track::TrackKind;
use boardkit_board::zone::{HatchStyle, PadConnection};
use boardkit_core::geometry::Point;
use boardkit_core::layer::{LAYER_BACK, LAYER_FRONT, SILKSCREEN_FRONT};
use boardkit_core::units::mm_to_iu;
use boardkit_format::{format_board, format_module, parse_board_text, ParsedItem};

const TWO_LAYER_BOARD: &str = r#"
(kicad_pcb (version 3) (host pcbnew "(2014-07-21 BZR 5016)")
  (general
    (links 0)
    (no_connects 0)
    (area 0 0 100 80)
    (thickness 1.6)
    (drawings 1)
    (tracks 3)
    (nets 3)
  )
  (page A4)
  (title_block
    (title "Test board")
    (rev 1A)
    (comment 1 "first comment")
  )
  (layers
    (0 B.Cu signal)
    (15 F.Cu signal)
    (21 F.SilkS user)
    (28 Edge.Cuts user)
  )
  (setup
    (trace_clearance 0.254)
    (zone_clearance 0.508)
    (zone_45_only no)
    (trace_min 0.2)
    (segment_width 0.2)
    (edge_width 0.1)
    (via_size 0.6)
    (via_drill 0.4)
    (via_min_size 0.4)
    (via_min_drill 0.3)
    (uvia_size 0.3)
    (uvia_drill 0.1)
    (uvias_allowed no)
    (uvia_min_size 0.2)
    (uvia_min_drill 0.1)
    (pcb_text_width 0.3)
    (pcb_text_size 1.5 1.5)
    (mod_edge_width 0.15)
    (mod_text_size 1 1)
    (mod_text_width 0.15)
    (pad_size 1.5 1.5)
    (pad_drill 0.6)
  )
  (net 0 "")
  (net 1 GND)
  (net 2 VCC)
  (net_class Default "This is the default net class."
    (clearance 0.254)
    (trace_width 0.25)
    (via_dia 0.6)
    (via_drill 0.4)
    (uvia_dia 0.3)
    (uvia_drill 0.1)
    (add_net GND)
    (add_net VCC)
  )
  (gr_line (start 0 0) (end 100 0) (layer Edge.Cuts) (width 0.1) (tstamp 5A1))
  (segment (start 10 10) (end 20 10) (width 0.25) (layer F.Cu) (net 1) (tstamp 1A2B))
  (segment (start 20 10) (end 30 10) (width 0.25) (layer F.Cu) (net 1) (tstamp 1A2C))
  (via (at 20 10) (size 0.6) (drill 0.4) (layers F.Cu B.Cu) (net 1) (tstamp 2B3C))
)
"#;

fn parse_board(text: &str) -> boardkit_board::board::Board {
    match parse_board_text(text, "test.kicad_pcb").expect("board should parse") {
        ParsedItem::Board(board) => *board,
        ParsedItem::Module(_) => panic!("expected a board"),
    }
}

#[test]
fn two_layer_board_parses() {
    let board = parse_board(TWO_LAYER_BOARD);

    assert_eq!(board.version, 3);
    assert_eq!(board.host.0, "pcbnew");
    assert_eq!(board.design_settings.board_thickness, mm_to_iu(1.6));
    assert_eq!(board.design_settings.copper_layer_count, 2);
    assert_eq!(board.title_block.title, "Test board");
    assert_eq!(board.title_block.comments[0], "first comment");
    assert_eq!(board.nets.len(), 3);
    assert_eq!(board.nets.name_of(1), "GND");

    let default = board.net_classes.default_class();
    assert_eq!(default.track_width, mm_to_iu(0.25));
    assert_eq!(default.nets, ["GND", "VCC"]);

    assert_eq!(board.drawings.len(), 1);
    assert_eq!(board.track_count(), 3);
}

#[test]
fn tracks_keep_file_order_within_a_net() {
    let board = parse_board(TWO_LAYER_BOARD);

    // GND holds two segments and a via; file order survives parsing.
    assert_eq!(board.tracks_of_net(1), 0..3);
    let first = board.first_track_of_net(1).expect("net 1 has tracks");
    let last = board.last_track_of_net(1).expect("net 1 has tracks");
    assert_eq!(first.start, Point::new(mm_to_iu(10.0), mm_to_iu(10.0)));
    assert!(!first.is_via());
    assert_eq!(board.tracks()[1].end, Point::new(mm_to_iu(30.0), mm_to_iu(10.0)));

    // The via came last in the file, so it is the last GND item.
    assert!(last.is_via());
    assert_eq!(last.start, Point::new(mm_to_iu(20.0), mm_to_iu(10.0)));
    assert_eq!(last.layer_pair(), (LAYER_FRONT, LAYER_BACK));
    if let TrackKind::Via { drill, .. } = last.kind {
        assert_eq!(drill, mm_to_iu(0.4));
    }

    // VCC is declared but routes nothing.
    assert!(board.first_track_of_net(2).is_none());
}

#[test]
fn odd_copper_layer_count_is_rejected() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (layers
    (0 B.Cu signal)
    (1 In1.Cu signal)
    (15 F.Cu signal)
    (28 Edge.Cuts user)
  )
)
"#;
    let err = parse_board_text(text, "odd.kicad_pcb").unwrap_err();
    assert!(
        err.to_string().contains("3 is not a valid layer count"),
        "unexpected message: {err}"
    );
    assert_eq!(err.source_name, "odd.kicad_pcb");
}

#[test]
fn undefined_layer_name_is_rejected() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (layers
    (0 B.Cu signal)
    (15 F.Cu signal)
  )
  (net 0 "")
  (segment (start 0 0) (end 1 0) (width 0.25) (layer Inner_GND) (net 0) (tstamp 1))
)
"#;
    let err = parse_board_text(text, "layer.kicad_pcb").unwrap_err();
    assert!(
        err.to_string()
            .contains("layer \"Inner_GND\" was not defined in the layers section"),
        "unexpected message: {err}"
    );
}

#[test]
fn track_referencing_an_undeclared_net_is_rejected() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (layers (0 B.Cu signal) (15 F.Cu signal))
  (net 0 "")
  (segment (start 0 0) (end 1 0) (width 0.25) (layer F.Cu) (net 7) (tstamp 1))
)
"#;
    let err = parse_board_text(text, "net.kicad_pcb").unwrap_err();
    assert!(err.to_string().contains("net 7 is not defined"));
}

#[test]
fn unknown_general_keys_are_skipped() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (general
    (frobnicate 7 (nested deeply))
    (thickness 2.0)
  )
  (layers (0 B.Cu signal) (15 F.Cu signal))
)
"#;
    let board = parse_board(text);
    assert_eq!(board.design_settings.board_thickness, mm_to_iu(2.0));
}

#[test]
fn unknown_board_level_token_reports_expecting() {
    let text = "(kicad_pcb (version 3) (host pcbnew test) (banana 1))";
    let err = parse_board_text(text, "bad.kicad_pcb").unwrap_err();
    assert!(err.to_string().contains("Expecting:"));
    assert!(err.to_string().contains("banana"));
}

#[test]
fn zone_with_mismatched_net_name_is_demoted() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (layers (0 B.Cu signal) (15 F.Cu signal))
  (net 0 "")
  (net 1 GND)
  (zone (net 1) (net_name OLD_GND) (layer F.Cu) (tstamp 9) (hatch edge 0.508)
    (connect_pads (clearance 0.508))
    (min_thickness 0.254)
    (fill (arc_segments 16) (thermal_gap 0.508) (thermal_bridge_width 0.508))
    (polygon (pts (xy 0 0) (xy 10 0) (xy 10 10) (xy 0 10)))
  )
)
"#;
    let board = parse_board(text);
    let zone = &board.zones[0];
    assert_eq!(zone.net, 0);
    assert_eq!(zone.net_name, "OLD_GND");
    assert_eq!(zone.outline.0.len(), 4);
    assert_eq!(zone.hatch_style, HatchStyle::Edge);
    assert_eq!(zone.connect_pads, PadConnection::Thermal);
    assert!(!zone.is_filled);
}

#[test]
fn non_ascii_text_survives_parse_and_round_trip() {
    let text = r#"
(kicad_pcb (version 3) (host pcbnew test)
  (title_block
    (title "Плата управления")
    (comment 1 "Разведено вручную")
  )
  (layers (0 B.Cu signal) (15 F.Cu signal))
  (net 0 "")
  (net 1 ШИНА_5В)
)
"#;
    let board = parse_board(text);
    assert_eq!(board.title_block.title, "Плата управления");
    assert_eq!(board.title_block.comments[0], "Разведено вручную");
    assert_eq!(board.nets.name_of(1), "ШИНА_5В");

    let reread = parse_board(&format_board(&board));
    assert_eq!(reread.title_block, board.title_block);
    assert_eq!(reread.nets.name_of(1), "ШИНА_5В");
}

#[test]
fn board_round_trips_through_the_writer() {
    let board = parse_board(TWO_LAYER_BOARD);
    let text = format_board(&board);
    let reread = parse_board(&text);

    assert_eq!(reread.version, board.version);
    assert_eq!(reread.nets.len(), board.nets.len());
    assert_eq!(reread.track_count(), board.track_count());
    assert_eq!(reread.tracks(), board.tracks());
    assert_eq!(reread.drawings, board.drawings);
    assert_eq!(reread.title_block, board.title_block);
    assert_eq!(reread.design_settings, board.design_settings);
    assert_eq!(
        reread.net_classes.default_class(),
        board.net_classes.default_class()
    );
}

#[test]
fn standalone_module_round_trips() {
    let text = r#"
(module R_0805 locked (layer F.Cu) (tstamp 5F)
  (at 0 0)
  (descr "Resistor 0805")
  (tags "resistor smd")
  (attr smd)
  (fp_text reference R5 (at 0 -1.65) (layer F.SilkS)
    (effects (font (size 1 1) (thickness 0.15)))
  )
  (fp_text value 10K (at 0 1.65) (layer F.SilkS)
    (effects (font (size 1 1) (thickness 0.15)))
  )
  (fp_line (start -1.5 -0.8) (end 1.5 -0.8) (layer F.SilkS) (width 0.15))
  (pad 1 smd rect (at -0.95 0) (size 1.3 1.5) (layers F.Cu F.Paste F.Mask))
  (pad 2 smd rect (at 0.95 0) (size 1.3 1.5) (layers F.Cu F.Paste F.Mask))
)
"#;
    let module = match parse_board_text(text, "R_0805.kicad_mod").expect("module should parse") {
        ParsedItem::Module(module) => *module,
        ParsedItem::Board(_) => panic!("expected a footprint"),
    };
    assert!(module.locked);
    assert_eq!(module.reference.text, "R5");
    assert_eq!(module.reference.layer, SILKSCREEN_FRONT);
    assert_eq!(module.pads.len(), 2);
    assert_eq!(module.pads[0].offset, Point::new(mm_to_iu(-0.95), 0));

    let rewritten = format_module(&module);
    let reread = match parse_board_text(&rewritten, "rt.kicad_mod").expect("rewrite should parse") {
        ParsedItem::Module(module) => *module,
        ParsedItem::Board(_) => panic!("expected a footprint"),
    };
    assert_eq!(reread, module);
}
