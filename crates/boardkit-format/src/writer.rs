//! S-expression serializer, the mirror of [`crate::parser`].
//!
//! Sections come out in a fixed order so a load/save cycle is stable:
//! header, general, page, title block, layers, setup, nets, net classes,
//! graphics, modules, tracks and vias, zones. Distances are printed in
//! millimeters through [`fmt_iu`], which trims trailing zeros and keeps
//! enough digits for a lossless re-read.

use std::fmt::Write;

use boardkit_board::board::Board;
use boardkit_board::drawing::{Dimension, DrawSegment, ShapeKind, Target, TargetShape, TextItem};
use boardkit_board::item::BoardItem;
use boardkit_board::module::{Model3D, Module, ModuleAttr, ModuleText, ModuleTextKind};
use boardkit_board::netinfo::NetClass;
use boardkit_board::pad::{Pad, PadAttribute, PadShape};
use boardkit_board::track::{Track, TrackKind, ViaType};
use boardkit_board::zone::{FillMode, HatchStyle, PadConnection, Zone};
use boardkit_core::layer::{
    standard_layer_name, LayerMask, LayerNum, ADHESIVE_BACK, ADHESIVE_FRONT, LAYER_BACK,
    LAYER_FRONT, SILKSCREEN_BACK, SILKSCREEN_FRONT, SOLDERMASK_BACK, SOLDERMASK_FRONT,
    SOLDERPASTE_BACK, SOLDERPASTE_FRONT,
};
use boardkit_core::units::{fmt_decideg, fmt_iu};

/// Serializes a whole board to file text.
pub fn format_board(board: &Board) -> String {
    let mut w = SexpWriter::with_board(board);
    w.board(board);
    w.out
}

/// Serializes one standalone footprint, using the canonical layer names.
pub fn format_module(module: &Module) -> String {
    let mut w = SexpWriter::standalone();
    w.module(module);
    w.out
}

/// Quotes a token when it would not survive bare re-tokenization.
fn quoted(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"' | b'%' | b'{' | b'}'));
    if !needs_quotes {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Prints a plain float with the trailing zeros trimmed.
fn fmt_f64(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

struct SexpWriter {
    out: String,
    indent: usize,
    /// Layer names from the board's layer table, canonical for standalone
    /// footprints.
    layer_names: Vec<(LayerNum, String)>,
}

impl SexpWriter {
    fn with_board(board: &Board) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            layer_names: board
                .layers
                .iter()
                .map(|l| (l.number, l.name.clone()))
                .collect(),
        }
    }

    fn standalone() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            layer_names: Vec::new(),
        }
    }

    fn layer_name(&self, layer: LayerNum) -> String {
        self.layer_names
            .iter()
            .find(|(n, _)| *n == layer)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| standard_layer_name(layer))
    }

    /// Layer set as a name list, compacting the well-known wildcard pairs.
    fn mask_names(&self, mask: LayerMask) -> String {
        let mut remaining = mask;
        let mut parts = Vec::new();
        let pairs: [(&str, LayerMask); 5] = [
            ("*.Cu", LayerMask::ALL_COPPER),
            ("*.Adhes", LayerMask::of(ADHESIVE_BACK) | LayerMask::of(ADHESIVE_FRONT)),
            ("*.Paste", LayerMask::of(SOLDERPASTE_BACK) | LayerMask::of(SOLDERPASTE_FRONT)),
            ("*.Mask", LayerMask::of(SOLDERMASK_BACK) | LayerMask::of(SOLDERMASK_FRONT)),
            ("*.SilkS", LayerMask::of(SILKSCREEN_BACK) | LayerMask::of(SILKSCREEN_FRONT)),
        ];
        for (name, set) in pairs {
            if remaining.0 & set.0 == set.0 {
                parts.push(name.to_string());
                remaining = LayerMask(remaining.0 & !set.0);
            }
        }
        if remaining.0 & FRONT_BACK.0 == FRONT_BACK.0 {
            parts.push("F&B.Cu".to_string());
            remaining = LayerMask(remaining.0 & !FRONT_BACK.0);
        }
        for layer in remaining.iter() {
            parts.push(quoted(&self.layer_name(layer)));
        }
        parts.join(" ")
    }

    fn open(&mut self, keyword: &str) {
        let pad = "  ".repeat(self.indent);
        let _ = write!(self.out, "{pad}({keyword}");
        self.indent += 1;
    }

    /// Closes a form opened by [`Self::open`] on its own line.
    fn close_nl(&mut self) {
        self.indent -= 1;
        let pad = "  ".repeat(self.indent);
        let _ = writeln!(self.out, "{pad})");
    }

    /// Closes a form opened by [`Self::open`] on the current line.
    fn close(&mut self) {
        self.indent -= 1;
        let _ = writeln!(self.out, ")");
    }

    fn atom(&mut self, s: &str) {
        let _ = write!(self.out, " {s}");
    }

    fn newline(&mut self) {
        let _ = writeln!(self.out);
    }

    /// Writes a one-line `(keyword values...)` child form.
    fn line(&mut self, keyword: &str, values: &str) {
        let pad = "  ".repeat(self.indent);
        let _ = writeln!(self.out, "{pad}({keyword} {values})");
    }

    fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    // --- board ------------------------------------------------------------

    fn board(&mut self, board: &Board) {
        self.open("kicad_pcb");
        self.atom(&format!("(version {})", board.version));
        self.atom(&format!(
            "(host {} {})",
            quoted(&board.host.0),
            quoted(&board.host.1)
        ));
        self.newline();
        self.blank();

        self.general(board);
        self.blank();
        self.page(board);
        self.title_block(board);
        self.blank();
        self.layers(board);
        self.blank();
        self.setup(board);
        self.blank();

        for net in board.nets.iter() {
            self.line("net", &format!("{} {}", net.code, quoted(&net.name)));
        }
        self.blank();
        for class in board.net_classes.iter() {
            self.net_class(class);
            self.blank();
        }

        for item in &board.drawings {
            match item {
                BoardItem::Drawing(segment) => self.draw_segment(segment, "gr_"),
                BoardItem::Text(text) => self.text(text),
                BoardItem::Dimension(dim) => self.dimension(dim),
                BoardItem::Target(target) => self.target(target),
                _ => {}
            }
        }
        if !board.drawings.is_empty() {
            self.blank();
        }

        for module in &board.modules {
            self.module(module);
            self.blank();
        }

        for track in board.tracks() {
            if track.is_null() {
                continue;
            }
            match track.kind {
                TrackKind::Segment => self.segment(track),
                TrackKind::Via { .. } => self.via(track),
                TrackKind::ZoneSegment => {}
            }
        }
        if board.track_count() > 0 {
            self.blank();
        }

        for zone in &board.zones {
            self.zone(zone);
            self.blank();
        }

        self.close_nl();
    }

    fn general(&mut self, board: &Board) {
        self.open("general");
        self.newline();
        self.line("links", "0");
        self.line("no_connects", "0");
        self.line("thickness", &fmt_iu(board.design_settings.board_thickness));
        self.line("drawings", &board.drawings.len().to_string());
        self.line("tracks", &board.track_count().to_string());
        self.line("zones", &board.zones.len().to_string());
        self.line("modules", &board.modules.len().to_string());
        self.line("nets", &board.nets.len().to_string());
        self.close_nl();
    }

    fn page(&mut self, board: &Board) {
        let mut values = quoted(&board.page.size_name);
        if board.page.size_name == "User" {
            values.push_str(&format!(
                " {} {}",
                fmt_iu(board.page.width),
                fmt_iu(board.page.height)
            ));
        }
        if board.page.portrait {
            values.push_str(" portrait");
        }
        self.line("page", &values);
    }

    fn title_block(&mut self, board: &Board) {
        let tb = &board.title_block;
        let empty = tb.title.is_empty()
            && tb.date.is_empty()
            && tb.revision.is_empty()
            && tb.company.is_empty()
            && tb.comments.iter().all(String::is_empty);
        if empty {
            return;
        }
        self.open("title_block");
        self.newline();
        if !tb.title.is_empty() {
            self.line("title", &quoted(&tb.title));
        }
        if !tb.date.is_empty() {
            self.line("date", &quoted(&tb.date));
        }
        if !tb.revision.is_empty() {
            self.line("rev", &quoted(&tb.revision));
        }
        if !tb.company.is_empty() {
            self.line("company", &quoted(&tb.company));
        }
        for (i, comment) in tb.comments.iter().enumerate() {
            if !comment.is_empty() {
                self.line("comment", &format!("{} {}", i + 1, quoted(comment)));
            }
        }
        self.close_nl();
    }

    fn layers(&mut self, board: &Board) {
        self.open("layers");
        self.newline();
        for info in &board.layers {
            if !board.design_settings.enabled_layers.contains(info.number) {
                continue;
            }
            let mut values = format!(
                "{} {}",
                quoted(&info.name),
                info.layer_type.as_str()
            );
            if !info.visible {
                values.push_str(" hide");
            }
            self.line(&info.number.to_string(), &values);
        }
        self.close_nl();
    }

    fn setup(&mut self, board: &Board) {
        let ds = &board.design_settings;
        let default = board.net_classes.default_class();
        self.open("setup");
        self.newline();
        self.line("trace_clearance", &fmt_iu(default.clearance));
        self.line("zone_clearance", &fmt_iu(board.zone_settings.clearance));
        self.line(
            "zone_45_only",
            if board.zone_settings.zone_45_only { "yes" } else { "no" },
        );
        self.line("trace_min", &fmt_iu(ds.track_min_width));
        for width in &ds.track_width_list {
            self.line("user_trace_width", &fmt_iu(*width));
        }
        self.line("segment_width", &fmt_iu(ds.draw_segment_width));
        self.line("edge_width", &fmt_iu(ds.edge_segment_width));
        self.line("via_size", &fmt_iu(default.via_diameter));
        self.line("via_drill", &fmt_iu(default.via_drill));
        self.line("via_min_size", &fmt_iu(ds.via_min_size));
        self.line("via_min_drill", &fmt_iu(ds.via_min_drill));
        for (size, drill) in &ds.via_dimensions_list {
            self.line("user_via", &format!("{} {}", fmt_iu(*size), fmt_iu(*drill)));
        }
        self.line("uvia_size", &fmt_iu(default.uvia_diameter));
        self.line("uvia_drill", &fmt_iu(default.uvia_drill));
        self.line("uvias_allowed", if ds.uvias_allowed { "yes" } else { "no" });
        self.line(
            "blind_buried_vias_allowed",
            if ds.blind_buried_vias_allowed { "yes" } else { "no" },
        );
        self.line("uvia_min_size", &fmt_iu(ds.uvia_min_size));
        self.line("uvia_min_drill", &fmt_iu(ds.uvia_min_drill));
        self.line("pcb_text_width", &fmt_iu(ds.pcb_text_width));
        self.line(
            "pcb_text_size",
            &format!("{} {}", fmt_iu(ds.pcb_text_size.x), fmt_iu(ds.pcb_text_size.y)),
        );
        self.line("mod_edge_width", &fmt_iu(ds.mod_edge_width));
        self.line(
            "mod_text_size",
            &format!("{} {}", fmt_iu(ds.mod_text_size.x), fmt_iu(ds.mod_text_size.y)),
        );
        self.line("mod_text_width", &fmt_iu(ds.mod_text_width));
        self.line(
            "pad_size",
            &format!("{} {}", fmt_iu(ds.pad_size.x), fmt_iu(ds.pad_size.y)),
        );
        self.line("pad_drill", &fmt_iu(ds.pad_drill));
        self.close_nl();
    }

    fn net_class(&mut self, class: &NetClass) {
        self.open("net_class");
        self.atom(&quoted(&class.name));
        self.atom(&quoted(&class.description));
        self.newline();
        self.line("clearance", &fmt_iu(class.clearance));
        self.line("trace_width", &fmt_iu(class.track_width));
        self.line("via_dia", &fmt_iu(class.via_diameter));
        self.line("via_drill", &fmt_iu(class.via_drill));
        self.line("uvia_dia", &fmt_iu(class.uvia_diameter));
        self.line("uvia_drill", &fmt_iu(class.uvia_drill));
        for net in &class.nets {
            self.line("add_net", &quoted(net));
        }
        self.close_nl();
    }

    // --- graphics ---------------------------------------------------------

    fn draw_segment(&mut self, segment: &DrawSegment, prefix: &str) {
        let keyword = match &segment.shape {
            ShapeKind::Line => "line",
            ShapeKind::Arc { .. } => "arc",
            ShapeKind::Circle => "circle",
            ShapeKind::Curve { .. } => "curve",
            ShapeKind::Polygon(_) => "poly",
        };
        self.open(&format!("{prefix}{keyword}"));
        match &segment.shape {
            ShapeKind::Line => {
                self.atom(&format!(
                    "(start {} {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y)
                ));
                self.atom(&format!(
                    "(end {} {})",
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Arc { angle } => {
                self.atom(&format!(
                    "(start {} {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y)
                ));
                self.atom(&format!(
                    "(end {} {})",
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
                self.atom(&format!("(angle {})", fmt_decideg(*angle)));
            }
            ShapeKind::Circle => {
                self.atom(&format!(
                    "(center {} {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y)
                ));
                self.atom(&format!(
                    "(end {} {})",
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                self.atom(&format!(
                    "(pts (xy {} {}) (xy {} {}) (xy {} {}) (xy {} {}))",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y),
                    fmt_iu(ctrl1.x),
                    fmt_iu(ctrl1.y),
                    fmt_iu(ctrl2.x),
                    fmt_iu(ctrl2.y),
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Polygon(points) => {
                let corners: Vec<String> = points
                    .iter()
                    .map(|p| format!("(xy {} {})", fmt_iu(p.x), fmt_iu(p.y)))
                    .collect();
                self.atom(&format!("(pts {})", corners.join(" ")));
            }
        }
        self.atom(&format!("(layer {})", quoted(&self.layer_name(segment.layer))));
        self.atom(&format!("(width {})", fmt_iu(segment.width)));
        self.atom(&format!("(tstamp {:X})", segment.tstamp));
        self.close();
    }

    fn text(&mut self, text: &TextItem) {
        self.open("gr_text");
        self.atom(&quoted(&text.text));
        let mut at = format!("(at {} {}", fmt_iu(text.position.x), fmt_iu(text.position.y));
        if text.orientation != 0 {
            at.push_str(&format!(" {}", fmt_decideg(text.orientation)));
        }
        at.push(')');
        self.atom(&at);
        self.atom(&format!("(layer {})", quoted(&self.layer_name(text.layer))));
        self.atom(&format!("(tstamp {:X})", text.tstamp));
        self.newline();
        self.effects(text.size.x, text.size.y, text.thickness, text.italic, text.mirrored, text.visible);
        self.close_nl();
    }

    fn effects(&mut self, w: i32, h: i32, thickness: i32, italic: bool, mirrored: bool, visible: bool) {
        let pad = "  ".repeat(self.indent);
        let mut s = format!(
            "{pad}(effects (font (size {} {}) (thickness {})",
            fmt_iu(h),
            fmt_iu(w),
            fmt_iu(thickness)
        );
        if italic {
            s.push_str(" italic");
        }
        s.push(')');
        if mirrored {
            s.push_str(" (justify mirror)");
        }
        if !visible {
            s.push_str(" hide");
        }
        s.push(')');
        let _ = writeln!(self.out, "{s}");
    }

    fn dimension(&mut self, dim: &Dimension) {
        self.open("dimension");
        self.atom(&fmt_iu(dim.value));
        self.atom(&format!("(width {})", fmt_iu(dim.width)));
        self.atom(&format!("(layer {})", quoted(&self.layer_name(dim.layer))));
        self.atom(&format!("(tstamp {:X})", dim.tstamp));
        self.newline();
        self.text_as(&dim.text, "gr_text");
        for (keyword, stroke) in [
            ("crossbar", dim.crossbar),
            ("feature1", dim.feature1),
            ("feature2", dim.feature2),
            ("arrow1a", dim.arrow1a),
            ("arrow1b", dim.arrow1b),
            ("arrow2a", dim.arrow2a),
            ("arrow2b", dim.arrow2b),
        ] {
            self.line(
                keyword,
                &format!(
                    "(pts (xy {} {}) (xy {} {}))",
                    fmt_iu(stroke.0.x),
                    fmt_iu(stroke.0.y),
                    fmt_iu(stroke.1.x),
                    fmt_iu(stroke.1.y)
                ),
            );
        }
        self.close_nl();
    }

    /// Same body as [`Self::text`] but without a tstamp, for dimension
    /// texts whose identity is the dimension's.
    fn text_as(&mut self, text: &TextItem, keyword: &str) {
        self.open(keyword);
        self.atom(&quoted(&text.text));
        let mut at = format!("(at {} {}", fmt_iu(text.position.x), fmt_iu(text.position.y));
        if text.orientation != 0 {
            at.push_str(&format!(" {}", fmt_decideg(text.orientation)));
        }
        at.push(')');
        self.atom(&at);
        self.atom(&format!("(layer {})", quoted(&self.layer_name(text.layer))));
        self.newline();
        self.effects(text.size.x, text.size.y, text.thickness, text.italic, text.mirrored, text.visible);
        self.close_nl();
    }

    fn target(&mut self, target: &Target) {
        self.open("target");
        self.atom(match target.shape {
            TargetShape::Plus => "plus",
            TargetShape::X => "x",
        });
        self.atom(&format!(
            "(at {} {})",
            fmt_iu(target.position.x),
            fmt_iu(target.position.y)
        ));
        self.atom(&format!("(size {})", fmt_iu(target.size)));
        self.atom(&format!("(width {})", fmt_iu(target.width)));
        self.atom(&format!("(layer {})", quoted(&self.layer_name(target.layer))));
        self.atom(&format!("(tstamp {:X})", target.tstamp));
        self.close();
    }

    // --- modules ----------------------------------------------------------

    fn module(&mut self, module: &Module) {
        self.open("module");
        self.atom(&quoted(&module.name));
        if module.locked {
            self.atom("locked");
        }
        self.atom(&format!("(layer {})", quoted(&self.layer_name(module.layer))));
        self.atom(&format!("(tstamp {:X})", module.tstamp));
        self.newline();
        let mut at = format!(
            "{} {}",
            fmt_iu(module.position.x),
            fmt_iu(module.position.y)
        );
        if module.orientation != 0 {
            at.push_str(&format!(" {}", fmt_decideg(module.orientation)));
        }
        self.line("at", &at);
        if !module.description.is_empty() {
            self.line("descr", &quoted(&module.description));
        }
        if !module.tags.is_empty() {
            self.line("tags", &quoted(&module.tags));
        }
        if !module.path.is_empty() {
            self.line("path", &quoted(&module.path));
        }
        match module.attr {
            ModuleAttr::ThroughHole => {}
            ModuleAttr::Smd => self.line("attr", "smd"),
            ModuleAttr::Virtual => self.line("attr", "virtual"),
        }
        self.module_text(&module.reference);
        self.module_text(&module.value);
        for text in &module.texts {
            self.module_text(text);
        }
        for edge in &module.edges {
            let segment = DrawSegment {
                tstamp: 0,
                shape: edge.shape.clone(),
                start: edge.start,
                end: edge.end,
                width: edge.width,
                layer: edge.layer,
            };
            self.fp_shape(&segment);
        }
        for pad in &module.pads {
            self.pad(pad);
        }
        if let Some(model) = &module.model {
            self.model(model);
        }
        self.close_nl();
    }

    fn module_text(&mut self, text: &ModuleText) {
        self.open("fp_text");
        self.atom(match text.kind {
            ModuleTextKind::Reference => "reference",
            ModuleTextKind::Value => "value",
            ModuleTextKind::User => "user",
        });
        self.atom(&quoted(&text.text));
        let mut at = format!("(at {} {}", fmt_iu(text.offset.x), fmt_iu(text.offset.y));
        if text.orientation != 0 {
            at.push_str(&format!(" {}", fmt_decideg(text.orientation)));
        }
        at.push(')');
        self.atom(&at);
        self.atom(&format!("(layer {})", quoted(&self.layer_name(text.layer))));
        if !text.visible {
            self.atom("hide");
        }
        self.newline();
        self.effects(text.size.x, text.size.y, text.thickness, text.italic, false, true);
        self.close_nl();
    }

    /// Writes one module edge; same grammar as board graphics with the
    /// `fp_` prefix and no tstamp.
    fn fp_shape(&mut self, segment: &DrawSegment) {
        let keyword = match &segment.shape {
            ShapeKind::Line => "fp_line",
            ShapeKind::Arc { .. } => "fp_arc",
            ShapeKind::Circle => "fp_circle",
            ShapeKind::Curve { .. } => "fp_curve",
            ShapeKind::Polygon(_) => "fp_poly",
        };
        let mut values = String::new();
        match &segment.shape {
            ShapeKind::Line => {
                values.push_str(&format!(
                    "(start {} {}) (end {} {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y),
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Arc { angle } => {
                values.push_str(&format!(
                    "(start {} {}) (end {} {}) (angle {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y),
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y),
                    fmt_decideg(*angle)
                ));
            }
            ShapeKind::Circle => {
                values.push_str(&format!(
                    "(center {} {}) (end {} {})",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y),
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                values.push_str(&format!(
                    "(pts (xy {} {}) (xy {} {}) (xy {} {}) (xy {} {}))",
                    fmt_iu(segment.start.x),
                    fmt_iu(segment.start.y),
                    fmt_iu(ctrl1.x),
                    fmt_iu(ctrl1.y),
                    fmt_iu(ctrl2.x),
                    fmt_iu(ctrl2.y),
                    fmt_iu(segment.end.x),
                    fmt_iu(segment.end.y)
                ));
            }
            ShapeKind::Polygon(points) => {
                let corners: Vec<String> = points
                    .iter()
                    .map(|p| format!("(xy {} {})", fmt_iu(p.x), fmt_iu(p.y)))
                    .collect();
                values.push_str(&format!("(pts {})", corners.join(" ")));
            }
        }
        values.push_str(&format!(
            " (layer {}) (width {})",
            quoted(&self.layer_name(segment.layer)),
            fmt_iu(segment.width)
        ));
        self.line(keyword, &values);
    }

    fn pad(&mut self, pad: &Pad) {
        self.open("pad");
        self.atom(&quoted(&pad.name));
        self.atom(match pad.attribute {
            PadAttribute::ThruHole => "thru_hole",
            PadAttribute::Smd => "smd",
            PadAttribute::Connect => "connect",
            PadAttribute::NpThruHole => "np_thru_hole",
        });
        self.atom(match pad.shape {
            PadShape::Circle => "circle",
            PadShape::Rect => "rect",
            PadShape::Oval => "oval",
            PadShape::Trapezoid => "trapezoid",
        });
        let mut at = format!("(at {} {}", fmt_iu(pad.offset.x), fmt_iu(pad.offset.y));
        if pad.orientation != 0 {
            at.push_str(&format!(" {}", fmt_decideg(pad.orientation)));
        }
        at.push(')');
        self.atom(&at);
        self.atom(&format!(
            "(size {} {})",
            fmt_iu(pad.size.x),
            fmt_iu(pad.size.y)
        ));
        if pad.delta != boardkit_core::geometry::Point::default() {
            self.atom(&format!(
                "(rect_delta {} {})",
                fmt_iu(pad.delta.x),
                fmt_iu(pad.delta.y)
            ));
        }
        if pad.drill.size != 0 {
            let mut drill = String::from("(drill ");
            if pad.drill.slot != 0 {
                drill.push_str(&format!(
                    "oval {} {}",
                    fmt_iu(pad.drill.size),
                    fmt_iu(pad.drill.slot)
                ));
            } else {
                drill.push_str(&fmt_iu(pad.drill.size));
            }
            if pad.drill.offset != boardkit_core::geometry::Point::default() {
                drill.push_str(&format!(
                    " (offset {} {})",
                    fmt_iu(pad.drill.offset.x),
                    fmt_iu(pad.drill.offset.y)
                ));
            }
            drill.push(')');
            self.atom(&drill);
        }
        self.atom(&format!("(layers {})", self.mask_names(pad.layers)));
        if pad.net != 0 {
            self.atom(&format!("(net {} {})", pad.net, quoted(&pad.net_name)));
        }
        self.close();
    }

    fn model(&mut self, model: &Model3D) {
        self.open("model");
        self.atom(&quoted(&model.path));
        self.newline();
        for (keyword, values) in [
            ("at", &model.at),
            ("scale", &model.scale),
            ("rotate", &model.rotate),
        ] {
            self.line(
                keyword,
                &format!(
                    "(xyz {} {} {})",
                    fmt_f64(values[0]),
                    fmt_f64(values[1]),
                    fmt_f64(values[2])
                ),
            );
        }
        self.close_nl();
    }

    // --- tracks, vias, zones ----------------------------------------------

    fn segment(&mut self, track: &Track) {
        self.open("segment");
        self.atom(&format!(
            "(start {} {})",
            fmt_iu(track.start.x),
            fmt_iu(track.start.y)
        ));
        self.atom(&format!(
            "(end {} {})",
            fmt_iu(track.end.x),
            fmt_iu(track.end.y)
        ));
        self.atom(&format!("(width {})", fmt_iu(track.width)));
        self.atom(&format!("(layer {})", quoted(&self.layer_name(track.layer))));
        self.atom(&format!("(net {})", track.net));
        self.atom(&format!("(tstamp {:X})", track.tstamp));
        if track.status != 0 {
            self.atom(&format!("(status {:X})", track.status));
        }
        self.close();
    }

    fn via(&mut self, via: &Track) {
        self.open("via");
        if let TrackKind::Via { via_type, drill } = &via.kind {
            match via_type {
                ViaType::Through => {}
                ViaType::BlindBuried => self.atom("blind"),
                ViaType::Micro => self.atom("micro"),
            }
            self.atom(&format!(
                "(at {} {})",
                fmt_iu(via.start.x),
                fmt_iu(via.start.y)
            ));
            self.atom(&format!("(size {})", fmt_iu(via.width)));
            if *drill != 0 {
                self.atom(&format!("(drill {})", fmt_iu(*drill)));
            }
            let (top, bottom) = via.layer_pair();
            self.atom(&format!(
                "(layers {} {})",
                quoted(&self.layer_name(top)),
                quoted(&self.layer_name(bottom))
            ));
            self.atom(&format!("(net {})", via.net));
            self.atom(&format!("(tstamp {:X})", via.tstamp));
            if via.status != 0 {
                self.atom(&format!("(status {:X})", via.status));
            }
        }
        self.close();
    }

    fn zone(&mut self, zone: &Zone) {
        self.open("zone");
        self.atom(&format!("(net {})", zone.net));
        self.atom(&format!("(net_name {})", quoted(&zone.net_name)));
        self.atom(&format!("(layer {})", quoted(&self.layer_name(zone.layer))));
        self.atom(&format!("(tstamp {:X})", zone.tstamp));
        let hatch = match zone.hatch_style {
            HatchStyle::None => "none",
            HatchStyle::Edge => "edge",
            HatchStyle::Full => "full",
        };
        self.atom(&format!("(hatch {} {})", hatch, fmt_iu(zone.hatch_pitch)));
        self.newline();
        if zone.priority > 0 {
            self.line("priority", &zone.priority.to_string());
        }
        let connect = match zone.connect_pads {
            PadConnection::Thermal => String::new(),
            PadConnection::Solid => "yes ".to_string(),
            PadConnection::ThermalReliefsForThtOnly => "thru_hole_only ".to_string(),
            PadConnection::None => "no ".to_string(),
        };
        self.line(
            "connect_pads",
            &format!("{connect}(clearance {})", fmt_iu(zone.clearance)),
        );
        self.line("min_thickness", &fmt_iu(zone.min_thickness));
        if let Some(keepout) = &zone.keepout {
            let allowed = |b: bool| if b { "not_allowed" } else { "allowed" };
            self.line(
                "keepout",
                &format!(
                    "(tracks {}) (vias {}) (copperpour {})",
                    allowed(keepout.no_tracks),
                    allowed(keepout.no_vias),
                    allowed(keepout.no_copper_pour)
                ),
            );
        }
        let mode = match zone.fill_mode {
            FillMode::Polygons => String::new(),
            FillMode::Segments => "(mode segment) ".to_string(),
        };
        self.line(
            "fill",
            &format!(
                "{}{mode}(arc_segments {}) (thermal_gap {}) (thermal_bridge_width {})",
                if zone.is_filled { "yes " } else { "" },
                zone.arc_segments,
                fmt_iu(zone.thermal_gap),
                fmt_iu(zone.thermal_bridge_width)
            ),
        );
        self.contour("polygon", &zone.outline.0);
        for hole in &zone.holes {
            self.contour("polygon", &hole.0);
        }
        for poly in &zone.filled_polys {
            self.contour("filled_polygon", poly);
        }
        self.close_nl();
    }

    fn contour(&mut self, keyword: &str, points: &[boardkit_core::geometry::Point]) {
        self.open(keyword);
        self.newline();
        self.open("pts");
        self.newline();
        let pad = "  ".repeat(self.indent);
        for chunk in points.chunks(4) {
            let row: Vec<String> = chunk
                .iter()
                .map(|p| format!("(xy {} {})", fmt_iu(p.x), fmt_iu(p.y)))
                .collect();
            let _ = writeln!(self.out, "{pad}{}", row.join(" "));
        }
        self.close_nl();
        self.close_nl();
    }
}

const FRONT_BACK: LayerMask = LayerMask(
    (1 << LAYER_BACK) | (1 << LAYER_FRONT),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_rules() {
        assert_eq!(quoted("GND"), "GND");
        assert_eq!(quoted(""), "\"\"");
        assert_eq!(quoted("net 1"), "\"net 1\"");
        assert_eq!(quoted("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn float_trimming() {
        assert_eq!(fmt_f64(1.0), "1");
        assert_eq!(fmt_f64(0.5), "0.5");
        assert_eq!(fmt_f64(-0.000_000_4), "0");
    }
}
