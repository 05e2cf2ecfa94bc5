//! Recursive-descent parser for the s-expression board format.
//!
//! One private routine per grammar production. Every routine consumes its
//! own closing parenthesis unless its doc says the caller does; that
//! contract is what keeps the token stream synchronized across the
//! recursion.
//!
//! Distances are converted from millimeters to internal units at the point
//! of each numeric read. Layer names resolve through [`LayerTables`] seeded
//! with the canonical defaults before the board's own `layers` section is
//! read, so standalone footprints parse without a board context.

use boardkit_board::board::Board;
use boardkit_board::drawing::{
    Dimension, DrawSegment, ShapeKind, Target, TargetShape, TextItem,
};
use boardkit_board::item::BoardItem;
use boardkit_board::module::{Model3D, Module, ModuleAttr, ModuleText, ModuleTextKind};
use boardkit_board::netinfo::NetClass;
use boardkit_board::pad::{Pad, PadAttribute, PadDrill, PadShape};
use boardkit_board::settings::{LayerInfo, LayerType};
use boardkit_board::track::{Track, TrackKind, ViaType};
use boardkit_board::zone::{Contour, FillMode, HatchStyle, KeepoutParams, PadConnection, Zone};
use boardkit_core::geometry::Point;
use boardkit_core::layer::{LayerMask, LayerNum, LayerTables};
use boardkit_core::units::{deg_to_decideg, mm_to_iu};
use tracing::warn;

use crate::error::ParseError;
use crate::lexer::{Lexer, Tok};

/// Result of parsing one board stream: either a full board or a single
/// standalone footprint, the two supported root productions.
#[derive(Debug)]
pub enum ParsedItem {
    Board(Box<Board>),
    Module(Box<Module>),
}

/// Parses a complete board or footprint file from text.
pub fn parse_board_text(text: &str, source_name: &str) -> Result<ParsedItem, ParseError> {
    let mut parser = PcbParser::new(text, source_name);
    parser.parse()
}

struct PcbParser<'a> {
    lex: Lexer<'a>,
    tables: LayerTables,
}

impl<'a> PcbParser<'a> {
    fn new(text: &'a str, source_name: &str) -> Self {
        Self {
            lex: Lexer::new(text, source_name),
            tables: LayerTables::new(),
        }
    }

    fn parse(&mut self) -> Result<ParsedItem, ParseError> {
        if self.lex.next_tok()? != Tok::Left {
            return Err(self.lex.expecting("("));
        }
        self.lex.need_sym()?;
        match self.lex.cur_text() {
            "kicad_pcb" => Ok(ParsedItem::Board(Box::new(self.parse_board()?))),
            "module" => Ok(ParsedItem::Module(Box::new(self.parse_module()?))),
            _ => Err(self.lex.expecting("kicad_pcb or module")),
        }
    }

    // --- primitive readers -----------------------------------------------

    fn read_double(&mut self, what: &str) -> Result<f64, ParseError> {
        self.lex.need_sym()?;
        self.lex
            .cur_text()
            .parse::<f64>()
            .map_err(|_| self.lex.error(&format!("invalid floating point number in {what}")))
    }

    /// Reads one distance in millimeters, converted to internal units.
    fn read_units(&mut self, what: &str) -> Result<i32, ParseError> {
        Ok(mm_to_iu(self.read_double(what)?))
    }

    fn read_int(&mut self, what: &str) -> Result<i32, ParseError> {
        self.lex.need_sym()?;
        self.lex
            .cur_text()
            .parse::<i32>()
            .map_err(|_| self.lex.error(&format!("invalid integer in {what}")))
    }

    fn read_hex(&mut self, what: &str) -> Result<u64, ParseError> {
        self.lex.need_sym()?;
        u64::from_str_radix(self.lex.cur_text(), 16)
            .map_err(|_| self.lex.error(&format!("invalid hexadecimal number in {what}")))
    }

    fn read_bool(&mut self) -> Result<bool, ParseError> {
        self.lex.need_sym()?;
        match self.lex.cur_text() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            _ => Err(self.lex.expecting("yes or no")),
        }
    }

    /// Reads `x y` distances; the caller handles the surrounding parens.
    fn read_point(&mut self, what: &str) -> Result<Point, ParseError> {
        let x = self.read_units(what)?;
        let y = self.read_units(what)?;
        Ok(Point::new(x, y))
    }

    /// Parses a full `(xy X Y)` form.
    fn parse_xy(&mut self) -> Result<Point, ParseError> {
        self.lex.need_left()?;
        self.lex.need_sym()?;
        if self.lex.cur_text() != "xy" {
            return Err(self.lex.expecting("xy"));
        }
        let p = self.read_point("xy")?;
        self.lex.need_right()?;
        Ok(p)
    }

    /// Parses the tail of an `(at X Y [ANGLE])` form, closing paren
    /// included. Returns position and angle in decidegrees.
    fn parse_at_tail(&mut self) -> Result<(Point, i32), ParseError> {
        let pos = self.read_point("at")?;
        match self.lex.next_tok()? {
            Tok::Right => Ok((pos, 0)),
            Tok::Sym => {
                let angle = self
                    .lex
                    .cur_text()
                    .parse::<f64>()
                    .map_err(|_| self.lex.error("invalid floating point number in at"))?;
                self.lex.need_right()?;
                Ok((pos, deg_to_decideg(angle)))
            }
            _ => Err(self.lex.expecting("an angle or )")),
        }
    }

    /// Reads one layer name and resolves it; the caller handles the
    /// closing paren.
    fn read_item_layer(&mut self) -> Result<LayerNum, ParseError> {
        self.lex.need_sym()?;
        let name = self.lex.cur_text().to_string();
        self.tables.index(&name).ok_or_else(|| {
            self.lex
                .error(&format!("layer \"{name}\" was not defined in the layers section"))
        })
    }

    /// Reads layer names until the closing paren, accumulating a mask.
    /// Wildcard set names expand here.
    fn read_layer_mask(&mut self) -> Result<LayerMask, ParseError> {
        let mut mask = LayerMask::NONE;
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(mask),
                Tok::Sym => {
                    let name = self.lex.cur_text().to_string();
                    let m = self.tables.mask(&name).ok_or_else(|| {
                        self.lex.error(&format!(
                            "layer \"{name}\" was not defined in the layers section"
                        ))
                    })?;
                    mask |= m;
                }
                _ => return Err(self.lex.expecting("a layer name or )")),
            }
        }
    }

    /// Reads a `(pts (xy ...) ...)` corner list, closing paren included.
    fn parse_pts(&mut self) -> Result<Vec<Point>, ParseError> {
        self.lex.need_left()?;
        self.lex.need_sym()?;
        if self.lex.cur_text() != "pts" {
            return Err(self.lex.expecting("pts"));
        }
        let mut points = Vec::new();
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {
                    self.lex.need_sym()?;
                    if self.lex.cur_text() != "xy" {
                        return Err(self.lex.expecting("xy"));
                    }
                    points.push(self.read_point("xy")?);
                    self.lex.need_right()?;
                }
                _ => return Err(self.lex.expecting("( or )")),
            }
        }
        Ok(points)
    }

    // --- board root -------------------------------------------------------

    /// Parses the body of `(kicad_pcb ...)`; the opening keyword has been
    /// consumed, the closing paren is consumed here.
    fn parse_board(&mut self) -> Result<Board, ParseError> {
        let mut board = Board::new();
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "version" => {
                    board.version = self.read_int("version")?;
                    self.lex.need_right()?;
                }
                "host" => {
                    self.lex.need_sym()?;
                    let name = self.lex.cur_text().to_string();
                    self.lex.need_sym()?;
                    board.host = (name, self.lex.cur_text().to_string());
                    self.lex.need_right()?;
                }
                "general" => self.parse_general(&mut board)?,
                "page" => self.parse_page(&mut board)?,
                "title_block" => self.parse_title_block(&mut board)?,
                "layers" => self.parse_layers(&mut board)?,
                "setup" => self.parse_setup(&mut board)?,
                "net" => self.parse_net(&mut board)?,
                "net_class" => self.parse_net_class(&mut board)?,
                "gr_line" | "gr_arc" | "gr_circle" | "gr_curve" | "gr_poly" => {
                    let keyword = self.lex.cur_text().to_string();
                    let segment = self.parse_draw_segment(&keyword)?;
                    board.drawings.push(BoardItem::Drawing(segment));
                }
                "gr_text" => {
                    let text = self.parse_text()?;
                    board.drawings.push(BoardItem::Text(text));
                }
                "dimension" => {
                    let dim = self.parse_dimension()?;
                    board.drawings.push(BoardItem::Dimension(dim));
                }
                "target" => {
                    let target = self.parse_target()?;
                    board.drawings.push(BoardItem::Target(target));
                }
                "module" => {
                    let module = self.parse_module()?;
                    board.modules.push(module);
                }
                "segment" => {
                    let track = self.parse_track(&board)?;
                    board.add_track(track);
                }
                "via" => {
                    let via = self.parse_via(&board)?;
                    board.add_track(via);
                }
                "zone" => {
                    let zone = self.parse_zone(&board)?;
                    board.add_zone(zone);
                }
                _ => {
                    return Err(self.lex.expecting(
                        "general, page, title_block, layers, setup, net, net_class, \
                         gr_line, gr_arc, gr_circle, gr_curve, gr_poly, gr_text, \
                         dimension, module, segment, via, zone, or target",
                    ))
                }
            }
        }
        Ok(board)
    }

    /// The `general` section is informational and deliberately tolerant:
    /// unknown keys are skipped by consuming balanced parens.
    fn parse_general(&mut self, board: &mut Board) -> Result<(), ParseError> {
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(()),
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "thickness" => {
                    board.design_settings.board_thickness = self.read_units("thickness")?;
                    self.lex.need_right()?;
                }
                // Item counters and areas are derivable; skip them.
                "links" | "no_connects" | "area" | "drawings" | "tracks" | "zones"
                | "modules" | "nets" => {
                    self.lex.skip_balanced()?;
                }
                other => {
                    warn!(key = other, "skipping unknown key in general section");
                    self.lex.skip_balanced()?;
                }
            }
        }
    }

    fn parse_page(&mut self, board: &mut Board) -> Result<(), ParseError> {
        self.lex.need_sym()?;
        board.page.size_name = self.lex.cur_text().to_string();
        if board.page.size_name == "User" {
            board.page.width = self.read_units("page width")?;
            board.page.height = self.read_units("page height")?;
        }
        match self.lex.next_tok()? {
            Tok::Right => Ok(()),
            Tok::Sym if self.lex.cur_text() == "portrait" => {
                board.page.portrait = true;
                self.lex.need_right()
            }
            _ => Err(self.lex.expecting("portrait or )")),
        }
    }

    fn parse_title_block(&mut self, board: &mut Board) -> Result<(), ParseError> {
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(()),
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "title" => {
                    self.lex.need_sym()?;
                    board.title_block.title = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "date" => {
                    self.lex.need_sym()?;
                    board.title_block.date = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "rev" => {
                    self.lex.need_sym()?;
                    board.title_block.revision = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "company" => {
                    self.lex.need_sym()?;
                    board.title_block.company = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "comment" => {
                    let number = self.read_int("comment number")?;
                    if !(1..=4).contains(&number) {
                        return Err(self
                            .lex
                            .error(&format!("{number} is not a valid title block comment number")));
                    }
                    self.lex.need_sym()?;
                    board.title_block.comments[(number - 1) as usize] =
                        self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                _ => return Err(self.lex.expecting("title, date, rev, company, or comment")),
            }
        }
    }

    fn parse_layers(&mut self, board: &mut Board) -> Result<(), ParseError> {
        let mut enabled = LayerMask::NONE;
        let mut visible = LayerMask::NONE;
        let mut copper_count = 0;

        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            let number = self.read_int("layer index")?;
            self.lex.need_sym()?;
            let name = self.lex.cur_text().to_string();
            self.lex.need_sym()?;
            let layer_type = LayerType::parse(self.lex.cur_text())
                .ok_or_else(|| self.lex.expecting("signal, power, mixed, jumper, or user"))?;
            let is_visible = match self.lex.next_tok()? {
                Tok::Right => true,
                Tok::Sym if self.lex.cur_text() == "hide" => {
                    self.lex.need_right()?;
                    false
                }
                _ => return Err(self.lex.expecting("hide or )")),
            };

            enabled.insert(number);
            if is_visible {
                visible.insert(number);
            }
            self.tables.define(&name, number);
            board.set_layer_info(LayerInfo {
                number,
                name,
                layer_type,
                visible: is_visible,
            });
            if layer_type.is_copper() {
                copper_count += 1;
            }
        }

        // At least 2 copper layers, and an even number of them.
        if copper_count < 2 || copper_count % 2 != 0 {
            return Err(self
                .lex
                .error(&format!("{copper_count} is not a valid layer count")));
        }
        board.design_settings.copper_layer_count = copper_count;
        board.design_settings.enabled_layers = enabled;
        board.design_settings.visible_layers = visible;
        Ok(())
    }

    fn parse_setup(&mut self, board: &mut Board) -> Result<(), ParseError> {
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(()),
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            let ds = &mut board.design_settings;
            match self.lex.cur_text() {
                "last_trace_width" => {
                    self.read_units("last_trace_width")?;
                    self.lex.need_right()?;
                }
                "user_trace_width" => {
                    let w = self.read_units("user_trace_width")?;
                    ds.track_width_list.push(w);
                    self.lex.need_right()?;
                }
                "trace_clearance" => {
                    let c = self.read_units("trace_clearance")?;
                    board.net_classes.default_class_mut().clearance = c;
                    self.lex.need_right()?;
                }
                "zone_clearance" => {
                    board.zone_settings.clearance = self.read_units("zone_clearance")?;
                    self.lex.need_right()?;
                }
                "zone_45_only" => {
                    board.zone_settings.zone_45_only = self.read_bool()?;
                    self.lex.need_right()?;
                }
                "trace_min" => {
                    ds.track_min_width = self.read_units("trace_min")?;
                    self.lex.need_right()?;
                }
                "segment_width" => {
                    ds.draw_segment_width = self.read_units("segment_width")?;
                    self.lex.need_right()?;
                }
                "edge_width" => {
                    ds.edge_segment_width = self.read_units("edge_width")?;
                    self.lex.need_right()?;
                }
                "via_size" => {
                    let v = self.read_units("via_size")?;
                    board.net_classes.default_class_mut().via_diameter = v;
                    self.lex.need_right()?;
                }
                "via_drill" => {
                    let v = self.read_units("via_drill")?;
                    board.net_classes.default_class_mut().via_drill = v;
                    self.lex.need_right()?;
                }
                "via_min_size" => {
                    ds.via_min_size = self.read_units("via_min_size")?;
                    self.lex.need_right()?;
                }
                "via_min_drill" => {
                    ds.via_min_drill = self.read_units("via_min_drill")?;
                    self.lex.need_right()?;
                }
                "user_via" => {
                    let size = self.read_units("user via size")?;
                    let drill = self.read_units("user via drill")?;
                    ds.via_dimensions_list.push((size, drill));
                    self.lex.need_right()?;
                }
                "uvia_size" => {
                    let v = self.read_units("uvia_size")?;
                    board.net_classes.default_class_mut().uvia_diameter = v;
                    self.lex.need_right()?;
                }
                "uvia_drill" => {
                    let v = self.read_units("uvia_drill")?;
                    board.net_classes.default_class_mut().uvia_drill = v;
                    self.lex.need_right()?;
                }
                "uvias_allowed" => {
                    ds.uvias_allowed = self.read_bool()?;
                    self.lex.need_right()?;
                }
                "blind_buried_vias_allowed" => {
                    ds.blind_buried_vias_allowed = self.read_bool()?;
                    self.lex.need_right()?;
                }
                "uvia_min_size" => {
                    ds.uvia_min_size = self.read_units("uvia_min_size")?;
                    self.lex.need_right()?;
                }
                "uvia_min_drill" => {
                    ds.uvia_min_drill = self.read_units("uvia_min_drill")?;
                    self.lex.need_right()?;
                }
                "pcb_text_width" => {
                    ds.pcb_text_width = self.read_units("pcb_text_width")?;
                    self.lex.need_right()?;
                }
                "pcb_text_size" => {
                    ds.pcb_text_size = self.read_point("pcb_text_size")?;
                    self.lex.need_right()?;
                }
                "mod_edge_width" => {
                    ds.mod_edge_width = self.read_units("mod_edge_width")?;
                    self.lex.need_right()?;
                }
                "mod_text_size" => {
                    ds.mod_text_size = self.read_point("mod_text_size")?;
                    self.lex.need_right()?;
                }
                "mod_text_width" => {
                    ds.mod_text_width = self.read_units("mod_text_width")?;
                    self.lex.need_right()?;
                }
                "pad_size" => {
                    ds.pad_size = self.read_point("pad_size")?;
                    self.lex.need_right()?;
                }
                "pad_drill" => {
                    ds.pad_drill = self.read_units("pad_drill")?;
                    self.lex.need_right()?;
                }
                // Plot parameters and origins are outside this core.
                "pcbplotparams" | "aux_axis_origin" | "grid_origin" | "visible_elements"
                | "pad_to_mask_clearance" | "pad_to_paste_clearance" => {
                    self.lex.skip_balanced()?;
                }
                _ => {
                    return Err(self.lex.expecting(
                        "a setup key (trace_clearance, zone_clearance, trace_min, \
                         via_size, via_drill, uvia_size, ... )",
                    ))
                }
            }
        }
    }

    fn parse_net(&mut self, board: &mut Board) -> Result<(), ParseError> {
        let code = self.read_int("net number")?;
        self.lex.need_sym()?;
        let name = self.lex.cur_text().to_string();
        self.lex.need_right()?;
        // Net 0 is pre-seeded as the reserved unconnected net.
        if code == 0 && name.is_empty() {
            return Ok(());
        }
        board
            .nets
            .add(code, &name)
            .map_err(|e| self.lex.error(&e.to_string()))
    }

    fn parse_net_class(&mut self, board: &mut Board) -> Result<(), ParseError> {
        self.lex.need_sym()?;
        let mut class = NetClass::new(self.lex.cur_text());
        self.lex.need_sym()?;
        class.description = self.lex.cur_text().to_string();

        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "clearance" => class.clearance = self.read_units("clearance")?,
                "trace_width" => class.track_width = self.read_units("trace_width")?,
                "via_dia" => class.via_diameter = self.read_units("via_dia")?,
                "via_drill" => class.via_drill = self.read_units("via_drill")?,
                "uvia_dia" => class.uvia_diameter = self.read_units("uvia_dia")?,
                "uvia_drill" => class.uvia_drill = self.read_units("uvia_drill")?,
                "add_net" => {
                    self.lex.need_sym()?;
                    class.nets.push(self.lex.cur_text().to_string());
                }
                _ => {
                    return Err(self.lex.expecting(
                        "clearance, trace_width, via_dia, via_drill, uvia_dia, \
                         uvia_drill, or add_net",
                    ))
                }
            }
            self.lex.need_right()?;
        }

        if class.name == boardkit_board::netinfo::DEFAULT_CLASS {
            let nets = std::mem::take(&mut class.nets);
            let default = board.net_classes.default_class_mut();
            default.description = class.description;
            default.clearance = class.clearance;
            default.track_width = class.track_width;
            default.via_diameter = class.via_diameter;
            default.via_drill = class.via_drill;
            default.uvia_diameter = class.uvia_diameter;
            default.uvia_drill = class.uvia_drill;
            for net in nets {
                board
                    .net_classes
                    .assign_net(&net, boardkit_board::netinfo::DEFAULT_CLASS);
            }
            Ok(())
        } else {
            board
                .net_classes
                .add(class)
                .map_err(|e| self.lex.error(&e.to_string()))
        }
    }

    // --- graphics ---------------------------------------------------------

    fn parse_draw_segment(&mut self, keyword: &str) -> Result<DrawSegment, ParseError> {
        let mut segment = DrawSegment::new_line(Point::default(), Point::default(), 0, 0);
        segment.shape = match keyword {
            "gr_line" => ShapeKind::Line,
            "gr_arc" => ShapeKind::Arc { angle: 0 },
            "gr_circle" => ShapeKind::Circle,
            "gr_curve" => ShapeKind::Curve {
                ctrl1: Point::default(),
                ctrl2: Point::default(),
            },
            _ => ShapeKind::Polygon(Vec::new()),
        };

        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "start" | "center" => {
                    segment.start = self.read_point("start")?;
                    self.lex.need_right()?;
                }
                "end" => {
                    segment.end = self.read_point("end")?;
                    self.lex.need_right()?;
                }
                "angle" => {
                    let angle = deg_to_decideg(self.read_double("angle")?);
                    if let ShapeKind::Arc { angle: a } = &mut segment.shape {
                        *a = angle;
                    }
                    self.lex.need_right()?;
                }
                "pts" => {
                    // parse_pts expects the opening form; rewind by hand:
                    // we already consumed "(pts", so read corners inline.
                    let mut points = Vec::new();
                    loop {
                        match self.lex.next_tok()? {
                            Tok::Right => break,
                            Tok::Left => {
                                self.lex.need_sym()?;
                                if self.lex.cur_text() != "xy" {
                                    return Err(self.lex.expecting("xy"));
                                }
                                points.push(self.read_point("xy")?);
                                self.lex.need_right()?;
                            }
                            _ => return Err(self.lex.expecting("( or )")),
                        }
                    }
                    match &mut segment.shape {
                        ShapeKind::Curve { ctrl1, ctrl2 } => {
                            if points.len() != 4 {
                                return Err(self
                                    .lex
                                    .error("a curve needs exactly 4 control points"));
                            }
                            segment.start = points[0];
                            *ctrl1 = points[1];
                            *ctrl2 = points[2];
                            segment.end = points[3];
                        }
                        ShapeKind::Polygon(corners) => *corners = points,
                        _ => return Err(self.lex.error("pts is only valid for curves and polygons")),
                    }
                }
                "layer" => {
                    segment.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "width" => {
                    segment.width = self.read_units("width")?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    segment.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                _ => {
                    return Err(self
                        .lex
                        .expecting("start, end, angle, pts, layer, width, or tstamp"))
                }
            }
        }
        Ok(segment)
    }

    /// Parses the tail of a `(gr_text ...)` form (keyword consumed).
    fn parse_text(&mut self) -> Result<TextItem, ParseError> {
        self.lex.need_sym()?;
        let mut text = TextItem::new(self.lex.cur_text(), Point::default(), 0);
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "at" => {
                    let (pos, angle) = self.parse_at_tail()?;
                    text.position = pos;
                    text.orientation = angle;
                }
                "layer" => {
                    text.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    text.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                "effects" => self.parse_effects(
                    &mut text.size,
                    &mut text.thickness,
                    &mut text.italic,
                    &mut text.mirrored,
                    &mut text.visible,
                )?,
                _ => return Err(self.lex.expecting("at, layer, tstamp, or effects")),
            }
        }
        Ok(text)
    }

    /// Parses `(effects (font ...) [(justify ...)] [hide])` after the
    /// keyword; shared by board texts and module texts.
    fn parse_effects(
        &mut self,
        size: &mut Point,
        thickness: &mut i32,
        italic: &mut bool,
        mirrored: &mut bool,
        visible: &mut bool,
    ) -> Result<(), ParseError> {
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(()),
                Tok::Left => {
                    self.lex.need_sym()?;
                    match self.lex.cur_text() {
                        "font" => loop {
                            match self.lex.next_tok()? {
                                Tok::Right => break,
                                Tok::Left => {
                                    self.lex.need_sym()?;
                                    match self.lex.cur_text() {
                                        "size" => {
                                            let h = self.read_units("font height")?;
                                            let w = self.read_units("font width")?;
                                            *size = Point::new(w, h);
                                            self.lex.need_right()?;
                                        }
                                        "thickness" => {
                                            *thickness = self.read_units("font thickness")?;
                                            self.lex.need_right()?;
                                        }
                                        _ => return Err(self.lex.expecting("size or thickness")),
                                    }
                                }
                                Tok::Sym => match self.lex.cur_text() {
                                    "italic" => *italic = true,
                                    "bold" => {}
                                    _ => return Err(self.lex.expecting("bold or italic")),
                                },
                                _ => return Err(self.lex.expecting("size, bold, or italic")),
                            }
                        },
                        "justify" => loop {
                            match self.lex.next_tok()? {
                                Tok::Right => break,
                                Tok::Sym => match self.lex.cur_text() {
                                    "mirror" => *mirrored = true,
                                    "left" | "right" | "top" | "bottom" => {}
                                    _ => return Err(self
                                        .lex
                                        .expecting("left, right, top, bottom, or mirror")),
                                },
                                _ => {
                                    return Err(self
                                        .lex
                                        .expecting("left, right, top, bottom, or mirror"))
                                }
                            }
                        },
                        _ => return Err(self.lex.expecting("font or justify")),
                    }
                }
                Tok::Sym if self.lex.cur_text() == "hide" => *visible = false,
                _ => return Err(self.lex.expecting("font, justify, or hide")),
            }
        }
    }

    /// Parses `(pts (xy A) (xy B))` for one dimension stroke.
    fn parse_dim_line(&mut self) -> Result<(Point, Point), ParseError> {
        let points = self.parse_pts()?;
        self.lex.need_right()?;
        if points.len() != 2 {
            return Err(self.lex.error("a dimension stroke needs exactly 2 points"));
        }
        Ok((points[0], points[1]))
    }

    fn parse_dimension(&mut self) -> Result<Dimension, ParseError> {
        let value = self.read_units("dimension value")?;
        let mut dim = Dimension {
            tstamp: boardkit_board::fresh_tstamp(),
            value,
            width: 0,
            layer: 0,
            text: TextItem::new("", Point::default(), 0),
            crossbar: Default::default(),
            feature1: Default::default(),
            feature2: Default::default(),
            arrow1a: Default::default(),
            arrow1b: Default::default(),
            arrow2a: Default::default(),
            arrow2b: Default::default(),
        };
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "width" => {
                    dim.width = self.read_units("width")?;
                    self.lex.need_right()?;
                }
                "layer" => {
                    dim.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    dim.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                "gr_text" => dim.text = self.parse_text()?,
                "crossbar" => dim.crossbar = self.parse_dim_line()?,
                "feature1" => dim.feature1 = self.parse_dim_line()?,
                "feature2" => dim.feature2 = self.parse_dim_line()?,
                "arrow1a" => dim.arrow1a = self.parse_dim_line()?,
                "arrow1b" => dim.arrow1b = self.parse_dim_line()?,
                "arrow2a" => dim.arrow2a = self.parse_dim_line()?,
                "arrow2b" => dim.arrow2b = self.parse_dim_line()?,
                _ => {
                    return Err(self.lex.expecting(
                        "width, layer, tstamp, gr_text, crossbar, feature1, feature2, \
                         arrow1a, arrow1b, arrow2a, or arrow2b",
                    ))
                }
            }
        }
        Ok(dim)
    }

    fn parse_target(&mut self) -> Result<Target, ParseError> {
        self.lex.need_sym()?;
        let shape = match self.lex.cur_text() {
            "plus" => TargetShape::Plus,
            "x" => TargetShape::X,
            _ => return Err(self.lex.expecting("plus or x")),
        };
        let mut target = Target {
            tstamp: boardkit_board::fresh_tstamp(),
            shape,
            position: Point::default(),
            size: 0,
            width: 0,
            layer: boardkit_core::layer::EDGE_CUTS,
        };
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "at" => {
                    target.position = self.read_point("at")?;
                    self.lex.need_right()?;
                }
                "size" => {
                    target.size = self.read_units("size")?;
                    self.lex.need_right()?;
                }
                "width" => {
                    target.width = self.read_units("width")?;
                    self.lex.need_right()?;
                }
                "layer" => {
                    target.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    target.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                _ => return Err(self.lex.expecting("at, size, width, layer, or tstamp")),
            }
        }
        Ok(target)
    }

    // --- modules ----------------------------------------------------------

    /// Parses the body of `(module NAME ...)` (keyword consumed).
    fn parse_module(&mut self) -> Result<Module, ParseError> {
        self.lex.need_sym()?;
        let mut module = Module::new(self.lex.cur_text());
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                Tok::Sym => {
                    match self.lex.cur_text() {
                        "locked" => module.locked = true,
                        "placed" => {}
                        _ => return Err(self.lex.expecting("locked, placed, or (")),
                    }
                    continue;
                }
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "layer" => {
                    module.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "tedit" => {
                    self.read_hex("tedit")?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    module.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                "at" => {
                    let (pos, angle) = self.parse_at_tail()?;
                    module.position = pos;
                    module.orientation = angle;
                }
                "descr" => {
                    self.lex.need_sym()?;
                    module.description = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "tags" => {
                    self.lex.need_sym()?;
                    module.tags = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "path" => {
                    self.lex.need_sym()?;
                    module.path = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "attr" => {
                    self.lex.need_sym()?;
                    module.attr = match self.lex.cur_text() {
                        "smd" => ModuleAttr::Smd,
                        "virtual" => ModuleAttr::Virtual,
                        _ => return Err(self.lex.expecting("smd or virtual")),
                    };
                    self.lex.need_right()?;
                }
                "fp_text" => {
                    let text = self.parse_fp_text()?;
                    match text.kind {
                        ModuleTextKind::Reference => module.reference = text,
                        ModuleTextKind::Value => module.value = text,
                        ModuleTextKind::User => module.texts.push(text),
                    }
                }
                "fp_line" | "fp_arc" | "fp_circle" | "fp_curve" | "fp_poly" => {
                    let keyword = self.lex.cur_text().to_string();
                    let drawn = self.parse_draw_segment(&keyword.replace("fp_", "gr_"))?;
                    module.edges.push(boardkit_board::module::EdgeModule {
                        shape: drawn.shape,
                        start: drawn.start,
                        end: drawn.end,
                        width: drawn.width,
                        layer: drawn.layer,
                    });
                }
                "pad" => {
                    let pad = self.parse_pad()?;
                    module.pads.push(pad);
                }
                "model" => module.model = Some(self.parse_model()?),
                _ => {
                    return Err(self.lex.expecting(
                        "layer, tedit, tstamp, at, descr, tags, path, attr, fp_text, \
                         fp_line, fp_arc, fp_circle, fp_curve, fp_poly, pad, or model",
                    ))
                }
            }
        }
        Ok(module)
    }

    fn parse_fp_text(&mut self) -> Result<ModuleText, ParseError> {
        self.lex.need_sym()?;
        let kind = match self.lex.cur_text() {
            "reference" => ModuleTextKind::Reference,
            "value" => ModuleTextKind::Value,
            "user" => ModuleTextKind::User,
            _ => return Err(self.lex.expecting("reference, value, or user")),
        };
        self.lex.need_sym()?;
        let mut text = ModuleText::new(kind, self.lex.cur_text());
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                Tok::Sym if self.lex.cur_text() == "hide" => {
                    text.visible = false;
                    continue;
                }
                _ => return Err(self.lex.expecting("( or hide")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "at" => {
                    let (pos, angle) = self.parse_at_tail()?;
                    text.offset = pos;
                    text.orientation = angle;
                }
                "layer" => {
                    text.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "effects" => {
                    let mut mirrored = false;
                    self.parse_effects(
                        &mut text.size,
                        &mut text.thickness,
                        &mut text.italic,
                        &mut mirrored,
                        &mut text.visible,
                    )?;
                }
                _ => return Err(self.lex.expecting("at, layer, or effects")),
            }
        }
        Ok(text)
    }

    fn parse_pad(&mut self) -> Result<Pad, ParseError> {
        self.lex.need_sym()?;
        let name = self.lex.cur_text().to_string();
        self.lex.need_sym()?;
        let attribute = match self.lex.cur_text() {
            "thru_hole" => PadAttribute::ThruHole,
            "smd" => PadAttribute::Smd,
            "connect" => PadAttribute::Connect,
            "np_thru_hole" => PadAttribute::NpThruHole,
            _ => return Err(self.lex.expecting("thru_hole, smd, connect, or np_thru_hole")),
        };
        self.lex.need_sym()?;
        let shape = match self.lex.cur_text() {
            "circle" => PadShape::Circle,
            "rect" => PadShape::Rect,
            "oval" => PadShape::Oval,
            "trapezoid" => PadShape::Trapezoid,
            _ => return Err(self.lex.expecting("circle, rect, oval, or trapezoid")),
        };
        let mut pad = Pad::new(&name, shape, attribute);

        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "at" => {
                    let (pos, angle) = self.parse_at_tail()?;
                    pad.offset = pos;
                    pad.orientation = angle;
                }
                "size" => {
                    pad.size = self.read_point("size")?;
                    self.lex.need_right()?;
                }
                "rect_delta" => {
                    pad.delta = self.read_point("rect_delta")?;
                    self.lex.need_right()?;
                }
                "drill" => self.parse_pad_drill(&mut pad.drill)?,
                "layers" => pad.layers = self.read_layer_mask()?,
                "net" => {
                    pad.net = self.read_int("net number")?;
                    self.lex.need_sym()?;
                    pad.net_name = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                _ => {
                    return Err(self
                        .lex
                        .expecting("at, size, rect_delta, drill, layers, or net"))
                }
            }
        }
        Ok(pad)
    }

    /// Parses `(drill [oval] D [D2] [(offset X Y)])` after the keyword.
    fn parse_pad_drill(&mut self, drill: &mut PadDrill) -> Result<(), ParseError> {
        let mut oval = false;
        let mut seen = 0;
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(()),
                Tok::Sym => {
                    if self.lex.cur_text() == "oval" {
                        oval = true;
                        continue;
                    }
                    let value = mm_to_iu(self.lex.cur_text().parse::<f64>().map_err(|_| {
                        self.lex.error("invalid floating point number in drill")
                    })?);
                    if seen == 0 {
                        drill.size = value;
                    } else if oval {
                        drill.slot = value;
                    }
                    seen += 1;
                }
                Tok::Left => {
                    self.lex.need_sym()?;
                    if self.lex.cur_text() != "offset" {
                        return Err(self.lex.expecting("offset"));
                    }
                    drill.offset = self.read_point("drill offset")?;
                    self.lex.need_right()?;
                }
                _ => return Err(self.lex.expecting("oval, a drill size, or offset")),
            }
        }
    }

    fn parse_model(&mut self) -> Result<Model3D, ParseError> {
        self.lex.need_sym()?;
        let mut model = Model3D {
            path: self.lex.cur_text().to_string(),
            at: [0.0; 3],
            scale: [1.0; 3],
            rotate: [0.0; 3],
        };
        loop {
            match self.lex.next_tok()? {
                Tok::Right => return Ok(model),
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            let slot = match self.lex.cur_text() {
                "at" => &mut model.at,
                "scale" => &mut model.scale,
                "rotate" => &mut model.rotate,
                _ => return Err(self.lex.expecting("at, scale, or rotate")),
            };
            self.lex.need_left()?;
            self.lex.need_sym()?;
            if self.lex.cur_text() != "xyz" {
                return Err(self.lex.expecting("xyz"));
            }
            for value in slot.iter_mut() {
                *value = self.read_double("xyz")?;
            }
            self.lex.need_right()?;
            self.lex.need_right()?;
        }
    }

    // --- tracks, vias, zones ----------------------------------------------

    fn check_net_defined(&self, board: &Board, net: i32) -> Result<(), ParseError> {
        if board.nets.by_code(net).is_none() {
            return Err(self.lex.error(&format!("net {net} is not defined")));
        }
        Ok(())
    }

    fn parse_track(&mut self, board: &Board) -> Result<Track, ParseError> {
        let mut track = Track::new_segment(Point::default(), Point::default(), 0, 0, 0);
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "start" => track.start = self.read_point("start")?,
                "end" => track.end = self.read_point("end")?,
                "width" => track.width = self.read_units("width")?,
                "layer" => track.layer = self.read_item_layer()?,
                "net" => {
                    track.net = self.read_int("net number")?;
                    self.check_net_defined(board, track.net)?;
                }
                "tstamp" => track.tstamp = self.read_hex("tstamp")?,
                "status" => track.status = self.read_hex("status")? as u32,
                _ => {
                    return Err(self
                        .lex
                        .expecting("start, end, width, layer, net, tstamp, or status"))
                }
            }
            self.lex.need_right()?;
        }
        Ok(track)
    }

    fn parse_via(&mut self, board: &Board) -> Result<Track, ParseError> {
        let mut via = Track::new_via(Point::default(), 0, ViaType::Through, 0);
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {
                    self.lex.need_sym()?;
                    match self.lex.cur_text() {
                        "at" => {
                            let at = self.read_point("at")?;
                            via.start = at;
                            via.end = at;
                            self.lex.need_right()?;
                        }
                        "size" => {
                            via.width = self.read_units("via size")?;
                            self.lex.need_right()?;
                        }
                        "drill" => {
                            let d = self.read_units("drill diameter")?;
                            if let TrackKind::Via { drill, .. } = &mut via.kind {
                                *drill = d;
                            }
                            self.lex.need_right()?;
                        }
                        "layers" => {
                            let layer1 = self.read_item_layer()?;
                            let layer2 = self.read_item_layer()?;
                            via.set_layer_pair(layer1, layer2);
                            self.lex.need_right()?;
                        }
                        "net" => {
                            via.net = self.read_int("net number")?;
                            self.check_net_defined(board, via.net)?;
                            self.lex.need_right()?;
                        }
                        "tstamp" => {
                            via.tstamp = self.read_hex("tstamp")?;
                            self.lex.need_right()?;
                        }
                        "status" => {
                            via.status = self.read_hex("status")? as u32;
                            self.lex.need_right()?;
                        }
                        _ => {
                            return Err(self.lex.expecting(
                                "blind, micro, at, size, drill, layers, net, tstamp, or status",
                            ))
                        }
                    }
                }
                // blind and micro appear as bare symbols.
                Tok::Sym => {
                    let t = match self.lex.cur_text() {
                        "blind" => ViaType::BlindBuried,
                        "micro" => ViaType::Micro,
                        _ => return Err(self.lex.expecting("blind or micro")),
                    };
                    if let TrackKind::Via { via_type, .. } = &mut via.kind {
                        *via_type = t;
                    }
                }
                _ => return Err(self.lex.expecting("( or )")),
            }
        }
        Ok(via)
    }

    fn parse_zone(&mut self, board: &Board) -> Result<Zone, ParseError> {
        let mut zone = Zone::new(0, 0);
        let mut saw_outline = false;
        loop {
            match self.lex.next_tok()? {
                Tok::Right => break,
                Tok::Left => {}
                _ => return Err(self.lex.expecting("(")),
            }
            self.lex.need_sym()?;
            match self.lex.cur_text() {
                "net" => {
                    zone.net = self.read_int("net number")?;
                    self.lex.need_right()?;
                }
                "net_name" => {
                    self.lex.need_sym()?;
                    zone.net_name = self.lex.cur_text().to_string();
                    self.lex.need_right()?;
                }
                "layer" => {
                    zone.layer = self.read_item_layer()?;
                    self.lex.need_right()?;
                }
                "tstamp" => {
                    zone.tstamp = self.read_hex("tstamp")?;
                    self.lex.need_right()?;
                }
                "priority" => {
                    zone.priority = self.read_int("priority")?.max(0) as u32;
                    self.lex.need_right()?;
                }
                "hatch" => {
                    self.lex.need_sym()?;
                    zone.hatch_style = match self.lex.cur_text() {
                        "none" => HatchStyle::None,
                        "edge" => HatchStyle::Edge,
                        "full" => HatchStyle::Full,
                        _ => return Err(self.lex.expecting("none, edge, or full")),
                    };
                    zone.hatch_pitch = self.read_units("hatch pitch")?;
                    self.lex.need_right()?;
                }
                "connect_pads" => loop {
                    match self.lex.next_tok()? {
                        Tok::Right => break,
                        Tok::Sym => {
                            zone.connect_pads = match self.lex.cur_text() {
                                "yes" => PadConnection::Solid,
                                "no" => PadConnection::None,
                                "thru_hole_only" => PadConnection::ThermalReliefsForThtOnly,
                                _ => return Err(self.lex.expecting("yes, no, or thru_hole_only")),
                            };
                        }
                        Tok::Left => {
                            self.lex.need_sym()?;
                            if self.lex.cur_text() != "clearance" {
                                return Err(self.lex.expecting("clearance"));
                            }
                            zone.clearance = self.read_units("zone clearance")?;
                            self.lex.need_right()?;
                        }
                        _ => return Err(self.lex.expecting("yes, no, thru_hole_only, or clearance")),
                    }
                },
                "min_thickness" => {
                    zone.min_thickness = self.read_units("min_thickness")?;
                    self.lex.need_right()?;
                }
                "keepout" => {
                    let mut keepout = KeepoutParams::default();
                    loop {
                        match self.lex.next_tok()? {
                            Tok::Right => break,
                            Tok::Left => {}
                            _ => return Err(self.lex.expecting("(")),
                        }
                        self.lex.need_sym()?;
                        let slot = match self.lex.cur_text() {
                            "tracks" => &mut keepout.no_tracks,
                            "vias" => &mut keepout.no_vias,
                            "copperpour" => &mut keepout.no_copper_pour,
                            _ => return Err(self.lex.expecting("tracks, vias, or copperpour")),
                        };
                        self.lex.need_sym()?;
                        *slot = match self.lex.cur_text() {
                            "allowed" => false,
                            "not_allowed" => true,
                            _ => return Err(self.lex.expecting("allowed or not_allowed")),
                        };
                        self.lex.need_right()?;
                    }
                    zone.keepout = Some(keepout);
                }
                "fill" => loop {
                    match self.lex.next_tok()? {
                        Tok::Right => break,
                        Tok::Sym if self.lex.cur_text() == "yes" => zone.is_filled = true,
                        Tok::Left => {
                            self.lex.need_sym()?;
                            match self.lex.cur_text() {
                                "mode" => {
                                    self.lex.need_sym()?;
                                    zone.fill_mode = match self.lex.cur_text() {
                                        "segment" => FillMode::Segments,
                                        "polygon" => FillMode::Polygons,
                                        _ => return Err(self.lex.expecting("segment or polygon")),
                                    };
                                    self.lex.need_right()?;
                                }
                                "arc_segments" => {
                                    zone.arc_segments = self.read_int("arc_segments")?;
                                    self.lex.need_right()?;
                                }
                                "thermal_gap" => {
                                    zone.thermal_gap = self.read_units("thermal_gap")?;
                                    self.lex.need_right()?;
                                }
                                "thermal_bridge_width" => {
                                    zone.thermal_bridge_width =
                                        self.read_units("thermal_bridge_width")?;
                                    self.lex.need_right()?;
                                }
                                "smoothing" | "radius" => self.lex.skip_balanced()?,
                                _ => {
                                    return Err(self.lex.expecting(
                                        "mode, arc_segments, thermal_gap, or \
                                         thermal_bridge_width",
                                    ))
                                }
                            }
                        }
                        _ => return Err(self.lex.expecting("yes, (, or )")),
                    }
                },
                "polygon" => {
                    let points = self.parse_pts()?;
                    self.lex.need_right()?;
                    if saw_outline {
                        zone.holes.push(Contour(points));
                    } else {
                        zone.outline = Contour(points);
                        saw_outline = true;
                    }
                }
                "filled_polygon" => {
                    let points = self.parse_pts()?;
                    self.lex.need_right()?;
                    zone.filled_polys.push(points);
                }
                _ => {
                    return Err(self.lex.expecting(
                        "net, net_name, layer, tstamp, priority, hatch, connect_pads, \
                         min_thickness, keepout, fill, polygon, or filled_polygon",
                    ))
                }
            }
        }

        // A zone net must resolve against the net table; on a name
        // mismatch the zone is demoted to unconnected rather than silently
        // adopting someone else's code.
        if zone.net != 0 {
            match board.nets.by_code(zone.net) {
                Some(net) if net.name == zone.net_name => {}
                _ => {
                    warn!(
                        net = zone.net,
                        name = %zone.net_name,
                        "zone references an undefined net; marking unconnected"
                    );
                    zone.net = 0;
                }
            }
        }
        if !zone.filled_polys.is_empty() {
            zone.is_filled = true;
        }
        Ok(zone)
    }
}
