//! Document walk producing SVG.

use std::io::Write;

use super::svg::{self, SVG_NS, XLINK_NS};
use super::{ExportOptions, ExportState, ExportStats};
use crate::dict::{DictionaryEntry, EditText, EntryKind, EntryPayload, FillDraw, FillStyle, GradientKind, LineDraw, Shape, Text, TextAlign};
use crate::document::Document;
use crate::playback::DisplayList;
use crate::sprite::{CommandContext, Dispatcher, OnError, PlaceObject2Params, Scope, Sprite, SpriteGraph};
use crate::stream::{TagCode, GRADIENT_SQUARE_HALF};
use crate::util::{ColorTransform, Error, Matrix, Result};

/// Streaming SVG writer for one document.
///
/// Runs the export state machine once; see [`ExportState`].
pub struct SvgExporter<'d, W: Write> {
    doc: &'d Document,
    out: W,
    opts: &'d ExportOptions,
    image_base: String,
    graph: SpriteGraph,
    placements: Dispatcher<SvgExporter<'d, W>>,
    state: ExportState,
    stats: ExportStats,
}

impl<'d, W: Write> SvgExporter<'d, W> {
    pub fn new(doc: &'d Document, out: W, image_base: &str, opts: &'d ExportOptions) -> Result<Self> {
        doc.validate()?;
        Ok(Self {
            doc,
            out,
            opts,
            image_base: image_base.trim_end_matches('/').to_string(),
            graph: doc.sprite_graph()?,
            placements: Dispatcher::new().with(TagCode::PlaceObject2, Self::on_place_object2),
            state: ExportState::NotStarted,
            stats: ExportStats::default(),
        })
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn stats(&self) -> ExportStats {
        self.stats
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn enter(&mut self, next: ExportState) {
        tracing::debug!(from = %self.state, to = %next, "Export state");
        self.state = next;
    }

    fn n(&self, v: f32) -> String {
        svg::num(v, self.opts.precision)
    }

    /// Write the whole document.
    pub fn run(&mut self) -> Result<()> {
        if self.state != ExportState::NotStarted {
            return Err(Error::other(format!("export already {}", self.state)));
        }

        self.enter(ExportState::WritingHeader);
        self.write_header()?;

        self.enter(ExportState::WritingDictionaryEntries);
        writeln!(self.out, "\t<defs>")?;
        let doc = self.doc;
        for entry in doc.dictionary.entries() {
            self.write_entry(entry)?;
        }
        writeln!(self.out, "\t</defs>")?;

        self.enter(ExportState::WritingRootTimeline);
        self.write_root()?;
        writeln!(self.out, "</svg>")?;
        self.out.flush()?;

        self.enter(ExportState::Done);
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        let (w, h) = (self.n(self.doc.frame_width), self.n(self.doc.frame_height));
        writeln!(self.out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        write!(
            self.out,
            r#"<svg xmlns="{}" xmlns:xlink="{}" version="1.1" width="{}" height="{}""#,
            SVG_NS, XLINK_NS, w, h
        )?;
        if self.opts.view_box {
            write!(self.out, r#" viewBox="0 0 {} {}""#, w, h)?;
        }
        writeln!(self.out, ">")?;
        Ok(())
    }

    // ========================================================================
    // Dictionary entries
    // ========================================================================

    fn write_entry(&mut self, entry: &'d DictionaryEntry) -> Result<()> {
        let id = entry.id;
        match &entry.payload {
            EntryPayload::Shape(shape) => {
                self.stats.shapes += 1;
                self.write_shape(id, shape)
            }
            EntryPayload::Morph(shape) => {
                self.stats.morphs += 1;
                self.write_shape(id, shape)
            }
            EntryPayload::Sprite(sprite) => {
                self.stats.sprites += 1;
                self.write_sprite(id, sprite)
            }
            EntryPayload::Text(text) => {
                self.stats.texts += 1;
                self.write_text(id, text)
            }
            EntryPayload::EditText(et) => {
                self.stats.edit_texts += 1;
                self.write_edit_text(id, et)
            }
            EntryPayload::Font(_) | EntryPayload::Bitmap(_) => {
                tracing::trace!(id, kind = %entry.kind(), "No group for entry");
                Ok(())
            }
        }
    }

    fn write_shape(&mut self, id: u16, shape: &Shape) -> Result<()> {
        writeln!(self.out, "\t\t<g id=\"{}\">", id)?;
        for (index, draw) in shape.fill_draws.iter().enumerate() {
            if draw.is_transparent_placeholder() {
                self.stats.skipped_fills += 1;
                continue;
            }
            if self.opts.bitmap_shapes_only && draw.style.bitmap_id().is_none() {
                continue;
            }
            self.write_fill(id, index, draw)?;
        }
        if !self.opts.bitmap_shapes_only {
            for draw in &shape.line_draws {
                self.write_line(draw)?;
            }
        }
        writeln!(self.out, "\t\t</g>")?;
        Ok(())
    }

    fn write_fill(&mut self, id: u16, index: usize, draw: &FillDraw) -> Result<()> {
        let prec = self.opts.precision;
        let points = svg::points(draw.outline_points(), prec);

        match &draw.style {
            FillStyle::Solid { start_color, .. } => {
                writeln!(
                    self.out,
                    "\t\t\t<polygon fill=\"{}\" points=\"{}\"/>",
                    svg::rgba(*start_color, prec),
                    points
                )?;
            }
            FillStyle::Gradient { kind, stops, start_matrix, focal_point, .. } => {
                let grad_id = format!("grad_{}_{}", id, index);
                let transform = svg::matrix(start_matrix, prec);
                let extent = self.n(GRADIENT_SQUARE_HALF);
                match kind {
                    GradientKind::Linear => writeln!(
                        self.out,
                        "\t\t\t<linearGradient id=\"{}\" gradientUnits=\"userSpaceOnUse\" x1=\"-{}\" y1=\"0\" x2=\"{}\" y2=\"0\" gradientTransform=\"{}\">",
                        grad_id, extent, extent, transform
                    )?,
                    GradientKind::Radial | GradientKind::Focal => {
                        let fx = if *kind == GradientKind::Focal { focal_point * GRADIENT_SQUARE_HALF } else { 0.0 };
                        writeln!(
                            self.out,
                            "\t\t\t<radialGradient id=\"{}\" gradientUnits=\"userSpaceOnUse\" cx=\"0\" cy=\"0\" r=\"{}\" fx=\"{}\" fy=\"0\" gradientTransform=\"{}\">",
                            grad_id,
                            extent,
                            self.n(fx),
                            transform
                        )?
                    }
                }
                for stop in stops {
                    writeln!(
                        self.out,
                        "\t\t\t\t<stop offset=\"{}\" stop-color=\"{}\" stop-opacity=\"{}\"/>",
                        self.n(stop.ratio as f32 / 255.0),
                        svg::rgb(stop.start_color),
                        self.n(stop.start_color.alpha_unit())
                    )?;
                }
                let close = if *kind == GradientKind::Linear { "linearGradient" } else { "radialGradient" };
                writeln!(self.out, "\t\t\t</{}>", close)?;
                writeln!(self.out, "\t\t\t<polygon fill=\"url(#{})\" points=\"{}\"/>", grad_id, points)?;
                self.stats.gradients += 1;
            }
            FillStyle::Bitmap { bitmap_id, start_matrix, .. } => {
                let bitmap = match self.doc.dictionary.bitmap_ref(*bitmap_id) {
                    Ok(Some(b)) => *b,
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        tracing::warn!(shape = id, bitmap = bitmap_id, error = %e, "Skipping bitmap fill");
                        self.stats.skipped_fills += 1;
                        return Ok(());
                    }
                };
                let clip_id = format!("clip_{}_{}", id, index);
                writeln!(self.out, "\t\t\t<clipPath id=\"{}\"><polygon points=\"{}\"/></clipPath>", clip_id, points)?;
                write!(
                    self.out,
                    "\t\t\t<g clip-path=\"url(#{})\"><image xlink:href=\"{}\" width=\"{}\" height=\"{}\"",
                    clip_id,
                    svg::escape(&self.image_path(*bitmap_id)),
                    bitmap.width,
                    bitmap.height
                )?;
                if !start_matrix.is_identity() {
                    write!(self.out, " transform=\"{}\"", svg::matrix(start_matrix, prec))?;
                }
                writeln!(self.out, "/></g>")?;
                self.stats.images += 1;
            }
        }
        Ok(())
    }

    /// External image reference: `<base>/image_characterid_<id>.<ext>`.
    pub fn image_path(&self, bitmap_id: u16) -> String {
        let file = format!("image_characterid_{}.{}", bitmap_id, self.opts.image_extension);
        if self.image_base.is_empty() {
            file
        } else {
            format!("{}/{}", self.image_base, file)
        }
    }

    fn write_line(&mut self, draw: &LineDraw) -> Result<()> {
        if draw.start_verts.is_empty() {
            return Ok(());
        }
        let prec = self.opts.precision;
        writeln!(
            self.out,
            "\t\t\t<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" points=\"{}\"/>",
            svg::rgba(draw.style.start_color, prec),
            self.n(draw.style.start_width),
            svg::points(draw.start_verts.iter().copied(), prec)
        )?;
        Ok(())
    }

    fn write_text(&mut self, id: u16, text: &Text) -> Result<()> {
        write!(self.out, "\t\t<g id=\"{}\"", id)?;
        if !text.matrix.is_identity() {
            write!(self.out, " transform=\"{}\"", svg::matrix(&text.matrix, self.opts.precision))?;
        }
        writeln!(self.out, ">")?;

        for run in text.runs() {
            let font = run.font_id.and_then(|f| self.doc.dictionary.get(f)).and_then(|e| e.as_font());
            let family = font.map(|f| f.name.as_str()).unwrap_or("sans-serif");
            writeln!(
                self.out,
                "\t\t\t<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                self.n(run.x),
                self.n(run.y),
                svg::escape(family),
                self.n(run.size()),
                svg::rgba(run.color, self.opts.precision),
                svg::escape(&run.decode(font))
            )?;
        }
        writeln!(self.out, "\t\t</g>")?;
        Ok(())
    }

    fn write_edit_text(&mut self, id: u16, et: &EditText) -> Result<()> {
        let family = self.doc.dictionary.font_name(et.font_id).unwrap_or("sans-serif");
        let (_, y) = et.origin();
        let b = &et.bounds;
        let x = match et.align {
            TextAlign::Left | TextAlign::Justify => b.x_min + et.left_margin,
            TextAlign::Center => (b.x_min + b.x_max) * 0.5,
            TextAlign::Right => b.x_max - et.right_margin,
        };
        writeln!(self.out, "\t\t<g id=\"{}\">", id)?;
        writeln!(
            self.out,
            "\t\t\t<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" text-anchor=\"{}\">{}</text>",
            self.n(x),
            self.n(y),
            svg::escape(family),
            self.n(et.font_size()),
            svg::rgba(et.color, self.opts.precision),
            et.align.svg_anchor(),
            svg::escape(&et.initial_text)
        )?;
        writeln!(self.out, "\t\t</g>")?;
        Ok(())
    }

    fn write_sprite(&mut self, id: u16, sprite: &'d Sprite) -> Result<()> {
        writeln!(self.out, "\t\t<g id=\"{}\">", id)?;
        if sprite.frame_count > 0 {
            let doc = self.doc;
            let scope = Scope::new(sprite, Some(id), &doc.dictionary, doc.version);
            self.walk(&scope, 0)?;
        }
        writeln!(self.out, "\t\t</g>")?;
        Ok(())
    }

    // ========================================================================
    // Timelines
    // ========================================================================

    fn write_root(&mut self) -> Result<()> {
        let doc = self.doc;
        let root_id = doc.dictionary.slot_count();
        writeln!(self.out, "\t<g id=\"{}\">", root_id)?;
        let main = &doc.main;
        let frame = self.opts.frame;
        if frame == 0 {
            // An empty main timeline still exports its (empty) first frame.
            if main.frame_count > 0 {
                let scope = Scope::new(main, None, &doc.dictionary, doc.version);
                self.walk(&scope, 0)?;
            }
        } else {
            self.write_snapshot(main, frame)?;
        }
        writeln!(self.out, "\t</g>")?;
        Ok(())
    }

    /// Everything standing on the main timeline after `frame`, in depth order.
    fn write_snapshot(&mut self, main: &'d Sprite, frame: u32) -> Result<()> {
        if frame >= main.frame_count {
            return Err(Error::FrameOutOfBounds { frame, count: main.frame_count });
        }
        let doc = self.doc;
        let list = DisplayList::snapshot(main, None, &doc.dictionary, doc.version, frame)?;
        for (_, obj) in list.iter() {
            self.place(
                None,
                obj.command,
                obj.character_id,
                Some(obj.matrix),
                Some(obj.color_transform),
                obj.name.as_deref(),
            )?;
        }
        Ok(())
    }

    fn walk(&mut self, scope: &Scope<'d>, frame: u32) -> Result<()> {
        // Handler table is moved out so handlers can borrow the exporter mutably.
        let placements = std::mem::take(&mut self.placements);
        let result = placements.walk_frame(self, scope, frame, OnError::Abort);
        self.placements = placements;
        result.map(|_| ())
    }

    /// Group id of a timeline: the sprite id, or the root group id.
    fn host_group(&self, host: Option<u16>) -> usize {
        host.map(usize::from).unwrap_or_else(|| self.doc.dictionary.slot_count())
    }

    fn on_place_object2(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        let params = PlaceObject2Params::decode(&mut ctx.stream, ctx.version)?;
        let Some(id) = params.character_id else {
            return Ok(());
        };
        self.place(
            ctx.host_id,
            ctx.index,
            id,
            params.matrix,
            params.color_transform,
            params.name.as_deref(),
        )
    }

    /// Emit one `<use>` (and its color filter) for character `id`, placed by
    /// command `index` of the `host` timeline.
    fn place(
        &mut self,
        host: Option<u16>,
        index: usize,
        id: u16,
        matrix: Option<Matrix>,
        color_transform: Option<ColorTransform>,
        name: Option<&str>,
    ) -> Result<()> {
        let doc = self.doc;
        let kind = match doc.dictionary.resolve(id) {
            Ok(entry) => entry.kind(),
            Err(e) => {
                self.skip(host, index, id, &e.to_string());
                return Ok(());
            }
        };
        if !kind.is_placeable() {
            self.skip(host, index, id, &format!("{} is not placeable", kind));
            return Ok(());
        }
        let cyclic = kind == EntryKind::Sprite && host.is_some_and(|host| self.graph.closes_cycle(host, id));
        if cyclic {
            self.skip(host, index, id, "cyclic sprite reference");
            return Ok(());
        }

        let prec = self.opts.precision;
        let indent = if host.is_some() { "\t\t\t" } else { "\t\t" };

        let mut filter = None;
        if let Some(cx) = color_transform.filter(|cx| !cx.is_identity()) {
            let filter_id = format!("cf_{}_{}_{}", self.host_group(host), id, index);
            writeln!(
                self.out,
                "{indent}<filter id=\"{}\" color-interpolation-filters=\"sRGB\"><feColorMatrix type=\"matrix\" values=\"{}\"/></filter>",
                filter_id,
                svg::color_matrix(&cx, prec)
            )?;
            self.stats.filters += 1;
            filter = Some(filter_id);
        }

        write!(self.out, "{indent}<use xlink:href=\"#{}\"", id)?;
        if let Some(m) = matrix.filter(|m| !m.is_identity()) {
            write!(self.out, " transform=\"{}\"", svg::matrix(&m, prec))?;
        }
        if let Some(f) = &filter {
            write!(self.out, " filter=\"url(#{})\"", f)?;
        }
        if let Some(name) = name {
            write!(self.out, " data-name=\"{}\"", svg::escape(name))?;
        }
        writeln!(self.out, "/>")?;
        self.stats.placements += 1;
        Ok(())
    }

    fn skip(&mut self, host: Option<u16>, index: usize, id: u16, reason: &str) {
        tracing::warn!(?host, command = index, character = id, reason, "Skipping placement");
        self.stats.skipped_placements += 1;
    }
}
