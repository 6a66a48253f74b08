//! Hitrate scan charts: one chart per derived quantity, saved as PNG and PDF.

use crate::error::{drawing_err, PlotError};
use crate::linspace::Linspace;
use crate::scenario::{scenario_label, PlotStyle, Quantity};
use crate::stats::{median_with_ci, BoxStats, DensityCurve, DensityGrid, LetterValues};
use crate::table::JobTable;
use crate::{min_and_max, HITRATE, MACHINE};
use log::{debug, info, warn};
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// 6x4 inches at 100 dpi
pub const FIGURE_SIZE: (u32, u32) = (600, 400);
pub const JOINT_SIZE: (u32, u32) = (700, 700);

const HITRATE_XLIM: (f64, f64) = (-0.05, 1.05);
const CATEGORY_WIDTH: f64 = 0.8;
const CI_LEVEL: f64 = 95.;
const KDE_GRIDSIZE: usize = 100;
const JOINT_GRIDSIZE: usize = 60;
const JOINT_LEVELS: f64 = 10.;
const FONT: &str = "sans-serif";

const EDGE: RGBColor = RGBColor(63, 63, 63);

/// seaborn's "colorblind" palette
pub const COLORBLIND: [RGBColor; 10] = [
    RGBColor(1, 115, 178),
    RGBColor(222, 143, 5),
    RGBColor(2, 158, 115),
    RGBColor(213, 94, 0),
    RGBColor(204, 120, 188),
    RGBColor(202, 145, 97),
    RGBColor(251, 175, 228),
    RGBColor(148, 148, 148),
    RGBColor(236, 225, 51),
    RGBColor(86, 180, 233),
];

pub fn palette(i: usize) -> RGBColor {
    COLORBLIND[i % COLORBLIND.len()]
}

/// mixes the colour with white, `f = 0` keeps it, `f = 1` gives white
fn lighten(c: RGBColor, f: f64) -> RGBColor {
    let mix = |v: u8| (v as f64 + (255. - v as f64) * f).round() as u8;
    RGBColor(mix(c.0), mix(c.1), mix(c.2))
}

/// 0.0, 0.1, ..., 1.0
pub fn hitrate_ticks() -> Vec<f64> {
    Linspace::with_step(0., 1., 0.1).collect()
}

/// Places the ticks on an axis spanning `span` whose categories sit at 0, 1, 2, ...
/// The positions are the ticks scaled so that the first and last tick land on the
/// outermost categories; each position keeps the tick value as its label.
pub fn scale_ticks(span: (f64, f64), ticks: &[f64]) -> Vec<(f64, String)> {
    if ticks.len() < 2 {
        return ticks.iter().map(|t| (*t, format!("{:.1}", t))).collect();
    }
    let scale = (span.1 - span.0 - 1.) / (ticks[ticks.len() - 1] - ticks[0]);
    debug!(
        "scale ({}, {}) with {} to end up with the categorical axis {:?}",
        ticks[0],
        ticks[ticks.len() - 1],
        scale,
        span
    );
    ticks
        .iter()
        .map(|t| (scale * t, format!("{:.1}", t)))
        .collect()
}

/// x axis of a chart: its range and the labelled tick positions
#[derive(Debug, Clone)]
struct XAxis {
    range: Range<f64>,
    ticks: Vec<(f64, String)>,
}

impl XAxis {
    fn numeric() -> XAxis {
        XAxis {
            range: HITRATE_XLIM.0..HITRATE_XLIM.1,
            ticks: hitrate_ticks()
                .into_iter()
                .map(|t| (t, format!("{:.1}", t)))
                .collect(),
        }
    }

    /// `n` categories at 0..n, each one unit wide
    fn categorical(n: usize) -> XAxis {
        let span = (-0.5, n.max(1) as f64 - 0.5);
        let mut ticks = scale_ticks(span, &hitrate_ticks());
        ticks.dedup_by(|a, b| a.0 == b.0);
        XAxis {
            range: span.0..span.1,
            ticks,
        }
    }

    fn positions(&self) -> Vec<f64> {
        self.ticks.iter().map(|(p, _)| *p).collect()
    }

    fn label(&self, x: &f64) -> String {
        self.ticks
            .iter()
            .find(|(p, _)| (p - x).abs() < 1e-9)
            .map(|(_, l)| l.clone())
            .unwrap_or_default()
    }
}

/// Hitrate x coordinate: linear mapping, tick marks only at the labelled positions.
#[derive(Clone)]
struct HitrateCoord {
    inner: RangedCoordf64,
    ticks: Vec<f64>,
}

impl From<&XAxis> for HitrateCoord {
    fn from(x: &XAxis) -> HitrateCoord {
        HitrateCoord {
            inner: RangedCoordf64::from(x.range.clone()),
            ticks: x.positions(),
        }
    }
}

impl Ranged for HitrateCoord {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.inner.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            Vec::new()
        } else {
            self.ticks.clone()
        }
    }

    fn range(&self) -> Range<f64> {
        self.inner.range()
    }
}

type ScanChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<HitrateCoord, RangedCoordf64>>;

/// The values of one quantity with the hitrate and machine of each job.
#[derive(Debug, Clone)]
pub struct ScanData {
    /// sorted machine names, the index is the hue
    pub machines: Vec<String>,
    /// sorted distinct finite hitrates, the index is the category slot
    pub hitrates: Vec<f64>,
    /// (hitrate, value, machine index) per job
    pub jobs: Vec<(f64, f64, usize)>,
}

/// Values of one (hitrate, machine) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub slot: usize,
    pub machine: usize,
    pub values: Vec<f64>,
}

impl ScanData {
    pub fn new(table: &JobTable, quantity: Quantity) -> Result<ScanData, PlotError> {
        let hitrate = table.numeric(HITRATE)?;
        let value = table.numeric(quantity.column())?;
        let labels = table.labels(MACHINE)?;

        let mut machines = labels.clone();
        machines.sort();
        machines.dedup();

        let mut hitrates: Vec<f64> = hitrate.iter().copied().filter(|h| h.is_finite()).collect();
        hitrates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        hitrates.dedup();

        let jobs = hitrate
            .iter()
            .zip(value.iter())
            .zip(labels.iter())
            .map(|((h, v), m)| {
                let hue = machines.binary_search(m).unwrap_or_else(|i| i);
                (*h, *v, hue)
            })
            .collect();
        Ok(ScanData {
            machines,
            hitrates,
            jobs,
        })
    }

    /// all finite values
    pub fn values(&self) -> Vec<f64> {
        self.jobs
            .iter()
            .map(|(_, v, _)| *v)
            .filter(|v| v.is_finite())
            .collect()
    }

    /// finite (hitrate, value) pairs of one machine
    pub fn points(&self, machine: usize) -> (Vec<f64>, Vec<f64>) {
        self.jobs
            .iter()
            .filter(|(h, v, m)| *m == machine && h.is_finite() && v.is_finite())
            .map(|(h, v, _)| (*h, *v))
            .unzip()
    }

    /// the non-empty (hitrate, machine) groups, ordered by slot then machine
    pub fn groups(&self) -> Vec<Group> {
        let mut groups = Vec::new();
        for (slot, hr) in self.hitrates.iter().enumerate() {
            for machine in 0..self.machines.len() {
                let values: Vec<f64> = self
                    .jobs
                    .iter()
                    .filter(|(h, v, m)| h == hr && *m == machine && v.is_finite())
                    .map(|(_, v, _)| *v)
                    .collect();
                if !values.is_empty() {
                    groups.push(Group {
                        slot,
                        machine,
                        values,
                    });
                }
            }
        }
        groups
    }

    /// width reserved for one machine inside a category
    fn hue_width(&self) -> f64 {
        CATEGORY_WIDTH / self.machines.len().max(1) as f64
    }

    /// centre of a machine's element inside its category
    fn dodge(&self, slot: usize, machine: usize) -> f64 {
        slot as f64 - CATEGORY_WIDTH / 2. + self.hue_width() * (machine as f64 + 0.5)
    }
}

/// Title and axis configuration shared by the chart branches.
struct Frame<'t> {
    title: &'t str,
    quantity: Quantity,
}

impl<'t> Frame<'t> {
    /// the fixed limit if the quantity has one, else the extent of the drawn values plus 5%
    fn y_range(&self, extent: &[f64]) -> Range<f64> {
        if let Some((lo, hi)) = self.quantity.ylim() {
            return lo..hi;
        }
        match min_and_max(extent) {
            Some((ymin, ymax)) if ymax > ymin => {
                let yspan = (ymax - ymin) / 20f64;
                (ymin - yspan)..(ymax + yspan)
            }
            Some((y, _)) => {
                let yspan = if y == 0. { 0.5 } else { y.abs() / 20. };
                (y - yspan)..(y + yspan)
            }
            None => 0f64..1f64,
        }
    }

    fn build_chart<'a, DB: DrawingBackend>(
        &self,
        area: &'a DrawingArea<DB, Shift>,
        x: &XAxis,
        y: Range<f64>,
    ) -> Result<ScanChart<'a, DB>, PlotError> {
        scan_chart(area, Some(self.title), x, y, self.quantity.ylabel())
    }
}

/// chart with the hitrate on x, left and bottom axes only
fn scan_chart<'a, DB: DrawingBackend>(
    area: &'a DrawingArea<DB, Shift>,
    caption: Option<&str>,
    x: &XAxis,
    y: Range<f64>,
    ylabel: &str,
) -> Result<ScanChart<'a, DB>, PlotError> {
    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(40).y_label_area_size(60);
    if let Some(title) = caption {
        builder.caption(title, (FONT, 18));
    }
    let mut chart = builder
        .build_cartesian_2d(HitrateCoord::from(x), y)
        .map_err(drawing_err)?;
    let xfmt = |v: &f64| x.label(v);
    chart
        .configure_mesh()
        .disable_mesh()
        .label_style((FONT, 12))
        .axis_desc_style((FONT, 14))
        .x_desc("hitrate")
        .y_desc(ylabel)
        .x_label_formatter(&xfmt)
        .y_label_formatter(&|y: &f64| format!("{:.2}", y))
        .draw()
        .map_err(drawing_err)?;
    Ok(chart)
}

fn clamp(v: f64, r: &Range<f64>) -> f64 {
    v.max(r.start).min(r.end)
}

/// one legend entry per machine, keyed by the palette colour
fn draw_legend<'a, DB: DrawingBackend + 'a>(
    chart: &mut ScanChart<'a, DB>,
    machines: &[String],
) -> Result<(), PlotError> {
    if machines.is_empty() {
        return Ok(());
    }
    for (i, name) in machines.iter().enumerate() {
        let color = palette(i);
        chart
            .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
            .map_err(drawing_err)?
            .label(name.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font((FONT, 12))
        .draw()
        .map_err(drawing_err)
}

fn draw_scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let x = XAxis::numeric();
    let yr = frame.y_range(&data.values());
    let mut chart = frame.build_chart(area, &x, yr.clone())?;
    for machine in 0..data.machines.len() {
        let color = palette(machine).mix(0.9);
        let (hs, vs) = data.points(machine);
        chart
            .draw_series(
                hs.into_iter()
                    .zip(vs)
                    .filter(|(_, v)| yr.contains(v))
                    .map(|(h, v)| Circle::new((h, v), 3, color.filled())),
            )
            .map_err(drawing_err)?;
    }
    draw_legend(&mut chart, &data.machines)
}

/// medians with bootstrap confidence intervals as capped error bars, dodged per machine
fn draw_point<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let x = XAxis::categorical(data.hitrates.len());
    let n_hue = data.machines.len().max(1);
    let dodge = if n_hue > 1 { 0.025 * n_hue as f64 } else { 0. };
    let offsets: Vec<f64> = Linspace::new(0., dodge, n_hue)
        .map(|o| o - dodge / 2.)
        .collect();
    let cap = 0.5 / n_hue as f64 / 2.;

    let estimates: Vec<(Group, (f64, f64, f64))> = data
        .groups()
        .into_iter()
        .filter_map(|g| median_with_ci(&g.values, CI_LEVEL).map(|e| (g, e)))
        .collect();
    let extent: Vec<f64> = estimates
        .iter()
        .flat_map(|(_, (_, lo, hi))| vec![*lo, *hi])
        .collect();
    let yr = frame.y_range(&extent);
    let mut chart = frame.build_chart(area, &x, yr.clone())?;
    for (g, (m, lo, hi)) in estimates.iter() {
        let color = palette(g.machine);
        let cx = g.slot as f64 + offsets[g.machine];
        let (lo, hi) = (clamp(*lo, &yr), clamp(*hi, &yr));
        let style = color.stroke_width(2);
        chart
            .draw_series(vec![
                PathElement::new(vec![(cx, lo), (cx, hi)], style),
                PathElement::new(vec![(cx - cap, lo), (cx + cap, lo)], style),
                PathElement::new(vec![(cx - cap, hi), (cx + cap, hi)], style),
            ])
            .map_err(drawing_err)?;
        if yr.contains(m) {
            chart
                .draw_series(std::iter::once(Circle::new((cx, *m), 4, color.filled())))
                .map_err(drawing_err)?;
        }
    }
    draw_legend(&mut chart, &data.machines)
}

fn draw_box<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let x = XAxis::categorical(data.hitrates.len());
    let half = data.hue_width() * 0.98 / 2.;
    let boxes: Vec<(Group, BoxStats)> = data
        .groups()
        .into_iter()
        .filter_map(|g| BoxStats::new(&g.values).map(|b| (g, b)))
        .collect();
    let extent: Vec<f64> = boxes
        .iter()
        .flat_map(|(g, _)| g.values.iter().copied())
        .collect();
    let yr = frame.y_range(&extent);
    let mut chart = frame.build_chart(area, &x, yr.clone())?;
    for (g, b) in boxes.iter() {
        let color = palette(g.machine);
        let cx = data.dodge(g.slot, g.machine);
        let c = |v: f64| clamp(v, &yr);
        let rect = [(cx - half, c(b.q1)), (cx + half, c(b.q3))];
        chart
            .draw_series(vec![
                Rectangle::new(rect, color.filled()),
                Rectangle::new(rect, EDGE.stroke_width(1)),
            ])
            .map_err(drawing_err)?;
        let cap = half / 2.;
        let (thin, thick) = (EDGE.stroke_width(1), EDGE.stroke_width(2));
        let (lo, hi) = (c(b.whisker_lo), c(b.whisker_hi));
        chart
            .draw_series(vec![
                PathElement::new(vec![(cx - half, c(b.median)), (cx + half, c(b.median))], thick),
                PathElement::new(vec![(cx, c(b.q3)), (cx, hi)], thin),
                PathElement::new(vec![(cx, c(b.q1)), (cx, lo)], thin),
                PathElement::new(vec![(cx - cap, hi), (cx + cap, hi)], thin),
                PathElement::new(vec![(cx - cap, lo), (cx + cap, lo)], thin),
            ])
            .map_err(drawing_err)?;
        chart
            .draw_series(
                b.fliers
                    .iter()
                    .filter(|f| yr.contains(*f))
                    .map(|f| Circle::new((cx, *f), 2, EDGE.stroke_width(1))),
            )
            .map_err(drawing_err)?;
    }
    draw_legend(&mut chart, &data.machines)
}

/// letter-value boxes: the fourths are widest and darkest, each deeper level narrower and lighter
fn draw_boxen<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let x = XAxis::categorical(data.hitrates.len());
    let half = data.hue_width() * 0.98 / 2.;
    let letters: Vec<(Group, LetterValues)> = data
        .groups()
        .into_iter()
        .filter_map(|g| LetterValues::new(&g.values).map(|lv| (g, lv)))
        .collect();
    let extent: Vec<f64> = letters
        .iter()
        .flat_map(|(g, _)| g.values.iter().copied())
        .collect();
    let yr = frame.y_range(&extent);
    let mut chart = frame.build_chart(area, &x, yr.clone())?;
    for (g, lv) in letters.iter() {
        let color = palette(g.machine);
        let cx = data.dodge(g.slot, g.machine);
        let k = lv.boxes.len() as f64;
        let c = |v: f64| clamp(v, &yr);
        for (i, (lo, hi)) in lv.boxes.iter().enumerate().rev() {
            let w = half * (k - i as f64) / k;
            let rect = [(cx - w, c(*lo)), (cx + w, c(*hi))];
            chart
                .draw_series(vec![
                    Rectangle::new(rect, lighten(color, i as f64 / (k + 1.)).filled()),
                    Rectangle::new(rect, EDGE.stroke_width(1)),
                ])
                .map_err(drawing_err)?;
        }
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(cx - half, c(lv.median)), (cx + half, c(lv.median))],
                EDGE.stroke_width(1),
            )))
            .map_err(drawing_err)?;
        chart
            .draw_series(
                lv.outliers
                    .iter()
                    .filter(|o| yr.contains(*o))
                    .map(|o| Circle::new((cx, *o), 2, EDGE.filled())),
            )
            .map_err(drawing_err)?;
    }
    draw_legend(&mut chart, &data.machines)
}

/// mirrored KDEs scaled by one common maximum density, with a box inside
fn draw_violin<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let x = XAxis::categorical(data.hitrates.len());
    let half = data.hue_width() * 0.98 / 2.;
    let violins: Vec<(Group, Option<DensityCurve>, Option<BoxStats>)> = data
        .groups()
        .into_iter()
        .map(|g| {
            let curve = DensityCurve::new(&g.values, 2., KDE_GRIDSIZE);
            let stats = BoxStats::new(&g.values);
            (g, curve, stats)
        })
        .collect();
    let max_density = violins
        .iter()
        .filter_map(|(_, c, _)| c.as_ref().map(|c| c.max_density()))
        .fold(0., f64::max);
    let extent: Vec<f64> = violins
        .iter()
        .flat_map(|(g, c, _)| match c {
            Some(c) => c.support.clone(),
            None => g.values.clone(),
        })
        .collect();
    let yr = frame.y_range(&extent);
    let mut chart = frame.build_chart(area, &x, yr.clone())?;
    for (g, curve, stats) in violins.iter() {
        let color = palette(g.machine);
        let cx = data.dodge(g.slot, g.machine);
        match curve {
            Some(curve) if max_density > 0. => {
                let outline: Vec<(f64, f64)> = curve
                    .support
                    .iter()
                    .zip(curve.density.iter())
                    .filter(|(y, _)| yr.contains(*y))
                    .map(|(y, d)| (*y, half * d / max_density))
                    .collect();
                let shape: Vec<(f64, f64)> = outline
                    .iter()
                    .map(|(y, w)| (cx + w, *y))
                    .chain(outline.iter().rev().map(|(y, w)| (cx - w, *y)))
                    .collect();
                let mut closed = shape.clone();
                if let Some(first) = shape.first() {
                    closed.push(*first);
                }
                chart
                    .draw_series(std::iter::once(Polygon::new(shape, color.filled())))
                    .map_err(drawing_err)?;
                chart
                    .draw_series(std::iter::once(PathElement::new(closed, EDGE.stroke_width(1))))
                    .map_err(drawing_err)?;
            }
            _ => {
                // no spread to estimate a density from: one line per distinct value
                debug!("single-valued violin at slot {} for {}", g.slot, data.machines[g.machine]);
                chart
                    .draw_series(g.values.iter().filter(|v| yr.contains(*v)).map(|v| {
                        PathElement::new(vec![(cx - half, *v), (cx + half, *v)], color.stroke_width(2))
                    }))
                    .map_err(drawing_err)?;
            }
        }
        if let Some(b) = stats {
            let c = |v: f64| clamp(v, &yr);
            chart
                .draw_series(vec![
                    PathElement::new(vec![(cx, c(b.whisker_lo)), (cx, c(b.whisker_hi))], EDGE.stroke_width(1)),
                    PathElement::new(vec![(cx, c(b.q1)), (cx, c(b.q3))], EDGE.stroke_width(4)),
                ])
                .map_err(drawing_err)?;
            if yr.contains(&b.median) {
                chart
                    .draw_series(std::iter::once(Circle::new((cx, b.median), 2, WHITE.filled())))
                    .map_err(drawing_err)?;
            }
        }
    }
    draw_legend(&mut chart, &data.machines)
}

/// closed outline of a density curve standing on zero density,
/// `flip` swaps the coordinates for a curve along the y axis
fn density_outline(
    curve: &DensityCurve,
    within: &Range<f64>,
    flip: bool,
) -> Vec<(f64, f64)> {
    let pts: Vec<(f64, f64)> = curve
        .support
        .iter()
        .zip(curve.density.iter())
        .filter(|(s, _)| within.contains(*s))
        .map(|(s, d)| (*s, *d))
        .collect();
    let (first, last) = match (pts.first(), pts.last()) {
        (Some(f), Some(l)) => (f.0, l.0),
        _ => return Vec::new(),
    };
    std::iter::once((first, 0.))
        .chain(pts.into_iter())
        .chain(std::iter::once((last, 0.)))
        .map(|(s, d)| if flip { (d, s) } else { (s, d) })
        .collect()
}

/// highest density among the curves, 1 when there is none to scale the marginal axis
fn highest_density(curves: &[Option<DensityCurve>]) -> f64 {
    let top = curves
        .iter()
        .flatten()
        .map(|c| c.max_density())
        .fold(0., f64::max);
    if top > 0. {
        top
    } else {
        1.
    }
}

/// bivariate KDE per machine with marginal densities above and to the right
fn draw_joint<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    frame: &Frame,
    data: &ScanData,
) -> Result<(), PlotError> {
    let root = root
        .titled(frame.title, (FONT, 18).into_font())
        .map_err(drawing_err)?;
    let (w, h) = root.dim_in_pixel();
    let marg = (h / 6) as i32;
    let (top, bottom) = root.split_vertically(marg);
    let (main, right) = bottom.split_horizontally(w as i32 - marg);
    let (top_marg, _) = top.split_horizontally(w as i32 - marg);

    let n = data.machines.len();
    let x_curves: Vec<Option<DensityCurve>> = (0..n)
        .map(|m| DensityCurve::new(&data.points(m).0, 3., KDE_GRIDSIZE))
        .collect();
    let y_curves: Vec<Option<DensityCurve>> = (0..n)
        .map(|m| DensityCurve::new(&data.points(m).1, 3., KDE_GRIDSIZE))
        .collect();
    let extent: Vec<f64> = y_curves
        .iter()
        .flatten()
        .flat_map(|c| c.support.iter().copied())
        .chain(data.values())
        .collect();

    let x = XAxis::numeric();
    let yr = frame.y_range(&extent);
    let mut chart = scan_chart(&main, None, &x, yr.clone(), frame.quantity.ylabel())?;

    for machine in 0..n {
        let (hs, vs) = data.points(machine);
        let grid = match DensityGrid::new(
            &hs,
            &vs,
            (x.range.start, x.range.end),
            (yr.start, yr.end),
            JOINT_GRIDSIZE,
        ) {
            Some(g) => g,
            None => {
                warn!(
                    "no joint density for machine {}, hitrate or {} has no spread",
                    data.machines[machine], frame.quantity
                );
                continue;
            }
        };
        let top_density = grid.max_density();
        if top_density <= 0. {
            continue;
        }
        let dx = (grid.xs[1] - grid.xs[0]) / 2.;
        let dy = (grid.ys[1] - grid.ys[0]) / 2.;
        let color = palette(machine);
        let mut cells = Vec::new();
        for (i, gx) in grid.xs.iter().enumerate() {
            for (j, gy) in grid.ys.iter().enumerate() {
                let level = (grid.density[i][j] / top_density * JOINT_LEVELS).floor() / JOINT_LEVELS;
                if level < 1. / JOINT_LEVELS {
                    continue;
                }
                cells.push(Rectangle::new(
                    [(gx - dx, clamp(gy - dy, &yr)), (gx + dx, clamp(gy + dy, &yr))],
                    color.mix(0.6 * level).filled(),
                ));
            }
        }
        chart.draw_series(cells).map_err(drawing_err)?;
    }
    draw_legend(&mut chart, &data.machines)?;

    let x_top = highest_density(&x_curves);
    let mut top_chart = ChartBuilder::on(&top_marg)
        .margin(10)
        .y_label_area_size(60)
        .build_cartesian_2d(x.range.clone(), 0f64..x_top * 1.05)
        .map_err(drawing_err)?;
    top_chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(3)
        .label_style((FONT, 10))
        .draw()
        .map_err(drawing_err)?;
    for (machine, curve) in x_curves.iter().enumerate() {
        if let Some(curve) = curve {
            let outline = density_outline(curve, &x.range, false);
            let color = palette(machine);
            top_chart
                .draw_series(std::iter::once(Polygon::new(outline.clone(), color.mix(0.25).filled())))
                .map_err(drawing_err)?;
            top_chart
                .draw_series(std::iter::once(PathElement::new(outline, color.stroke_width(1))))
                .map_err(drawing_err)?;
        }
    }

    let y_top = highest_density(&y_curves);
    let mut right_chart = ChartBuilder::on(&right)
        .margin(10)
        .x_label_area_size(40)
        .build_cartesian_2d(0f64..y_top * 1.05, yr.clone())
        .map_err(drawing_err)?;
    right_chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_labels(3)
        .label_style((FONT, 10))
        .draw()
        .map_err(drawing_err)?;
    for (machine, curve) in y_curves.iter().enumerate() {
        if let Some(curve) = curve {
            let outline = density_outline(curve, &yr, true);
            let color = palette(machine);
            right_chart
                .draw_series(std::iter::once(Polygon::new(outline.clone(), color.mix(0.25).filled())))
                .map_err(drawing_err)?;
            right_chart
                .draw_series(std::iter::once(PathElement::new(outline, color.stroke_width(1))))
                .map_err(drawing_err)?;
        }
    }
    Ok(())
}

/// renders the chart (as SVG) into a PDF document
fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, PlotError> {
    let mut options = svg2pdf::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = svg2pdf::usvg::Tree::from_str(svg, &options)
        .map_err(|e| PlotError::Pdf(e.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| PlotError::Pdf(format!("{:?}", e)))
}

/// Draws the charts of one run in one style and writes them to `outdir`.
#[derive(Debug, Clone)]
pub struct Renderer {
    style: PlotStyle,
    scenario: String,
    title: String,
    suffix: String,
    outdir: PathBuf,
}

impl Renderer {
    /// `suffix` is appended verbatim to the file stems
    pub fn new(style: PlotStyle, scenario: &str, suffix: &str, outdir: &Path) -> Renderer {
        let title = match scenario_label(scenario) {
            Some(label) => label.to_string(),
            None => {
                warn!("no label for scenario {}, using it as title", scenario);
                scenario.to_string()
            }
        };
        Renderer {
            style,
            scenario: scenario.to_string(),
            title,
            suffix: suffix.to_string(),
            outdir: outdir.to_path_buf(),
        }
    }

    /// the (pdf, png) files of a quantity
    pub fn output_paths(&self, quantity: Quantity) -> (PathBuf, PathBuf) {
        (
            quantity.output_path(&self.outdir, &self.scenario, &self.suffix, "pdf"),
            quantity.output_path(&self.outdir, &self.scenario, &self.suffix, "png"),
        )
    }

    fn size(&self) -> (u32, u32) {
        match self.style {
            PlotStyle::Joint => JOINT_SIZE,
            _ => FIGURE_SIZE,
        }
    }

    /// Plots every derived quantity of the table, returns the written files.
    /// All quantities are extracted before the first file is written.
    pub fn render_all(&self, table: &JobTable) -> Result<Vec<PathBuf>, PlotError> {
        let scans = Quantity::ALL
            .iter()
            .map(|q| ScanData::new(table, *q).map(|d| (*q, d)))
            .collect::<Result<Vec<(Quantity, ScanData)>, PlotError>>()?;
        if let Some((_, d)) = scans.first() {
            info!("unique machines for hue: {:?}", d.machines);
        }
        let mut written = Vec::with_capacity(2 * scans.len());
        for (quantity, data) in scans.iter() {
            info!("plotting {} as {}", quantity, self.style);
            let (pdf, png) = self.output_paths(*quantity);
            self.save_pdf(&pdf, data, *quantity)?;
            self.save_png(&png, data, *quantity)?;
            debug!("wrote {} and {}", pdf.display(), png.display());
            written.push(pdf);
            written.push(png);
        }
        Ok(written)
    }

    fn save_png(&self, path: &Path, data: &ScanData, quantity: Quantity) -> Result<(), PlotError> {
        let root = BitMapBackend::new(path, self.size()).into_drawing_area();
        self.draw(&root, data, quantity)?;
        root.present().map_err(drawing_err)
    }

    fn save_pdf(&self, path: &Path, data: &ScanData, quantity: Quantity) -> Result<(), PlotError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size()).into_drawing_area();
            self.draw(&root, data, quantity)?;
            root.present().map_err(drawing_err)?;
        }
        fs::write(path, svg_to_pdf(&svg)?)?;
        Ok(())
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        data: &ScanData,
        quantity: Quantity,
    ) -> Result<(), PlotError> {
        root.fill(&WHITE).map_err(drawing_err)?;
        let frame = Frame {
            title: &self.title,
            quantity,
        };
        match self.style {
            PlotStyle::Scatter => draw_scatter(root, &frame, data),
            PlotStyle::Point => draw_point(root, &frame, data),
            PlotStyle::Box => draw_box(root, &frame, data),
            PlotStyle::Boxen => draw_boxen(root, &frame, data),
            PlotStyle::Violin => draw_violin(root, &frame, data),
            PlotStyle::Joint => draw_joint(root, &frame, data),
        }
    }
}
