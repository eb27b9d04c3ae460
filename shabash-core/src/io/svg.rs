//! SVG rendering of a location report.
//!
//! Top-down (x/y) view showing:
//! - Difference points, coloured on a red-to-green ramp
//! - Per-layer candidates labelled with their altitude
//! - The fitted line projected onto the ground plane
//! - The ground intersection
//! - Optional reference source locations

use crate::core::Point3;
use crate::pipeline::LocationReport;
use std::fmt::Write;
use std::path::Path;

/// SVG color scheme for visualization
#[derive(Clone, Debug)]
pub struct SvgColorScheme {
    /// Inlier candidate color
    pub candidate: &'static str,
    /// Outlier candidate color
    pub outlier: &'static str,
    /// Fitted line color
    pub line: &'static str,
    /// Ground intersection color
    pub intersection: &'static str,
    /// Configured source location color
    pub expected_source: &'static str,
    /// Surveyed source location color
    pub real_source: &'static str,
}

impl Default for SvgColorScheme {
    fn default() -> Self {
        Self {
            candidate: "#2222AA",
            outlier: "#888888",
            line: "#AA22AA",
            intersection: "#000000",
            expected_source: "#FF8800",
            real_source: "#00AAAA",
        }
    }
}

/// Configuration for SVG rendering
#[derive(Clone, Debug)]
pub struct SvgConfig {
    /// Plot area width in pixels; height follows the data aspect ratio
    pub plot_width: f64,
    /// Difference point radius
    pub point_radius: f64,
    /// Candidate marker radius
    pub candidate_radius: f64,
    /// Fitted line width
    pub line_width: f64,
    /// Values at or below the first map to red, at or above the second to green
    pub value_range: (f64, f64),
    /// Color scheme
    pub colors: SvgColorScheme,
    /// Padding around the plot in pixels
    pub padding: f64,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            plot_width: 800.0,
            point_radius: 3.0,
            candidate_radius: 6.0,
            line_width: 2.0,
            value_range: (-50.0, 50.0),
            colors: SvgColorScheme::default(),
            padding: 30.0,
        }
    }
}

/// World-to-pixel mapping over the data extent
#[derive(Clone, Copy, Debug)]
struct Frame {
    min_x: f64,
    min_y: f64,
    scale: f64,
    height_px: f64,
}

impl Frame {
    fn fit<'a>(points: impl Iterator<Item = &'a Point3>, width_px: f64) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points.filter(|p| p.is_finite()) {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        if min_x > max_x {
            (min_x, max_x, min_y, max_y) = (0.0, 1.0, 0.0, 1.0);
        }

        // Keep a square frame around single points
        let span = (max_x - min_x).max(max_y - min_y);
        let span = if span > 0.0 { span } else { 1.0 };
        let span_x = if max_x > min_x { max_x - min_x } else { span };
        let span_y = if max_y > min_y { max_y - min_y } else { span };
        let center_x = 0.5 * (min_x + max_x);
        let center_y = 0.5 * (min_y + max_y);

        let scale = width_px / span_x;
        Self {
            min_x: center_x - 0.5 * span_x,
            min_y: center_y - 0.5 * span_y,
            scale,
            height_px: span_y * scale,
        }
    }

    /// Pixel coordinates; SVG Y-axis is flipped (0 at top)
    fn project(&self, p: &Point3) -> (f64, f64) {
        (
            (p.x - self.min_x) * self.scale,
            self.height_px - (p.y - self.min_y) * self.scale,
        )
    }
}

/// Red-to-green ramp for a difference value
pub fn value_color(value: f64, range: (f64, f64)) -> String {
    let (lo, hi) = range;
    let t = if hi > lo && value.is_finite() {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let red = (255.0 * (1.0 - t)).round() as u8;
    let green = (255.0 * t).round() as u8;
    format!("#{:02X}{:02X}00", red, green)
}

/// Escape text for use inside an SVG element
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// SVG visualization builder
pub struct SvgVisualizer<'a> {
    config: SvgConfig,
    report: &'a LocationReport,
    title: Option<String>,
    expected_source: Option<Point3>,
    real_source: Option<Point3>,
}

impl<'a> SvgVisualizer<'a> {
    /// Create a new SVG visualizer
    pub fn new(report: &'a LocationReport, config: SvgConfig) -> Self {
        Self {
            config,
            report,
            title: None,
            expected_source: None,
            real_source: None,
        }
    }

    /// Set a title to display
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Mark the configured (expected) source location
    pub fn with_expected_source(mut self, source: Option<Point3>) -> Self {
        self.expected_source = source;
        self
    }

    /// Mark the surveyed source location
    pub fn with_real_source(mut self, source: Option<Point3>) -> Self {
        self.real_source = source;
        self
    }

    fn frame(&self) -> Frame {
        let report = self.report;
        let intersection = report.intersection();
        let points = report
            .points
            .positions
            .iter()
            .chain(&report.candidates)
            .chain(std::iter::once(&intersection))
            .chain(self.expected_source.iter())
            .chain(self.real_source.iter());
        Frame::fit(points, self.config.plot_width)
    }

    fn legend_entries(&self) -> usize {
        3 + self.expected_source.is_some() as usize + self.real_source.is_some() as usize
    }

    /// Render to SVG string
    pub fn render(&self) -> String {
        let mut svg = String::new();
        let frame = self.frame();

        let padding = self.config.padding;
        let title_height = if self.title.is_some() { 30.0 } else { 0.0 };
        let legend_height = (self.legend_entries() * 20 + 25) as f64 + 10.0;

        let width = self.config.plot_width + 2.0 * padding;
        let height = frame.height_px + 2.0 * padding + title_height + legend_height;

        // SVG header
        writeln!(&mut svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#).unwrap();
        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
            width, height, width, height
        ).unwrap();
        writeln!(
            &mut svg,
            r##"  <rect width="100%" height="100%" fill="#F8F8F8"/>"##
        )
        .unwrap();

        if let Some(ref title) = self.title {
            writeln!(
                &mut svg,
                r##"  <text x="{:.0}" y="22" font-family="sans-serif" font-size="16" font-weight="bold" text-anchor="middle" fill="#333">{}</text>"##,
                width / 2.0, escape_xml(title)
            ).unwrap();
        }

        let plot_offset_y = padding + title_height;
        writeln!(
            &mut svg,
            r#"  <g transform="translate({:.0}, {:.0})">"#,
            padding, plot_offset_y
        )
        .unwrap();

        // Order: points, line, candidates, markers - so markers stay on top
        self.render_points(&mut svg, &frame);
        self.render_line(&mut svg, &frame);
        self.render_candidates(&mut svg, &frame);
        self.render_markers(&mut svg, &frame);

        writeln!(&mut svg, "  </g>").unwrap();

        let legend_y = plot_offset_y + frame.height_px + 10.0;
        self.render_legend(&mut svg, width, legend_y);

        writeln!(&mut svg, "</svg>").unwrap();

        svg
    }

    /// Render difference points
    fn render_points(&self, svg: &mut String, frame: &Frame) {
        let points = &self.report.points;
        writeln!(svg, r#"    <g id="difference-points" opacity="0.7">"#).unwrap();
        for (position, &value) in points.positions.iter().zip(&points.values) {
            let (px, py) = frame.project(position);
            writeln!(
                svg,
                r#"      <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"/>"#,
                px,
                py,
                self.config.point_radius,
                value_color(value, self.config.value_range)
            )
            .unwrap();
        }
        writeln!(svg, "    </g>").unwrap();
    }

    /// Render the fitted line across the candidates and the intersection
    fn render_line(&self, svg: &mut String, frame: &Frame) {
        let line = &self.report.line_fit.line;
        let intersection = self.report.intersection();

        let (mut t_min, mut t_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in self.report.candidates.iter().chain(std::iter::once(&intersection)) {
            let t = (*p - line.point).dot(&line.direction);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
        if !(t_min.is_finite() && t_max.is_finite()) {
            return;
        }

        let (x1, y1) = frame.project(&line.point_at(t_min));
        let (x2, y2) = frame.project(&line.point_at(t_max));
        writeln!(
            svg,
            r#"    <line id="fitted-line" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}" stroke-dasharray="6,4"/>"#,
            x1, y1, x2, y2, self.config.colors.line, self.config.line_width
        ).unwrap();
    }

    /// Render per-layer candidates with altitude labels
    fn render_candidates(&self, svg: &mut String, frame: &Frame) {
        let report = self.report;
        if report.candidates.is_empty() {
            return;
        }

        writeln!(svg, r#"    <g id="candidates">"#).unwrap();
        for (candidate, &inlier) in report.candidates.iter().zip(&report.line_fit.inliers) {
            let (px, py) = frame.project(candidate);
            let color = if inlier {
                self.config.colors.candidate
            } else {
                self.config.colors.outlier
            };
            writeln!(
                svg,
                r#"      <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" stroke="white" stroke-width="1"/>"#,
                px, py, self.config.candidate_radius, color
            ).unwrap();
            writeln!(
                svg,
                r##"      <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="{}" text-anchor="middle" dy="-8">{:.1}</text>"##,
                px, py, color, candidate.z
            ).unwrap();
        }
        writeln!(svg, "    </g>").unwrap();
    }

    /// Render intersection and reference markers
    fn render_markers(&self, svg: &mut String, frame: &Frame) {
        let colors = &self.config.colors;
        let markers = [
            (Some(self.report.intersection()), colors.intersection, "Estimate"),
            (self.expected_source, colors.expected_source, "Expected"),
            (self.real_source, colors.real_source, "Real"),
        ];

        writeln!(svg, r#"    <g id="markers">"#).unwrap();
        for (position, color, label) in markers {
            let Some(position) = position else {
                continue;
            };
            let (px, py) = frame.project(&position);
            let r = self.config.candidate_radius;
            writeln!(
                svg,
                r#"      <path d="M {:.1} {:.1} L {:.1} {:.1} M {:.1} {:.1} L {:.1} {:.1}" stroke="{}" stroke-width="2.5"/>"#,
                px - r, py - r, px + r, py + r, px - r, py + r, px + r, py - r, color
            ).unwrap();
            writeln!(
                svg,
                r##"      <text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="10" fill="{}" text-anchor="middle" dy="18">{}</text>"##,
                px, py, color, label
            ).unwrap();
        }
        writeln!(svg, "    </g>").unwrap();
    }

    /// Render legend
    fn render_legend(&self, svg: &mut String, svg_width: f64, y_offset: f64) {
        let colors = &self.config.colors;
        writeln!(
            svg,
            r#"  <g id="legend" font-family="sans-serif" font-size="12" transform="translate(0, {:.0})">"#,
            y_offset
        ).unwrap();

        let legend_height = (self.legend_entries() * 20 + 25) as f64;
        writeln!(
            svg,
            r##"    <rect x="10" y="0" width="{:.0}" height="{:.0}" fill="white" stroke="#CCC" stroke-width="1" rx="4"/>"##,
            svg_width - 20.0,
            legend_height
        ).unwrap();

        let mut entry_y = 20.0;
        let entries = [
            (true, colors.candidate, "Layer candidate (inlier)"),
            (true, colors.outlier, "Layer candidate (outlier)"),
            (true, colors.intersection, "Ground intersection"),
            (self.expected_source.is_some(), colors.expected_source, "Expected source"),
            (self.real_source.is_some(), colors.real_source, "Real source"),
        ];
        for (shown, color, label) in entries {
            if !shown {
                continue;
            }
            writeln!(
                svg,
                r#"    <circle cx="35" cy="{:.0}" r="6" fill="{}" stroke="white" stroke-width="1"/>"#,
                entry_y, color
            )
            .unwrap();
            writeln!(
                svg,
                r##"    <text x="60" y="{:.0}" fill="#333">{}</text>"##,
                entry_y + 4.0,
                label
            )
            .unwrap();
            entry_y += 20.0;
        }

        // Value ramp (right side)
        let (lo, hi) = self.config.value_range;
        let ramp_x = svg_width - 150.0;
        for (i, (value, text)) in [(lo, "Signal lost"), (hi, "Signal gained")].iter().enumerate() {
            let y = 10.0 + 20.0 * i as f64;
            writeln!(
                svg,
                r#"    <rect x="{:.0}" y="{:.0}" width="15" height="15" fill="{}"/>"#,
                ramp_x,
                y,
                value_color(*value, self.config.value_range)
            )
            .unwrap();
            writeln!(
                svg,
                r##"    <text x="{:.0}" y="{:.0}" fill="#333">{} ({})</text>"##,
                ramp_x + 20.0,
                y + 12.0,
                text,
                value
            )
            .unwrap();
        }

        writeln!(svg, "  </g>").unwrap();
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let svg_content = self.render();
        std::fs::write(path, svg_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::{FittedLine3D, LineFitResult};
    use crate::grid::{DifferencePoints, DifferenceSummary};

    fn report() -> LocationReport {
        let mut points = DifferencePoints::default();
        points.push(Point3::new(0.0, 0.0, 80.0), -60.0);
        points.push(Point3::new(4.0, 4.0, 90.0), 75.0);

        let line = FittedLine3D::new(Point3::new(1.0, 1.0, 80.0), Point3::new(1.0, 1.0, 10.0)).unwrap();
        let intersection = line.intersect_horizontal(77.0).unwrap();
        LocationReport {
            summary: DifferenceSummary::default(),
            layers: Vec::new(),
            candidates: vec![Point3::new(1.0, 1.0, 80.0), Point3::new(2.0, 2.0, 90.0)],
            line_fit: LineFitResult {
                line,
                intersection,
                inliers: vec![true, false],
                trials: 1,
                mean_inlier_distance: 0.0,
            },
            points,
        }
    }

    #[test]
    fn test_value_color() {
        assert_eq!(value_color(-50.0, (-50.0, 50.0)), "#FF0000");
        assert_eq!(value_color(100.0, (-50.0, 50.0)), "#00FF00");
        assert_eq!(value_color(0.0, (-50.0, 50.0)), "#808000");
        assert_eq!(value_color(f64::NAN, (-50.0, 50.0)), "#808000");
    }

    #[test]
    fn test_svg_render_basic() {
        let report = report();
        let svg = SvgVisualizer::new(&report, SvgConfig::default())
            .with_title("Field run")
            .render();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Field run"));
        assert!(svg.contains(r#"id="fitted-line""#));
        assert!(svg.contains(">80.0</text>"));
        assert!(svg.contains(">90.0</text>"));
        assert!(svg.contains("#FF0000"));
        assert!(svg.contains("#00FF00"));
        assert!(!svg.contains("Expected source"));
    }

    #[test]
    fn test_title_is_escaped() {
        assert_eq!(escape_xml("on & off <A>"), "on &amp; off &lt;A&gt;");

        let report = report();
        let svg = SvgVisualizer::new(&report, SvgConfig::default())
            .with_title("Tx on & <baseline>")
            .render();
        assert!(svg.contains(">Tx on &amp; &lt;baseline&gt;</text>"));
        assert!(!svg.contains("<baseline>"));
    }

    #[test]
    fn test_reference_markers() {
        let report = report();
        let svg = SvgVisualizer::new(&report, SvgConfig::default())
            .with_expected_source(Some(Point3::new(0.5, 0.5, 77.0)))
            .with_real_source(Some(Point3::new(0.6, 0.4, 77.0)))
            .render();
        assert!(svg.contains("Expected source"));
        assert!(svg.contains("Real source"));
    }

    #[test]
    fn test_frame_single_point() {
        let points = [Point3::new(3.0, 3.0, 0.0)];
        let frame = Frame::fit(points.iter(), 100.0);
        let (px, py) = frame.project(&points[0]);
        assert!((px - 50.0).abs() < 1e-9);
        assert!((py - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_svg_save() {
        let report = report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.svg");
        SvgVisualizer::new(&report, SvgConfig::default())
            .save(&path)
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("</svg>"));
    }
}
