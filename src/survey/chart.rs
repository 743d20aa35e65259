// Charts of the questions.
//
// The geometry of a chart is computed first, in pixels, and then drawn on a plotters drawing
// area. The same chart is drawn on the SVG and on the bitmap backends.

use std::f64::consts::PI;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use survey_tally::{AnswerRow, Presentation, QuestionResult};

pub type Rgb = (u8, u8, u8);

/// Colours of the pie wedges, used in order.
pub const PIE_PALETTE: [Rgb; 2] = [(0xf4, 0x43, 0x36), (0x21, 0x96, 0xf3)];
pub const BAR_COLOR: Rgb = (0xa7, 0xc5, 0xeb);

/// Bar labels are cut to this number of characters.
pub const LABEL_MAX_CHARS: usize = 50;

pub const PIE_WIDTH: u32 = 600;
pub const PIE_HEIGHT: u32 = 350;

const TITLE_BAND: i32 = 30;
const FONT: &str = "sans-serif";

/// The text shown next to a wedge or a bar: `"<answer> - <percent> (<value>)"`.
pub fn legend_label(row: &AnswerRow) -> String {
    format!("{} - {} ({})", row.answer, row.percent, row.value)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// The size of a bar chart, as (width, height) in pixels.
///
/// Each option beyond the third adds 60 pixels of height, each character of the title 6 pixels of
/// width.
pub fn bar_dimensions(option_count: usize, title: &str) -> (u32, u32) {
    let height = 300 + 60 * (option_count as i64 - 3);
    let width = 600 + 6 * title.chars().count() as i64;
    (width as u32, height as u32)
}

#[derive(PartialEq, Debug, Clone)]
pub struct Wedge {
    pub answer: String,
    pub value: u64,
    pub legend: String,
    /// Angles in radians, counter-clockwise from the positive x axis.
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: Rgb,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PieChart {
    pub title: String,
    pub wedges: Vec<Wedge>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub value: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// From top to bottom.
    pub bars: Vec<Bar>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Chart {
    Pie(PieChart),
    Bar(BarChart),
}

impl Chart {
    /// The chart of a question, or `None` for the questions that are only tabulated.
    pub fn build(result: &QuestionResult) -> Option<Chart> {
        match result.presentation {
            Presentation::Pie => Some(Chart::Pie(pie_chart(&result.title, &result.chart_rows))),
            Presentation::Bar => Some(Chart::Bar(bar_chart(&result.title, &result.chart_rows))),
            Presentation::SkippedTable => None,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Chart::Pie(p) => &p.title,
            Chart::Bar(b) => &b.title,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Chart::Pie(_) => (PIE_WIDTH, PIE_HEIGHT),
            Chart::Bar(b) => (b.width, b.height),
        }
    }

    pub fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            self.title().to_string(),
            (10, 8),
            (FONT, 16).into_font(),
        ))?;
        match self {
            Chart::Pie(p) => draw_pie(p, root)?,
            Chart::Bar(b) => draw_bars(b, root)?,
        }
        root.present()
    }
}

/// Each row gets a wedge proportional to its share of the total. A zero total gives empty wedges.
pub fn pie_chart(title: &str, rows: &[AnswerRow]) -> PieChart {
    let total: u64 = rows.iter().map(|r| r.value).sum();
    let mut start = 0.0_f64;
    let mut wedges: Vec<Wedge> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let angle = if total > 0 {
            row.value as f64 / total as f64 * 2.0 * PI
        } else {
            0.0
        };
        wedges.push(Wedge {
            answer: row.answer.clone(),
            value: row.value,
            legend: legend_label(row),
            start_angle: start,
            end_angle: start + angle,
            color: PIE_PALETTE[idx % PIE_PALETTE.len()],
        });
        start += angle;
    }
    PieChart {
        title: title.to_string(),
        wedges,
    }
}

pub fn bar_chart(title: &str, rows: &[AnswerRow]) -> BarChart {
    let (width, height) = bar_dimensions(rows.len(), title);
    BarChart {
        title: title.to_string(),
        width,
        height,
        bars: rows
            .iter()
            .map(|r| Bar {
                label: truncate_chars(&legend_label(r), LABEL_MAX_CHARS),
                value: r.value,
            })
            .collect(),
    }
}

// ******** Pie ********

/// Centre and radius of the pie, in pixels.
pub fn pie_disc() -> ((i32, i32), i32) {
    let plot_height = PIE_HEIGHT as i32 - TITLE_BAND;
    // The pie sits at a third of the width, the legend on the right.
    let center = (PIE_WIDTH as i32 / 3, TITLE_BAND + plot_height / 2);
    let radius = (PIE_WIDTH as i32 * 4 / 15).min(plot_height / 2 - 10);
    (center, radius)
}

/// The outline of a wedge: the centre followed by points along the arc.
pub fn wedge_points(center: (i32, i32), radius: i32, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / (PI / 180.0)).ceil() as usize).max(1);
    let mut points = vec![center];
    for i in 0..=steps {
        let a = start + (end - start) * i as f64 / steps as f64;
        // The y axis points down in pixels.
        points.push((
            center.0 + (radius as f64 * a.cos()).round() as i32,
            center.1 - (radius as f64 * a.sin()).round() as i32,
        ));
    }
    points
}

fn draw_pie<DB: DrawingBackend>(
    chart: &PieChart,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (center, radius) = pie_disc();
    for w in chart.wedges.iter() {
        if w.end_angle <= w.start_angle {
            continue;
        }
        let points = wedge_points(center, radius, w.start_angle, w.end_angle);
        let color = RGBColor(w.color.0, w.color.1, w.color.2);
        root.draw(&Polygon::new(points.clone(), color.filled()))?;
        let mut outline = points;
        outline.push(center);
        root.draw(&PathElement::new(outline, WHITE.stroke_width(2)))?;
    }

    let legend_x = PIE_WIDTH as i32 * 31 / 50;
    for (idx, w) in chart.wedges.iter().enumerate() {
        let y = TITLE_BAND + 20 + 24 * idx as i32;
        let color = RGBColor(w.color.0, w.color.1, w.color.2);
        root.draw(&Rectangle::new(
            [(legend_x, y - 6), (legend_x + 12, y + 6)],
            color.filled(),
        ))?;
        let style = TextStyle::from((FONT, 13).into_font()).pos(Pos::new(HPos::Left, VPos::Center));
        root.draw(&Text::new(w.legend.clone(), (legend_x + 18, y), style))?;
    }
    Ok(())
}

// ******** Bars ********

#[derive(PartialEq, Debug, Clone)]
pub struct BarBox {
    pub label: String,
    /// Top-left and bottom-right corners, in pixels.
    pub rect: [(i32, i32); 2],
}

#[derive(PartialEq, Debug, Clone)]
pub struct BarLayout {
    /// Top-left and bottom-right corners of the plotting area.
    pub plot: [(i32, i32); 2],
    pub bars: Vec<BarBox>,
    /// Position and text of the ticks of the x axis.
    pub ticks: Vec<(i32, String)>,
}

/// Places the bars: every row gets a band of equal height, the bar fills 80% of it and its
/// length is proportional to the largest value.
pub fn bar_layout(chart: &BarChart) -> BarLayout {
    let width = chart.width as i32;
    let height = chart.height as i32;
    let longest_label = chart
        .bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0) as i32;
    let label_area = (longest_label * 7 + 16).min(width / 2);
    let plot = [(label_area, TITLE_BAND + 10), (width - 20, height - 30)];
    let plot_width = (plot[1].0 - plot[0].0).max(1);
    let plot_height = (plot[1].1 - plot[0].1).max(1);

    let max_value = chart.bars.iter().map(|b| b.value).max().unwrap_or(0).max(1);
    let n = chart.bars.len().max(1) as f64;
    let band = plot_height as f64 / n;

    let bars = chart
        .bars
        .iter()
        .enumerate()
        .map(|(idx, b)| {
            let top = plot[0].1 as f64 + band * idx as f64;
            let length = (b.value as f64 / max_value as f64 * plot_width as f64).round() as i32;
            BarBox {
                label: b.label.clone(),
                rect: [
                    (plot[0].0, (top + band * 0.1).round() as i32),
                    (plot[0].0 + length, (top + band * 0.9).round() as i32),
                ],
            }
        })
        .collect();

    let step = ((max_value as f64 / 5.0).ceil() as u64).max(1);
    let ticks = (0..=max_value / step)
        .map(|i| {
            let v = i * step;
            let x = plot[0].0 + (v as f64 / max_value as f64 * plot_width as f64).round() as i32;
            (x, v.to_string())
        })
        .collect();

    BarLayout { plot, bars, ticks }
}

fn draw_bars<DB: DrawingBackend>(
    chart: &BarChart,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let layout = bar_layout(chart);
    let fill = RGBColor(BAR_COLOR.0, BAR_COLOR.1, BAR_COLOR.2);
    let label_style =
        TextStyle::from((FONT, 12).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    for b in layout.bars.iter() {
        if b.rect[1].0 > b.rect[0].0 {
            root.draw(&Rectangle::new(b.rect, fill.filled()))?;
        }
        let y = (b.rect[0].1 + b.rect[1].1) / 2;
        root.draw(&Text::new(
            b.label.clone(),
            (layout.plot[0].0 - 6, y),
            label_style.clone(),
        ))?;
    }

    let [(left, top), (right, bottom)] = layout.plot;
    let axis = BLACK.stroke_width(1);
    root.draw(&PathElement::new(vec![(left, top), (left, bottom)], axis))?;
    root.draw(&PathElement::new(vec![(left, bottom), (right, bottom)], axis))?;
    let tick_style = TextStyle::from((FONT, 11).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (x, text) in layout.ticks.iter() {
        root.draw(&PathElement::new(vec![(*x, bottom), (*x, bottom + 4)], axis))?;
        root.draw(&Text::new(text.clone(), (*x, bottom + 6), tick_style.clone()))?;
    }
    Ok(())
}

/// Whether text can be rasterized on this machine. Bitmap exports fail without system fonts.
#[cfg(test)]
pub(crate) fn fonts_available() -> bool {
    let mut buffer = vec![0u8; 3 * 16 * 16];
    let root = BitMapBackend::with_buffer(&mut buffer, (16, 16)).into_drawing_area();
    let drawn = root.draw(&Text::new("a", (0, 0), (FONT, 12).into_font()));
    if drawn.is_err() {
        log::warn!("No usable system font, skipping the bitmap checks");
    }
    drawn.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_tally::builder::Builder;
    use survey_tally::{tally_question, SummaryCell};

    fn row(answer: &str, value: u64, percent: &str) -> AnswerRow {
        AnswerRow {
            answer: answer.to_string(),
            value,
            percent: percent.to_string(),
        }
    }

    fn result_of(title: &str, answers: &[(&str, u64, &str)]) -> QuestionResult {
        let mut b = Builder::new(title);
        for (a, v, p) in answers {
            b.add_answer(a, *v, p).unwrap();
        }
        tally_question(&b.build()).unwrap()
    }

    /// The count at the end of a legend: `"Yes - 80% (8)"` gives 8.
    fn legend_count(legend: &str) -> u64 {
        let open = legend.rfind('(').unwrap();
        legend[open + 1..legend.len() - 1].parse().unwrap()
    }

    #[test]
    fn legend_format() {
        assert_eq!(legend_label(&row("Yes", 8, "80%")), "Yes - 80% (8)");
    }

    #[test]
    fn cardinality_selects_the_chart() {
        let pie = result_of("Q", &[("Yes", 8, "80%"), ("No", 2, "20%")]);
        assert!(matches!(Chart::build(&pie), Some(Chart::Pie(_))));
        let one = result_of("Q", &[("Yes", 8, "100%")]);
        assert!(matches!(Chart::build(&one), Some(Chart::Pie(_))));
        let bar = result_of("Q", &[("a", 1, "25%"), ("b", 1, "25%"), ("c", 2, "50%")]);
        assert!(matches!(Chart::build(&bar), Some(Chart::Bar(_))));
    }

    #[test]
    fn skipped_questions_have_no_chart() {
        let mut b = Builder::new("Q").skipped(true);
        b.add_count("A", 5).unwrap();
        let res = tally_question(&b.build()).unwrap();
        assert_eq!(Chart::build(&res), None);
    }

    #[test]
    fn pie_wedges_cover_the_circle() {
        let res = result_of("Do you like X?", &[("Yes", 8, "80%"), ("No", 2, "20%")]);
        let pie = match Chart::build(&res) {
            Some(Chart::Pie(p)) => p,
            x => panic!("expected a pie, got {:?}", x),
        };
        assert_eq!(pie.wedges.len(), 2);
        // Increasing counts for small questions.
        assert_eq!(pie.wedges[0].answer, "No");
        assert_eq!(pie.wedges[0].color, PIE_PALETTE[0]);
        assert_eq!(pie.wedges[1].color, PIE_PALETTE[1]);
        let no = pie.wedges[0].end_angle - pie.wedges[0].start_angle;
        let yes = pie.wedges[1].end_angle - pie.wedges[1].start_angle;
        assert!((no - 0.2 * 2.0 * PI).abs() < 1e-9);
        assert!((yes - 0.8 * 2.0 * PI).abs() < 1e-9);
        assert_eq!(pie.wedges[0].start_angle, 0.0);
        assert!((pie.wedges[1].end_angle - 2.0 * PI).abs() < 1e-9);
        assert_eq!(pie.wedges[1].legend, "Yes - 80% (8)");
    }

    #[test]
    fn pie_with_zero_total() {
        let pie = pie_chart("Q", &[row("a", 0, "0%"), row("b", 0, "0%")]);
        assert!(pie.wedges.iter().all(|w| w.start_angle == 0.0 && w.end_angle == 0.0));
    }

    #[test]
    fn palette_repeats_beyond_two_wedges() {
        let pie = pie_chart("Q", &[row("a", 1, "x"), row("b", 1, "x"), row("c", 1, "x")]);
        assert_eq!(pie.wedges[2].color, PIE_PALETTE[0]);
    }

    #[test]
    fn bar_chart_size() {
        assert_eq!(bar_dimensions(3, ""), (600, 300));
        assert_eq!(bar_dimensions(5, "Which tools?"), (600 + 6 * 12, 420));
        // Characters, not bytes.
        assert_eq!(bar_dimensions(4, "도구"), (612, 360));
        let res = result_of(
            "Which tools?",
            &[("a", 1, "25%"), ("b", 1, "25%"), ("c", 2, "50%"), ("d", 0, "0%")],
        );
        match Chart::build(&res) {
            Some(chart) => assert_eq!(chart.size(), (672, 360)),
            None => panic!("expected a chart"),
        }
    }

    #[test]
    fn bar_labels_are_truncated() {
        let long = "x".repeat(80);
        let chart = bar_chart("Q", &[row(&long, 3, "30%"), row("b", 3, "30%"), row("c", 4, "40%")]);
        assert_eq!(chart.bars[0].label.chars().count(), LABEL_MAX_CHARS);
        assert_eq!(chart.bars[1].label, "b - 30% (3)");
    }

    #[test]
    fn bar_layout_fits_the_plot() {
        let chart = bar_chart(
            "Which tools do you use?",
            &[row("Saw", 5, "50%"), row("Hammer", 3, "30%"), row("Drill", 2, "20%")],
        );
        let layout = bar_layout(&chart);
        let [(left, top), (right, bottom)] = layout.plot;
        assert_eq!(layout.bars.len(), 3);
        // The largest value spans the whole plot.
        assert_eq!(layout.bars[0].rect[1].0, right);
        for b in layout.bars.iter() {
            assert_eq!(b.rect[0].0, left);
            assert!(b.rect[0].1 >= top && b.rect[1].1 <= bottom);
        }
        // Rows go from top to bottom.
        assert!(layout.bars[0].rect[0].1 < layout.bars[1].rect[0].1);
        assert!(layout.bars[1].rect[0].1 < layout.bars[2].rect[0].1);
        assert_eq!(layout.ticks.first(), Some(&(left, "0".to_string())));
    }

    #[test]
    fn wedge_outline_starts_at_the_centre() {
        let points = wedge_points((100, 100), 50, 0.0, PI / 2.0);
        assert_eq!(points[0], (100, 100));
        assert_eq!(points[1], (150, 100));
        assert_eq!(*points.last().unwrap(), (100, 50));
    }

    #[test]
    fn legend_counts_match_the_summary_total() {
        let res = result_of(
            "Which tools?",
            &[("Hammer", 3, "30%"), ("Saw", 5, "50%"), ("Drill", 2, "20%")],
        );
        let legends: Vec<String> = match Chart::build(&res) {
            Some(Chart::Bar(b)) => b.bars.iter().map(|b| b.label.clone()).collect(),
            Some(Chart::Pie(p)) => p.wedges.iter().map(|w| w.legend.clone()).collect(),
            None => panic!("expected a chart"),
        };
        let from_chart: u64 = legends.iter().map(|l| legend_count(l)).sum();
        assert_eq!(res.summary.rows[0].last(), Some(&SummaryCell::Count(from_chart)));
    }

    #[test]
    fn draws_on_both_backends() {
        if !fonts_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let res = result_of("Do you like X?", &[("Yes", 8, "80%"), ("No", 2, "20%")]);
        let chart = Chart::build(&res).unwrap();
        let size = chart.size();
        let svg = dir.path().join("chart.svg");
        let png = dir.path().join("chart.png");
        chart
            .draw(&SVGBackend::new(&svg, size).into_drawing_area())
            .unwrap();
        chart
            .draw(&BitMapBackend::new(&png, size).into_drawing_area())
            .unwrap();
        assert!(std::fs::read_to_string(&svg).unwrap().contains("<svg"));
        assert!(png.is_file());
    }
}
