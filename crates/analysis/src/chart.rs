use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::FontStyle;
use protocol::api::GraphKind;

use crate::error::AnalysisError;
use crate::pipeline::Distribution;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 500;

const FONT_FAMILY: &str = "sans-serif";
const SENTIMENT_COLORS: [RGBColor; 3] = [
    RGBColor(59, 76, 192),
    RGBColor(221, 221, 221),
    RGBColor(180, 4, 38),
];
const RISK_COLORS: [RGBColor; 3] = [
    RGBColor(252, 187, 161),
    RGBColor(251, 106, 74),
    RGBColor(203, 24, 29),
];

struct Bar {
    label: &'static str,
    count: usize,
    color: RGBColor,
}

struct BarChart {
    title: &'static str,
    x_desc: &'static str,
    bars: Vec<Bar>,
}

impl BarChart {
    fn for_kind(kind: GraphKind, distribution: &Distribution) -> Self {
        match kind {
            GraphKind::SentimentDistribution => Self {
                title: "Sentiment Distribution of Chat Messages",
                x_desc: "Sentiment",
                bars: distribution
                    .sentiment
                    .iter()
                    .zip(SENTIMENT_COLORS)
                    .map(|(entry, color)| Bar {
                        label: entry.label.as_str(),
                        count: entry.count,
                        color,
                    })
                    .collect(),
            },
            GraphKind::RiskDistribution => Self {
                title: "Gang-Related Risk Level Distribution",
                x_desc: "Risk Level",
                bars: distribution
                    .risk
                    .iter()
                    .zip(RISK_COLORS)
                    .map(|(entry, color)| Bar {
                        label: entry.label.as_str(),
                        count: entry.count,
                        color,
                    })
                    .collect(),
            },
        }
    }

    fn bar(&self, value: &SegmentValue<u32>) -> Option<&Bar> {
        match value {
            SegmentValue::Exact(index) | SegmentValue::CenterOf(index) => {
                self.bars.get(*index as usize)
            }
            SegmentValue::Last => None,
        }
    }
}

/// Renders count bar charts as PNG files.
///
/// Titles and axis labels need a registered font; without one only the bars are
/// drawn.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    text: bool,
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: false,
        }
    }

    /// Registers the TrueType font at `path` for chart text. The font data stays
    /// loaded for the rest of the process.
    pub fn with_font(mut self, path: &Path) -> Result<Self, AnalysisError> {
        let data = std::fs::read(path).map_err(|err| AnalysisError::Font {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let data: &'static [u8] = Box::leak(data.into_boxed_slice());
        plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, data).map_err(|_| {
            AnalysisError::Font {
                path: path.to_path_buf(),
                reason: "invalid font data".to_string(),
            }
        })?;
        self.text = true;
        Ok(self)
    }

    pub fn has_text(&self) -> bool {
        self.text
    }

    /// Renders every chart into `dir`, replacing earlier files atomically.
    pub fn render_all(
        &self,
        distribution: &Distribution,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, AnalysisError> {
        let mut paths = Vec::with_capacity(GraphKind::ALL.len());
        for kind in GraphKind::ALL {
            let path = dir.join(kind.file_name());
            system_utils::fs::write_atomic_with(&path, |staging| {
                self.render(kind, distribution, staging)
            })?;
            paths.push(path);
        }
        Ok(paths)
    }

    pub fn render(
        &self,
        kind: GraphKind,
        distribution: &Distribution,
        path: &Path,
    ) -> Result<(), AnalysisError> {
        let chart = BarChart::for_kind(kind, distribution);
        self.draw(&chart, path)
    }

    fn draw(&self, chart: &BarChart, path: &Path) -> Result<(), AnalysisError> {
        let fail = |reason: String| AnalysisError::Chart {
            path: path.to_path_buf(),
            reason,
        };
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|err| fail(err.to_string()))?;

        let max_count = chart.bars.iter().map(|bar| bar.count).max().unwrap_or(0);
        let y_top = u32::try_from(max_count).unwrap_or(u32::MAX - 1) + 1;
        let last_index = chart.bars.len().saturating_sub(1) as u32;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if self.text {
            builder
                .caption(chart.title, (FONT_FAMILY, 24))
                .x_label_area_size(40)
                .y_label_area_size(50);
        }
        let mut context = builder
            .build_cartesian_2d((0u32..last_index).into_segmented(), 0u32..y_top)
            .map_err(|err| fail(err.to_string()))?;

        if self.text {
            context
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(chart.x_desc)
                .y_desc("Count")
                .x_label_formatter(&|value| {
                    chart
                        .bar(value)
                        .map(|bar| bar.label.to_string())
                        .unwrap_or_default()
                })
                .axis_desc_style((FONT_FAMILY, 16))
                .draw()
                .map_err(|err| fail(err.to_string()))?;
        }

        context
            .draw_series(
                Histogram::vertical(&context)
                    .margin(40)
                    .style_func(|value, _| {
                        chart
                            .bar(value)
                            .map(|bar| bar.color.filled())
                            .unwrap_or_else(|| BLACK.filled())
                    })
                    .data(
                        chart
                            .bars
                            .iter()
                            .enumerate()
                            .map(|(index, bar)| (index as u32, bar.count as u32)),
                    ),
            )
            .map_err(|err| fail(err.to_string()))?;

        root.present().map_err(|err| fail(err.to_string()))?;
        Ok(())
    }
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
