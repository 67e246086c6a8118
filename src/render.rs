//! Presentation values derived from a [`ProgressResult`].
//!
//! Nothing here touches a display surface; front-ends read the strings and
//! fractions off a [`RenderModel`] and draw them however they like.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::{
    COLOR_LIGHTNESS, COLOR_SATURATION, DateOnly, GAUGE_RADIUS, Hue, Mode, PRECISE_DECIMALS, Percent, ProgressResult,
};

/// How the percentage text is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentStyle {
    /// Five decimal places, so live progress visibly moves
    #[default]
    #[display(fmt = "precise")]
    Precise,
    /// One decimal place with a trailing `.0` dropped
    #[display(fmt = "compact")]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid percent style: {0} (expected 'precise' or 'compact')")]
pub struct StyleError(String);

impl FromStr for PercentStyle {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precise" => Ok(Self::Precise),
            "compact" => Ok(Self::Compact),
            _ => Err(StyleError(s.to_owned())),
        }
    }
}

impl PercentStyle {
    pub fn format(self, percent: Percent) -> String {
        match self {
            Self::Precise => format!("{:.*}", PRECISE_DECIMALS, percent.get()),
            Self::Compact => {
                let text = format!("{:.1}", percent.get());
                text.strip_suffix(".0").map_or(text.clone(), str::to_owned)
            },
        }
    }
}

/// 0% is red (0), 50% yellow (60), 100% green (120)
pub fn hue_for_progress(percent: Percent) -> Hue {
    Hue::from_percent(percent)
}

/// CSS `hsl()` colour of the progress fill
pub fn color_for_progress(percent: Percent) -> String {
    format!(
        "hsl({}, {COLOR_SATURATION}%, {COLOR_LIGHTNESS}%)",
        hue_for_progress(percent)
    )
}

/// `"<elapsed> of <total> days"`
pub fn status_label(result: &ProgressResult) -> String {
    format!("{} of {} days", result.elapsed_days, result.total_days)
}

/// Circumference of a gauge ring of the given radius
pub fn gauge_circumference(radius: f64) -> f64 {
    2.0 * PI * radius
}

/// Stroke dash offset that leaves `fill` (0..=1) of the ring drawn
pub fn gauge_dash_offset(circumference: f64, fill: f64) -> f64 {
    circumference * (1.0 - fill.clamp(0.0, 1.0))
}

/// Medium-style date label, e.g. `Jan 5, 2024`
pub fn date_label(date: DateOnly) -> String {
    date.naive().format("%b %-d, %Y").to_string()
}

/// Everything a front-end needs to draw one progress state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub mode:              Mode,
    pub percent_text:      String,
    pub status_text:       String,
    pub color:             String,
    pub hue:               Hue,
    pub gauge_fill:        f64,
    pub gauge_dash_offset: f64,
    pub timeline_fill:     f64,
    pub marker_offset:     f64,
    pub start_label:       String,
    pub today_label:       String,
    pub end_label:         String,
}

impl RenderModel {
    /// Builds the model for `result`; `today` is the manual date or, in live
    /// mode, the clock's current date.
    pub fn new(result: &ProgressResult, style: PercentStyle, start: DateOnly, today: DateOnly, end: DateOnly) -> Self {
        let fill = result.percent.fraction();
        let circumference = gauge_circumference(GAUGE_RADIUS);

        Self {
            mode: result.mode,
            percent_text: style.format(result.percent),
            status_text: status_label(result),
            color: color_for_progress(result.percent),
            hue: hue_for_progress(result.percent),
            gauge_fill: fill,
            gauge_dash_offset: gauge_dash_offset(circumference, fill),
            timeline_fill: fill,
            marker_offset: result.marker_percent.fraction(),
            start_label: date_label(start),
            today_label: date_label(today),
            end_label: date_label(end),
        }
    }
}
