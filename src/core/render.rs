use crate::core::interpretation::{Interpretation, PositionReading};
use std::fmt::Write;
use std::str::FromStr;

pub trait CardRenderer: Send + Sync {
    fn render_card(&self, reading: &PositionReading) -> String;
}

pub trait ContentRenderer: Send + Sync {
    fn render(&self, interpretation: &Interpretation) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Markdown,
    Plain,
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(format!("unknown format '{}', expected markdown or plain", other)),
        }
    }
}

pub fn renderer_for(format: RenderFormat) -> Box<dyn ContentRenderer> {
    match format {
        RenderFormat::Markdown => Box::new(MarkdownRenderer),
        RenderFormat::Plain => Box::new(PlainTextRenderer),
    }
}

fn orientation(reading: &PositionReading) -> &'static str {
    if reading.is_reversed {
        "reversed"
    } else {
        "upright"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl CardRenderer for MarkdownRenderer {
    fn render_card(&self, reading: &PositionReading) -> String {
        let mut out = format!(
            "### {}. {}\n\n**{}** ({})\n\n{}\n",
            reading.position_id,
            reading.position_title,
            reading.card_name,
            orientation(reading),
            reading.meaning.interpretation
        );
        if !reading.meaning.keywords.is_empty() {
            let _ = write!(out, "\n_{}_\n", reading.meaning.keywords.join(", "));
        }
        out
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, interpretation: &Interpretation) -> String {
        let mut out = format!(
            "## {} {}\n",
            interpretation.icon, interpretation.spread_name_key
        );
        for reading in &interpretation.readings {
            out.push('\n');
            out.push_str(&self.render_card(reading));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl CardRenderer for PlainTextRenderer {
    fn render_card(&self, reading: &PositionReading) -> String {
        format!(
            "{}. {}: {} ({}) - {}",
            reading.position_id,
            reading.position_title,
            reading.card_name,
            orientation(reading),
            reading.meaning.interpretation
        )
    }
}

impl ContentRenderer for PlainTextRenderer {
    fn render(&self, interpretation: &Interpretation) -> String {
        interpretation
            .readings
            .iter()
            .map(|r| self.render_card(r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
