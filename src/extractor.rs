use scraper::{Html, Selector};

use crate::config::{ExtractorConfig, LabelConfig};
use crate::models::MatchData;
use crate::utils::error::{AppError, Result};

/// Pulls match fields out of a rendered page.
///
/// Missing fields resolve to defaults; an `Err` means the document itself
/// could not be used, not that some element was absent.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<MatchData>;
}

/// Extractor driven by the CSS selectors in [`ExtractorConfig`].
pub struct SelectorExtractor {
    period: Selector,
    home_score: Selector,
    away_score: Selector,
    home_team: Selector,
    away_team: Selector,
    period_marker: String,
    home_placeholder: String,
    away_placeholder: String,
}

impl SelectorExtractor {
    pub fn new(config: &ExtractorConfig, labels: &LabelConfig) -> Result<Self> {
        Ok(Self {
            period: parse_selector(&config.period_selector)?,
            home_score: parse_selector(&config.home_score_selector)?,
            away_score: parse_selector(&config.away_score_selector)?,
            home_team: parse_selector(&config.home_team_selector)?,
            away_team: parse_selector(&config.away_team_selector)?,
            period_marker: config.period_marker.clone(),
            home_placeholder: labels.home_team.clone(),
            away_placeholder: labels.away_team.clone(),
        })
    }

    fn first_text(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
    }
}

impl PageExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Result<MatchData> {
        // A browser always serializes at least an empty <html> skeleton, so a
        // blank string means the fetcher handed over no document at all
        if html.trim().is_empty() {
            return Err(AppError::Extraction("page content is empty".to_string()));
        }

        let document = Html::parse_document(html);

        let period = Self::first_text(&document, &self.period).unwrap_or_default();
        // A present-but-empty score element stays empty; only a missing one becomes "0"
        let home_score = Self::first_text(&document, &self.home_score).unwrap_or_else(|| "0".into());
        let away_score = Self::first_text(&document, &self.away_score).unwrap_or_else(|| "0".into());

        let home_team = Self::first_text(&document, &self.home_team)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.home_placeholder.clone());
        let away_team = Self::first_text(&document, &self.away_team)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.away_placeholder.clone());

        let match_started = match_started(&period, &home_score, &away_score, &self.period_marker);

        tracing::trace!(
            period = %period,
            home_score = %home_score,
            away_score = %away_score,
            match_started,
            "Extracted match fields"
        );

        Ok(MatchData {
            home_team,
            away_team,
            home_score,
            away_score,
            period,
            match_started,
        })
    }
}

/// True once the period text carries the period marker or either score holds a digit.
pub fn match_started(period: &str, home_score: &str, away_score: &str, period_marker: &str) -> bool {
    let has_digit = |s: &str| s.chars().any(|c| c.is_ascii_digit());
    period.contains(period_marker) || has_digit(home_score) || has_digit(away_score)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::Extraction(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}
