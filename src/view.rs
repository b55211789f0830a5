use std::fmt::Write;

use chrono::NaiveDate;
use registry::models::{ProductRecord, ScoredMatch, SourceKind, VerificationResult};

use crate::boundary::{Boundary, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Verified,
    ClosestMatch,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub manufacturer: String,
    pub identifier: String,
    pub category: String,
    pub source_kind: SourceKind,
    pub issuance_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub confidence: u8,
}

impl Card {
    pub fn new(scored: &ScoredMatch) -> Self {
        let ProductRecord {
            identifier,
            display_name,
            manufacturer,
            category,
            issuance_date,
            expiry_date,
            source_kind,
        } = scored.record.clone();

        Self {
            title: display_name,
            manufacturer,
            identifier,
            category,
            source_kind,
            issuance_date,
            expiry_date,
            confidence: percent(scored.relevance_score),
        }
    }

    pub fn render(&self) -> Result<String, RenderError> {
        if self.identifier.trim().is_empty() {
            return Err(RenderError::MissingField("registration number"));
        }

        let mut out = format!(
            "{} ({}) | {} | {} | {}% match",
            self.title, self.identifier, self.manufacturer, self.category, self.confidence
        );
        if let Some(issued) = self.issuance_date {
            let _ = write!(out, " | issued {issued}");
        }
        if let Some(expires) = self.expiry_date {
            let _ = write!(out, " | expires {expires}");
        }

        Ok(out)
    }
}

/// Relevance fraction as a whole percentage.
pub fn percent(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Human-readable verification outcome. Every card renders inside its own
/// [`Boundary`], so one malformed record cannot blank the whole result.
#[derive(Debug, Clone)]
pub struct VerificationView {
    pub status: Status,
    pub headline: String,
    pub message: String,
    pub confidence: Option<u8>,
    pub primary: Option<Card>,
    pub alternatives: Vec<Card>,
    pub suggestions: Vec<String>,
    boundaries: Vec<Boundary>,
}

impl VerificationView {
    pub fn new(result: &VerificationResult) -> Self {
        let term = result.queried_term.trim();
        let primary = result.primary_match.as_ref().map(Card::new);

        let status = if result.is_verified {
            Status::Verified
        } else if primary.is_some() {
            Status::ClosestMatch
        } else {
            Status::NotFound
        };

        let headline = match (&status, &primary) {
            (Status::Verified, Some(card)) => format!(
                "Verified: {} is a registered {} product",
                card.title, card.source_kind
            ),
            (Status::ClosestMatch, _) => format!("Not verified: no registration matches \"{term}\""),
            _ => format!("Not found: \"{term}\""),
        };

        let alternatives: Vec<Card> = result.alternative_matches.iter().map(Card::new).collect();
        let boundaries = primary
            .iter()
            .map(|_| Boundary::new("primary"))
            .chain((0..alternatives.len()).map(|i| Boundary::new(format!("alternative {}", i + 1))))
            .collect();

        Self {
            status,
            headline,
            message: result.message.clone(),
            confidence: primary.as_ref().map(|card| card.confidence),
            primary,
            alternatives,
            suggestions: result.suggestions.clone(),
            boundaries,
        }
    }

    fn cards(&self) -> impl Iterator<Item = &Card> {
        self.primary.iter().chain(self.alternatives.iter())
    }

    pub fn boundary(&self, index: usize) -> Option<&Boundary> {
        self.boundaries.get(index)
    }

    pub fn render(&mut self) -> String {
        self.render_with(Card::render)
    }

    /// Renders every card with `render_card`, each isolated in its boundary.
    pub fn render_with<F>(&mut self, render_card: F) -> String
    where
        F: Fn(&Card) -> Result<String, RenderError>,
    {
        let mut out = format!("{}\n{}\n", self.headline, self.message);
        if let Some(confidence) = self.confidence {
            let _ = writeln!(out, "Confidence: {confidence}%");
        }

        let cards: Vec<Card> = self.cards().cloned().collect();
        let has_primary = self.primary.is_some();

        for (index, (card, boundary)) in cards.iter().zip(self.boundaries.iter_mut()).enumerate() {
            if index == 1 || (index == 0 && !has_primary) {
                out.push_str("Other possible matches:\n");
            }
            let _ = writeln!(out, "- {}", boundary.render(|| render_card(card)));
        }

        if !self.suggestions.is_empty() {
            out.push_str("Suggestions:\n");
            for suggestion in &self.suggestions {
                let _ = writeln!(out, "- {suggestion}");
            }
        }

        out
    }

    /// Clears a failed card so the next render tries it again.
    pub fn reset(&mut self, index: usize) {
        if let Some(boundary) = self.boundaries.get_mut(index) {
            boundary.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use registry::{
        memory::{Fixture, MemorySource},
        models::{Category, DrugRow, FoodRow},
        resolve::verify,
    };

    use super::*;

    fn source() -> MemorySource {
        MemorySource::new(Fixture {
            food: vec![FoodRow {
                registration_number: "FR-77".to_string(),
                product_name: Some("Aspirin Candy".to_string()),
                company_name: Some("Odd Sweets".to_string()),
                ..Default::default()
            }],
            drug: vec![DrugRow {
                registration_number: "DR-10".to_string(),
                generic_name: Some("Aspirin".to_string()),
                brand_name: Some("Aspilets".to_string()),
                manufacturer: Some("Unilab".to_string()),
                issuance_date: NaiveDate::from_ymd_opt(2021, 6, 1),
                ..Default::default()
            }],
        })
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1.0), 100);
        assert_eq!(percent(0.734), 73);
        assert_eq!(percent(1.7), 100);
        assert_eq!(percent(-0.2), 0);
    }

    #[tokio::test]
    async fn test_verified_view() {
        let result = verify(&source(), "DR-10", Category::All).await.unwrap();
        let mut view = VerificationView::new(&result);

        assert_eq!(view.status, Status::Verified);
        assert_eq!(view.confidence, Some(100));
        assert_eq!(view.headline, "Verified: Aspilets is a registered drug product");

        let text = view.render();
        assert!(text.contains("Aspilets (DR-10) | Unilab | Drug | 100% match | issued 2021-06-01"));
        assert!(!text.contains("Suggestions"));
    }

    #[tokio::test]
    async fn test_closest_match_view() {
        let result = verify(&source(), "aspirin", Category::All).await.unwrap();
        let mut view = VerificationView::new(&result);

        assert_eq!(view.status, Status::ClosestMatch);
        assert_eq!(view.alternatives.len(), 1);
        assert!(view.render().contains("Other possible matches:\n- Aspirin Candy (FR-77)"));
    }

    #[tokio::test]
    async fn test_not_found_view() {
        let result = verify(&source(), "nothing here", Category::All).await.unwrap();
        let mut view = VerificationView::new(&result);

        assert_eq!(view.status, Status::NotFound);
        assert_eq!(view.confidence, None);
        assert_eq!(view.headline, "Not found: \"nothing here\"");
        assert!(view.render().contains("Suggestions:\n- Check the registration number"));
    }

    #[tokio::test]
    async fn test_failing_card_isolated() {
        let result = verify(&source(), "aspirin", Category::All).await.unwrap();
        let mut view = VerificationView::new(&result);

        let text = view.render_with(|card| {
            if card.source_kind == SourceKind::Drug {
                panic!("layout overflow");
            }
            card.render()
        });

        assert!(text.contains("[primary] Something went wrong"));
        assert!(text.contains("Aspirin Candy (FR-77)"));
        assert!(view.boundary(0).unwrap().failure().is_some());
        assert!(view.boundary(1).unwrap().failure().is_none());

        view.reset(0);
        assert!(view.render().contains("Aspilets (DR-10)"));
    }
}
