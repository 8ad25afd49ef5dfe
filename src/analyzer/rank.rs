//! Fusion of structured and semantic results into one ranking

use super::criteria::Criteria;
use crate::config::RetrievalConfig;
use serde::Serialize;
use std::collections::HashMap;

/// One (Person, Company) row from the structured query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredMatch {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
}

/// One chunk returned by the semantic query
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub name: String,
    /// `None` when the engine exposes no score
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedConnection {
    pub name: String,
    pub score: f64,
}

/// Score every person and sort by score descending, then name ascending.
///
/// Each structured row adds `base_score` plus the industry and seniority
/// bonuses when they apply. Each semantic match at or above the cutoff adds
/// its similarity (or `default_similarity` when unscored).
pub fn fuse(
    structured: &[StructuredMatch],
    semantic: &[SemanticMatch],
    criteria: &Criteria,
    weights: &RetrievalConfig,
) -> Vec<RankedConnection> {
    let mut scores: HashMap<&str, f64> = HashMap::new();

    let industry = criteria.industry.as_deref().filter(|i| !i.is_empty());
    let wants_seniority = criteria.role_level.as_deref().is_some_and(|r| !r.is_empty());
    let marker = weights.seniority_marker.to_lowercase();

    for row in structured {
        let mut score = weights.base_score;
        if industry.is_some() && row.industry.as_deref() == industry {
            score += weights.industry_bonus;
        }
        if wants_seniority
            && row
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&marker))
        {
            score += weights.seniority_bonus;
        }
        *scores.entry(row.name.as_str()).or_insert(0.0) += score;
    }

    for hit in semantic {
        let similarity = match hit.score {
            Some(s) if s < weights.similarity_cutoff => continue,
            Some(s) => s,
            None => weights.default_similarity,
        };
        *scores.entry(hit.name.as_str()).or_insert(0.0) += similarity;
    }

    let mut ranked: Vec<RankedConnection> = scores
        .into_iter()
        .map(|(name, score)| RankedConnection {
            name: name.to_string(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, title: Option<&str>, industry: Option<&str>) -> StructuredMatch {
        StructuredMatch {
            name: name.to_string(),
            title: title.map(str::to_string),
            company: Some("Acme".to_string()),
            industry: industry.map(str::to_string),
        }
    }

    fn hit(name: &str, score: Option<f64>) -> SemanticMatch {
        SemanticMatch {
            name: name.to_string(),
            score,
        }
    }

    fn score_of(ranked: &[RankedConnection], name: &str) -> f64 {
        ranked.iter().find(|r| r.name == name).map(|r| r.score).unwrap()
    }

    #[test]
    fn test_both_paths_accumulate() {
        let ranked = fuse(
            &[row("Alice", None, None)],
            &[hit("Alice", Some(0.8)), hit("Bob", Some(0.9))],
            &Criteria::new(),
            &RetrievalConfig::default(),
        );
        assert!((score_of(&ranked, "Alice") - 1.8).abs() < 1e-9);
        assert!((score_of(&ranked, "Bob") - 0.9).abs() < 1e-9);
        assert_eq!(ranked[0].name, "Alice");
    }

    #[test]
    fn test_industry_bonus_requires_exact_match() {
        let criteria = Criteria::new().with_industry("Software");
        let ranked = fuse(
            &[
                row("Alice", None, Some("Software")),
                row("Bob", None, Some("Software Services")),
                row("Carol", None, None),
            ],
            &[],
            &criteria,
            &RetrievalConfig::default(),
        );
        assert_eq!(score_of(&ranked, "Alice"), 1.5);
        assert_eq!(score_of(&ranked, "Bob"), 1.0);
        assert_eq!(score_of(&ranked, "Carol"), 1.0);

        // no criterion, no bonus
        let plain = fuse(&[row("Alice", None, Some("Software"))], &[], &Criteria::new(), &RetrievalConfig::default());
        assert_eq!(plain[0].score, 1.0);
    }

    #[test]
    fn test_seniority_bonus() {
        let rows = [
            row("Alice", Some("SENIOR Engineer"), None),
            row("Bob", Some("Engineer"), None),
            row("Carol", None, None),
        ];
        let with_role = fuse(&rows, &[], &Criteria::new().with_role_level("Senior"), &RetrievalConfig::default());
        assert!((score_of(&with_role, "Alice") - 1.3).abs() < 1e-9);
        assert_eq!(score_of(&with_role, "Bob"), 1.0);
        assert_eq!(score_of(&with_role, "Carol"), 1.0);

        let without_role = fuse(&rows, &[], &Criteria::new(), &RetrievalConfig::default());
        assert_eq!(score_of(&without_role, "Alice"), 1.0);

        let empty_role = fuse(&rows, &[], &Criteria::new().with_role_level(""), &RetrievalConfig::default());
        assert_eq!(score_of(&empty_role, "Alice"), 1.0);
    }

    #[test]
    fn test_cutoff_and_default_similarity() {
        let ranked = fuse(
            &[],
            &[hit("Alice", Some(0.69)), hit("Bob", None), hit("Carol", Some(0.7))],
            &Criteria::new(),
            &RetrievalConfig::default(),
        );
        assert!(ranked.iter().all(|r| r.name != "Alice"));
        assert_eq!(score_of(&ranked, "Bob"), 0.5);
        assert_eq!(score_of(&ranked, "Carol"), 0.7);
    }

    #[test]
    fn test_ties_break_by_name() {
        let ranked = fuse(
            &[row("Zoe", None, None), row("Adam", None, None), row("Mia", None, None)],
            &[],
            &Criteria::new(),
            &RetrievalConfig::default(),
        );
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Adam", "Mia", "Zoe"]);
    }

    #[test]
    fn test_multiple_rows_per_person_accumulate() {
        let ranked = fuse(
            &[row("Alice", None, None), row("Alice", None, None)],
            &[hit("Alice", Some(0.75)), hit("Alice", Some(0.75))],
            &Criteria::new(),
            &RetrievalConfig::default(),
        );
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 3.5).abs() < 1e-9);
    }
}
