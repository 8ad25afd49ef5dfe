//! Retrieval criteria and the queries derived from them

use crate::graph::PropertyValue;
use crate::query::Params;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Filters for one retrieval call. Every field is optional; an absent
/// field adds no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    /// Case-sensitive substring of the company name
    pub company: Option<String>,
    /// Inclusive lower bound on `connected_on`, compared as a string
    pub connected_after: Option<String>,
    /// Inclusive upper bound on `connected_on`, compared as a string
    pub connected_before: Option<String>,
    pub industry: Option<String>,
    pub role_level: Option<String>,
    pub skills: Option<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loose key/value pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut criteria = Self::default();
        for (key, value) in pairs {
            let value = Some(value.into());
            match key.as_ref() {
                "company" => criteria.company = value,
                "connected_after" => criteria.connected_after = value,
                "connected_before" => criteria.connected_before = value,
                "industry" => criteria.industry = value,
                "role_level" => criteria.role_level = value,
                "skills" => criteria.skills = value,
                other => warn!("Ignoring unknown criteria key '{}'", other),
            }
        }
        criteria
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_connected_after(mut self, date: impl Into<String>) -> Self {
        self.connected_after = Some(date.into());
        self
    }

    pub fn with_connected_before(mut self, date: impl Into<String>) -> Self {
        self.connected_before = Some(date.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_role_level(mut self, role_level: impl Into<String>) -> Self {
        self.role_level = Some(role_level.into());
        self
    }

    pub fn with_skills(mut self, skills: impl Into<String>) -> Self {
        self.skills = Some(skills.into());
        self
    }

    /// Parameterized structured query over `(Person)-[:WORKS_AT]->(Company)`
    pub fn graph_query(&self) -> (String, Params) {
        let mut filters = Vec::new();
        let mut params = Params::new();

        let mut filter = |fragment: &str, key: &str, value: &Option<String>| {
            if let Some(value) = value {
                filters.push(fragment.to_string());
                params.insert(key.to_string(), PropertyValue::from(value.as_str()));
            }
        };
        filter("c.name CONTAINS $company", "company", &self.company);
        filter("p.connected_on >= $connected_after", "connected_after", &self.connected_after);
        filter("p.connected_on <= $connected_before", "connected_before", &self.connected_before);

        let mut query = String::from("MATCH (p:Person)-[:WORKS_AT]->(c:Company)");
        if !filters.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&filters.join(" AND "));
        }
        query.push_str(" RETURN p.name AS name, p.title AS title, c.name AS company, c.industry AS industry");
        (query, params)
    }

    /// Natural-language sentence for the semantic path. Always produced,
    /// even when every field is empty.
    pub fn semantic_query(&self) -> String {
        let mut sentence = format!(
            "Find professionals who are {} in the {} industry",
            self.role_level.as_deref().unwrap_or(""),
            self.industry.as_deref().unwrap_or("")
        );
        if let Some(skills) = &self.skills {
            sentence.push_str(" with expertise in ");
            sentence.push_str(skills);
        }
        sentence.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_criteria_means_no_filters() {
        let (query, params) = Criteria::new().graph_query();
        assert!(!query.contains("WHERE"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_filters_follow_present_keys() {
        let criteria = Criteria::new().with_company("Goo").with_connected_before("2024-01-01");
        let (query, params) = criteria.graph_query();
        assert!(query.contains("WHERE c.name CONTAINS $company AND p.connected_on <= $connected_before RETURN"));
        assert!(!query.contains("connected_after"));
        assert_eq!(params.get("company"), Some(&PropertyValue::from("Goo")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_values_never_enter_query_text() {
        let criteria = Criteria::new().with_company("x' OR 1=1 //");
        let (query, _) = criteria.graph_query();
        assert!(!query.contains("OR 1=1"));
        assert!(crate::query::parse_query(&query).is_ok());
    }

    #[test]
    fn test_from_pairs_ignores_unknown_keys() {
        let criteria = Criteria::from_pairs([("company", "Acme"), ("favourite_colour", "blue")]);
        assert_eq!(criteria, Criteria::new().with_company("Acme"));
    }

    #[test]
    fn test_semantic_query() {
        assert_eq!(
            Criteria::new().semantic_query(),
            "Find professionals who are in the industry"
        );
        let full = Criteria::new()
            .with_role_level("Senior")
            .with_industry("Technology")
            .with_skills("Rust, distributed systems");
        assert_eq!(
            full.semantic_query(),
            "Find professionals who are Senior in the Technology industry with expertise in Rust, distributed systems"
        );
    }
}
