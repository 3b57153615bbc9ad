//! Built-in keyword suggestions for CV building, keyed by specialty and
//! region.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::EnrichmentError;

use super::provider::{SuggestionProvider, SuggestionQuery};

const GENERAL: &[&str] = &[
    "clinical governance",
    "quality improvement",
    "clinical audit",
    "MDT working",
    "teaching",
];

/// In-memory keyword table. Query value 0 is the specialty, value 1 the
/// region.
#[derive(Debug, Clone)]
pub struct StaticKeywordProvider {
    specialties: BTreeMap<String, Vec<String>>,
    regions: BTreeMap<String, Vec<String>>,
}

impl Default for StaticKeywordProvider {
    fn default() -> Self {
        let mut provider = Self {
            specialties: BTreeMap::new(),
            regions: BTreeMap::new(),
        };
        provider.specialty("internal medicine", &["acute medical take", "ward rounds", "MRCP", "sepsis management", "discharge planning"]);
        provider.specialty("cardiology", &["ECG interpretation", "echocardiography", "heart failure", "ACS pathway", "cardiac catheterisation"]);
        provider.specialty("emergency medicine", &["resuscitation", "triage", "ALS", "ATLS", "major trauma"]);
        provider.specialty("general practice", &["chronic disease management", "QOF", "MRCGP", "safeguarding", "prescribing"]);
        provider.specialty("psychiatry", &["mental state examination", "risk assessment", "Mental Health Act", "MRCPsych", "CAMHS"]);
        provider.specialty("surgery", &["theatre experience", "MRCS", "surgical logbook", "pre-operative assessment", "laparoscopy"]);
        provider.specialty("paediatrics", &["neonatal life support", "MRCPCH", "safeguarding children", "PICU", "developmental assessment"]);
        provider.region("london", &["London deanery", "tertiary referral centre", "major trauma centre"]);
        provider.region("north-west", &["North West deanery", "district general hospital"]);
        provider.region("scotland", &["NHS Scotland", "remote and rural medicine"]);
        provider.region("wales", &["NHS Wales", "Welsh language (optional)"]);
        provider
    }
}

impl StaticKeywordProvider {
    pub fn specialty(&mut self, name: &str, keywords: &[&str]) {
        self.specialties.insert(
            name.to_lowercase(),
            keywords.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn region(&mut self, name: &str, keywords: &[&str]) {
        self.regions.insert(
            name.to_lowercase(),
            keywords.iter().map(|s| s.to_string()).collect(),
        );
    }

    fn lookup_specialty(&self, raw: &str) -> Option<&Vec<String>> {
        let needle = raw.trim().to_lowercase();
        self.specialties.get(&needle).or_else(|| {
            self.specialties
                .iter()
                .find(|(name, _)| needle.contains(name.as_str()) || name.contains(&needle))
                .map(|(_, keywords)| keywords)
        })
    }
}

#[async_trait]
impl SuggestionProvider for StaticKeywordProvider {
    fn name(&self) -> &str {
        "static-keywords"
    }

    async fn suggest(&self, query: &SuggestionQuery) -> Result<Vec<String>, EnrichmentError> {
        let specialty = query.get(0).ok_or_else(|| EnrichmentError::LookupFailed {
            reason: "query has no specialty".to_string(),
        })?;

        let mut keywords: Vec<String> = match self.lookup_specialty(specialty) {
            Some(found) => found.clone(),
            None => GENERAL.iter().map(|s| s.to_string()).collect(),
        };
        if let Some(regional) = query
            .get(1)
            .and_then(|region| self.regions.get(&region.trim().to_lowercase()))
        {
            keywords.extend(regional.iter().cloned());
        }
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn specialty_and_region_keywords() {
        let provider = StaticKeywordProvider::default();
        let result = provider
            .suggest(&SuggestionQuery::new(["Internal Medicine", "london"]))
            .await
            .unwrap();
        assert!(result.contains(&"acute medical take".to_string()));
        assert!(result.contains(&"London deanery".to_string()));
    }

    #[tokio::test]
    async fn partial_specialty_match() {
        let provider = StaticKeywordProvider::default();
        let result = provider
            .suggest(&SuggestionQuery::new(["Paediatrics and Child Health"]))
            .await
            .unwrap();
        assert!(result.contains(&"MRCPCH".to_string()));
    }

    #[tokio::test]
    async fn unknown_specialty_gets_general_keywords() {
        let provider = StaticKeywordProvider::default();
        let result = provider
            .suggest(&SuggestionQuery::new(["Dermatology", "midlands"]))
            .await
            .unwrap();
        assert_eq!(result.len(), GENERAL.len());
    }

    #[tokio::test]
    async fn empty_query_fails() {
        let provider = StaticKeywordProvider::default();
        let empty: [&str; 0] = [];
        assert!(provider.suggest(&SuggestionQuery::new(empty)).await.is_err());
    }
}
