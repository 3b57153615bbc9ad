//! FieldSchemaCatalog: the registry of wizard definitions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::WizardConfig;
use crate::error::CatalogError;

use super::builtin;
use super::definition::{ResolvedFields, WizardDefinition};
use super::taxonomy::TaxonomyKey;

/// On-disk catalog layout: `{ "wizards": [ ... ] }`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    wizards: Vec<WizardDefinition>,
}

/// Wizard definitions by id.
#[derive(Debug, Clone)]
pub struct FieldSchemaCatalog {
    wizards: BTreeMap<String, Arc<WizardDefinition>>,
    /// Run structural checks on every registered definition.
    strict: bool,
}

impl Default for FieldSchemaCatalog {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FieldSchemaCatalog {
    pub fn new(strict: bool) -> Self {
        Self {
            wizards: BTreeMap::new(),
            strict,
        }
    }

    /// Strict catalog holding the four built-in wizards.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::with_builtins(true)
    }

    pub fn with_builtins(strict: bool) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(strict);
        for definition in builtin::all() {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Catalog for a configured session: the built-in wizards plus an
    /// optional catalog file, checked as strictly as `config` asks.
    pub fn from_config(config: &WizardConfig, extra: Option<&Path>) -> crate::error::Result<Self> {
        config.validate()?;
        let mut catalog = Self::with_builtins(config.strict_catalog)?;
        if let Some(path) = extra {
            catalog.load_path(path)?;
        }
        Ok(catalog)
    }

    /// Add or replace a definition.
    pub fn register(
        &mut self,
        definition: WizardDefinition,
    ) -> Result<Arc<WizardDefinition>, CatalogError> {
        if self.strict {
            definition.validate()?;
        }
        debug!(
            wizard = %definition.id,
            steps = definition.steps.len(),
            groups = definition.groups.len(),
            "Registered wizard definition"
        );
        let definition = Arc::new(definition);
        self.wizards
            .insert(definition.id.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Register every wizard in a JSON catalog document. Returns how many
    /// definitions were loaded. Nothing is registered if any definition fails.
    pub fn load_json(&mut self, json: &str) -> Result<usize, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if self.strict {
            for definition in &file.wizards {
                definition.validate()?;
            }
        }
        let count = file.wizards.len();
        for definition in file.wizards {
            self.register(definition)?;
        }
        Ok(count)
    }

    pub fn load_path(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let count = self.load_json(&json)?;
        info!(path = %path.display(), count, "Loaded wizard catalog");
        Ok(count)
    }

    pub fn get(&self, wizard_id: &str) -> Result<Arc<WizardDefinition>, CatalogError> {
        self.wizards
            .get(wizard_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownWizard(wizard_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.wizards.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.wizards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wizards.is_empty()
    }

    /// Resolve the fields of one step of one wizard.
    pub fn resolve_fields(
        &self,
        wizard_id: &str,
        key: &TaxonomyKey,
        step_id: &str,
    ) -> Result<ResolvedFields, CatalogError> {
        Ok(self.get(wizard_id)?.resolve_fields(key, step_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"{
        "wizards": [
            {
                "id": "mini",
                "title": "Mini intake",
                "pathways": ["plab-img"],
                "steps": [
                    {
                        "id": "basics",
                        "title": "Basics",
                        "required_field_paths": ["basics.name"],
                        "fields": [
                            { "path": "basics.name", "label": "Name", "kind": { "type": "text" } }
                        ]
                    }
                ],
                "groups": [
                    {
                        "id": "img",
                        "applies_when": [ { "kind": "pathway_is", "value": "plab-img" } ],
                        "attach_to_step_id": "basics",
                        "fields": [
                            { "path": "basics.plab_status", "label": "PLAB status",
                              "kind": { "type": "select", "options": ["plab1", "plab2"] } }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn builtin_catalog_registers_all_wizards() {
        let catalog = FieldSchemaCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.get(builtin::CV_BUILDER).is_ok());
        assert!(catalog.get(builtin::PROFILE_INTAKE).is_ok());
        assert!(catalog.get(builtin::SPONSORSHIP_INTAKE).is_ok());
        assert!(catalog.get(builtin::MENTOR_ONBOARDING).is_ok());
    }

    #[test]
    fn load_json_catalog() {
        let mut catalog = FieldSchemaCatalog::default();
        assert_eq!(catalog.load_json(CATALOG_JSON).unwrap(), 1);

        let resolved = catalog
            .resolve_fields("mini", &TaxonomyKey::pathway("plab-img"), "basics")
            .unwrap();
        assert_eq!(resolved.fields.len(), 2);
        assert!(resolved.fields[0].is_required());
    }

    #[test]
    fn strict_load_rejects_invalid_definition_atomically() {
        let bad = CATALOG_JSON.replace("\"attach_to_step_id\": \"basics\"", "\"attach_to_step_id\": \"gone\"");
        let mut catalog = FieldSchemaCatalog::default();
        assert!(matches!(catalog.load_json(&bad), Err(CatalogError::DanglingStep { .. })));
        assert!(catalog.is_empty());

        let mut lenient = FieldSchemaCatalog::new(false);
        assert_eq!(lenient.load_json(&bad).unwrap(), 1);
    }

    #[test]
    fn load_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catalog.json");
        std::fs::write(&file, CATALOG_JSON).unwrap();

        let mut catalog = FieldSchemaCatalog::default();
        assert_eq!(catalog.load_path(&file).unwrap(), 1);
        assert!(matches!(
            catalog.load_path(&dir.path().join("missing.json")),
            Err(CatalogError::Io(_))
        ));
    }

    #[test]
    fn from_config_loads_builtins_and_extra_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catalog.json");
        std::fs::write(&file, CATALOG_JSON).unwrap();

        let catalog = FieldSchemaCatalog::from_config(&WizardConfig::default(), Some(&file)).unwrap();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.get("mini").is_ok());

        let missing = FieldSchemaCatalog::from_config(&WizardConfig::default(), Some(&dir.path().join("gone.json")));
        assert!(matches!(missing, Err(crate::error::Error::Catalog(CatalogError::Io(_)))));
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let config = WizardConfig {
            max_suggestions: 0,
            ..WizardConfig::default()
        };
        let err = FieldSchemaCatalog::from_config(&config, None).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[test]
    fn unknown_wizard_is_an_error() {
        let catalog = FieldSchemaCatalog::default();
        assert!(matches!(
            catalog.resolve_fields("nope", &TaxonomyKey::pathway("x"), "s"),
            Err(CatalogError::UnknownWizard(_))
        ));
    }
}
