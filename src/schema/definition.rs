//! Wizard definitions and conditional field resolution.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::draft::FieldPath;
use crate::error::CatalogError;

use super::field::{Constraint, FieldSpec};
use super::taxonomy::{TaxonomyKey, TaxonomyPredicate};

/// One step of a wizard and the fields it always shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub title: String,
    /// Paths that must be answered before leaving the step. Paths that are
    /// not rendered for the active key are ignored.
    #[serde(default)]
    pub required_field_paths: Vec<FieldPath>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl StepDefinition {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            required_field_paths: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn require(mut self, section: &str, field: &str) -> Self {
        self.required_field_paths.push(FieldPath::new(section, field));
        self
    }
}

/// A named bundle of fields attached to a step when the session key matches
/// any of its predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalFieldGroup {
    pub id: String,
    pub applies_when: Vec<TaxonomyPredicate>,
    pub attach_to_step_id: String,
    pub fields: Vec<FieldSpec>,
}

impl ConditionalFieldGroup {
    pub fn new(id: &str, attach_to_step_id: &str) -> Self {
        Self {
            id: id.to_string(),
            applies_when: Vec::new(),
            attach_to_step_id: attach_to_step_id.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn when(mut self, predicate: TaxonomyPredicate) -> Self {
        self.applies_when.push(predicate);
        self
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn is_active(&self, key: &TaxonomyKey) -> bool {
        self.applies_when.iter().any(|p| p.matches(key))
    }
}

/// Draft fields that feed the suggestion lookup, and where accepted
/// suggestions go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentTrigger {
    pub fields: Vec<FieldPath>,
    pub target: FieldPath,
}

/// Fields to render for one step under one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFields {
    pub step_id: String,
    pub fields: Vec<FieldSpec>,
    /// Ids of the conditional groups that contributed fields, in catalog order.
    pub groups: Vec<String>,
    /// The key was not recognised, so only base fields were resolved.
    pub unknown_key: bool,
}

impl ResolvedFields {
    pub fn get(&self, path: &FieldPath) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.path == *path)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }

    pub fn has_group(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g == id)
    }
}

/// A complete wizard: ordered steps, conditional groups and the taxonomy it
/// understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardDefinition {
    pub id: String,
    pub title: String,
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub groups: Vec<ConditionalFieldGroup>,
    /// Recognised pathway ids. Empty means every pathway is accepted.
    #[serde(default)]
    pub pathways: Vec<String>,
    /// Recognised template ids. Empty means every template is accepted.
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentTrigger>,
}

impl WizardDefinition {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            steps: Vec::new(),
            groups: Vec::new(),
            pathways: Vec::new(),
            templates: Vec::new(),
            enrichment: None,
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn group(mut self, group: ConditionalFieldGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn taxonomy(mut self, pathways: &[&str], templates: &[&str]) -> Self {
        self.pathways = pathways.iter().map(|s| s.to_string()).collect();
        self.templates = templates.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn enrich(mut self, fields: &[FieldPath], target: FieldPath) -> Self {
        self.enrichment = Some(EnrichmentTrigger {
            fields: fields.to_vec(),
            target,
        });
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step_by_id(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn is_known_key(&self, key: &TaxonomyKey) -> bool {
        let pathway_known =
            self.pathways.is_empty() || self.pathways.iter().any(|p| *p == key.pathway_id);
        let template_known = match key.template() {
            None => true,
            Some(t) => self.templates.is_empty() || self.templates.iter().any(|known| known == t),
        };
        pathway_known && template_known
    }

    /// Look up a field anywhere in the wizard, base or conditional.
    pub fn field_spec(&self, path: &FieldPath) -> Option<&FieldSpec> {
        self.steps
            .iter()
            .flat_map(|s| s.fields.iter())
            .chain(self.groups.iter().flat_map(|g| g.fields.iter()))
            .find(|f| f.path == *path)
    }

    /// Every field spec in the wizard, base fields first.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps
            .iter()
            .flat_map(|s| s.fields.iter())
            .chain(self.groups.iter().flat_map(|g| g.fields.iter()))
    }

    /// Fields to render for `step_id` under `key`.
    ///
    /// Base step fields come first, followed by the fields of every active
    /// group attached to the step, in catalog order. A group is applied at
    /// most once even if several of its predicates match or it is listed
    /// twice. A field path is rendered at most once. Required-ness from the
    /// step's `required_field_paths` and from `required_when` is folded into
    /// the returned specs.
    ///
    /// An unrecognised key resolves to base fields only and is reported via
    /// `unknown_key`; an unknown step resolves to nothing.
    pub fn resolve_fields(&self, key: &TaxonomyKey, step_id: &str) -> ResolvedFields {
        let Some(step) = self.step_by_id(step_id) else {
            warn!(wizard = %self.id, step_id, "Fields requested for unknown step");
            return ResolvedFields {
                step_id: step_id.to_string(),
                fields: Vec::new(),
                groups: Vec::new(),
                unknown_key: false,
            };
        };

        let unknown_key = !self.is_known_key(key);
        let mut seen_paths: HashSet<&FieldPath> = HashSet::new();
        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut groups = Vec::new();

        for spec in &step.fields {
            if seen_paths.insert(&spec.path) {
                fields.push(spec.clone());
            }
        }

        if unknown_key {
            warn!(
                wizard = %self.id,
                pathway = %key.pathway_id,
                template = key.template().unwrap_or("-"),
                step_id,
                "Unknown taxonomy key, showing base fields only"
            );
        } else {
            let mut seen_groups: HashSet<&str> = HashSet::new();
            for group in self
                .groups
                .iter()
                .filter(|g| g.attach_to_step_id == step_id && g.is_active(key))
            {
                if !seen_groups.insert(group.id.as_str()) {
                    continue;
                }
                groups.push(group.id.clone());
                for spec in &group.fields {
                    if seen_paths.insert(&spec.path) {
                        fields.push(spec.clone());
                    }
                }
            }
        }

        for spec in fields.iter_mut() {
            let required = step.required_field_paths.contains(&spec.path)
                || spec.required_when.as_ref().is_some_and(|p| p.matches(key));
            if required && !spec.is_required() {
                spec.constraints.insert(0, Constraint::Required);
            }
        }

        ResolvedFields {
            step_id: step.id.clone(),
            fields,
            groups,
            unknown_key,
        }
    }

    /// Structural checks run when a definition is registered in strict mode.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::NoSteps {
                wizard: self.id.clone(),
            });
        }

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(step.id.as_str()) {
                return Err(CatalogError::DuplicateStep {
                    wizard: self.id.clone(),
                    step: step.id.clone(),
                });
            }
        }

        for (i, group) in self.groups.iter().enumerate() {
            if !step_ids.contains(group.attach_to_step_id.as_str()) {
                return Err(CatalogError::DanglingStep {
                    group: group.id.clone(),
                    step: group.attach_to_step_id.clone(),
                });
            }
            let conflicting = self.groups[..i].iter().any(|earlier| {
                earlier.id == group.id
                    && (earlier.attach_to_step_id != group.attach_to_step_id
                        || earlier.fields != group.fields)
            });
            if conflicting {
                return Err(CatalogError::ConflictingGroup {
                    group: group.id.clone(),
                });
            }
        }

        for step in &self.steps {
            for path in &step.required_field_paths {
                let reachable = step.fields.iter().any(|f| f.path == *path)
                    || self
                        .groups
                        .iter()
                        .filter(|g| g.attach_to_step_id == step.id)
                        .any(|g| g.fields.iter().any(|f| f.path == *path));
                if !reachable {
                    return Err(CatalogError::DanglingRequiredField {
                        step: step.id.clone(),
                        path: path.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
