//! Built-in wizard definitions: CV builder, profile intake, sponsorship
//! intake and mentor onboarding.

use crate::draft::FieldPath;

use super::definition::{ConditionalFieldGroup, StepDefinition, WizardDefinition};
use super::field::{Constraint, FieldKind, FieldSpec};
use super::taxonomy::TaxonomyPredicate;

pub const CV_BUILDER: &str = "cv-builder";
pub const PROFILE_INTAKE: &str = "profile-intake";
pub const SPONSORSHIP_INTAKE: &str = "sponsorship-intake";
pub const MENTOR_ONBOARDING: &str = "mentor-onboarding";

/// Applicant pathways shared by the built-in wizards.
pub const PATHWAYS: &[&str] = &[
    "plab-img",
    "uk-graduate",
    "specialty-trainee",
    "consultant",
];

const CV_TEMPLATES: &[&str] = &["nhs-standard", "arcp-portfolio", "academic"];

const REGIONS: &[&str] = &[
    "london",
    "south-east",
    "south-west",
    "midlands",
    "north-west",
    "north-east",
    "yorkshire",
    "scotland",
    "wales",
    "northern-ireland",
];

const NHS_SYSTEMS: &[&str] = &["EMIS", "SystmOne", "ICE", "Cerner", "Epic", "Lorenzo"];

pub fn all() -> Vec<WizardDefinition> {
    vec![
        cv_builder(),
        profile_intake(),
        sponsorship_intake(),
        mentor_onboarding(),
    ]
}

fn personal_step(id: &str) -> StepDefinition {
    StepDefinition::new(id, "Personal Details")
        .field(FieldSpec::text("personal", "full_name", "Full name"))
        .field(FieldSpec::new("personal", "email", "Email", FieldKind::Email))
        .field(FieldSpec::new("personal", "phone", "Phone", FieldKind::Phone))
        .require("personal", "full_name")
        .require("personal", "email")
}

pub fn cv_builder() -> WizardDefinition {
    WizardDefinition::new(CV_BUILDER, "CV Builder")
        .taxonomy(PATHWAYS, CV_TEMPLATES)
        .step(
            personal_step("personal").field(
                FieldSpec::text("personal", "gmc_number", "GMC number")
                    .rule("gmc_number")
                    .required_when(TaxonomyPredicate::pathways(&["uk-graduate", "consultant"]))
                    .help("Seven digits; leave blank if registration is pending"),
            ),
        )
        .step(
            StepDefinition::new("clinical-experience", "Clinical Experience")
                .field(FieldSpec::text("experience", "specialty", "Specialty"))
                .field(FieldSpec::select("experience", "region", "Region", REGIONS))
                .field(FieldSpec::number("experience", "years_experience", "Years of clinical experience").range(0.0, 60.0))
                .field(FieldSpec::text("experience", "current_role", "Current role"))
                .require("experience", "specialty")
                .require("experience", "region"),
        )
        .step(
            StepDefinition::new("education", "Education")
                .field(FieldSpec::text("education", "primary_degree", "Primary medical degree"))
                .field(FieldSpec::text("education", "medical_school", "Medical school"))
                .field(FieldSpec::number("education", "graduation_year", "Graduation year").range(1950.0, 2100.0))
                .field(FieldSpec::checklist(
                    "education",
                    "postgraduate_exams",
                    "Postgraduate exams",
                    &["MRCP", "MRCS", "MRCGP", "MRCPCH", "MRCOG", "FRCR", "FRCA"],
                ))
                .require("education", "primary_degree"),
        )
        .step(
            StepDefinition::new("skills", "Skills & Summary")
                .field(
                    FieldSpec::new(
                        "skills",
                        "keywords",
                        "Keywords",
                        FieldKind::MultiSelect {
                            options: Vec::new(),
                            unique: true,
                        },
                    )
                    .with(Constraint::RecommendedItems { min: 3 }),
                )
                .field(FieldSpec::long_text("skills", "summary", "Professional summary").with(Constraint::MinLength { min: 30 }))
                .require("skills", "summary"),
        )
        .step(
            StepDefinition::new("review", "Review & Consent")
                .field(FieldSpec::new("review", "consent", "I confirm these details are accurate", FieldKind::Boolean).rule("accepted"))
                .require("review", "consent"),
        )
        .group(
            ConditionalFieldGroup::new("plab-img-uk-exposure", "clinical-experience")
                .when(TaxonomyPredicate::pathway("plab-img"))
                .field(
                    FieldSpec::new("experience", "first_uk_exposure", "First UK clinical exposure", FieldKind::Date)
                        .required_when(TaxonomyPredicate::template("nhs-standard")),
                )
                .field(
                    FieldSpec::checklist("experience", "nhs_systems", "NHS systems familiarity", NHS_SYSTEMS)
                        .recommended(),
                )
                .field(FieldSpec::select(
                    "experience",
                    "plab_status",
                    "PLAB status",
                    &["plab1-passed", "plab2-passed", "exempt"],
                )),
        )
        // Listed under both predicates; resolution applies it once.
        .group(
            ConditionalFieldGroup::new("nhs-induction", "clinical-experience")
                .when(TaxonomyPredicate::pathway("plab-img"))
                .when(TaxonomyPredicate::template("nhs-standard"))
                .field(FieldSpec::new(
                    "experience",
                    "nhs_induction_completed",
                    "Completed an NHS induction programme",
                    FieldKind::Boolean,
                )),
        )
        .group(
            ConditionalFieldGroup::new("consultant-leadership", "clinical-experience")
                .when(TaxonomyPredicate::pathway("consultant"))
                .field(FieldSpec::long_text("experience", "leadership_roles", "Leadership roles").required())
                .field(FieldSpec::new("experience", "cct_date", "CCT date", FieldKind::Date)),
        )
        .group(
            ConditionalFieldGroup::new("arcp-outcomes", "clinical-experience")
                .when(TaxonomyPredicate::template("arcp-portfolio"))
                .field(
                    FieldSpec::select(
                        "experience",
                        "latest_arcp_outcome",
                        "Latest ARCP outcome",
                        &["outcome-1", "outcome-2", "outcome-3", "outcome-5", "outcome-6"],
                    )
                    .required(),
                ),
        )
        .group(
            ConditionalFieldGroup::new("academic-output", "education")
                .when(TaxonomyPredicate::template("academic"))
                .field(FieldSpec::number("education", "publications", "Peer-reviewed publications").range(0.0, 1000.0))
                .field(FieldSpec::long_text("education", "research_interests", "Research interests").recommended()),
        )
        .enrich(
            &[
                FieldPath::new("experience", "specialty"),
                FieldPath::new("experience", "region"),
            ],
            FieldPath::new("skills", "keywords"),
        )
}

pub fn profile_intake() -> WizardDefinition {
    WizardDefinition::new(PROFILE_INTAKE, "Profile Intake")
        .taxonomy(PATHWAYS, &[])
        .step(personal_step("basics"))
        .step(
            StepDefinition::new("goals", "Career Goals")
                .field(FieldSpec::text("goals", "target_specialty", "Target specialty"))
                .field(FieldSpec::new("goals", "target_start_date", "Target start date", FieldKind::Date).rule("future_date"))
                .field(FieldSpec::select("goals", "preferred_region", "Preferred region", REGIONS))
                .require("goals", "target_specialty"),
        )
        .step(
            StepDefinition::new("availability", "Availability")
                .field(FieldSpec::number("availability", "hours_per_week", "Hours per week for preparation").range(1.0, 80.0))
                .field(FieldSpec::checklist(
                    "availability",
                    "interests",
                    "Services of interest",
                    &["cv-review", "mentoring", "exam-prep", "sponsorship"],
                ))
                .require("availability", "hours_per_week"),
        )
        .group(
            ConditionalFieldGroup::new("img-support", "goals")
                .when(TaxonomyPredicate::pathway("plab-img"))
                .field(
                    FieldSpec::select("goals", "visa_status", "Visa status", &["tier-2", "dependant", "settled", "none"])
                        .required(),
                )
                .field(FieldSpec::select("goals", "english_test", "English test", &["ielts", "oet", "exempt"])),
        )
        .group(
            ConditionalFieldGroup::new("trainee-progress", "goals")
                .when(TaxonomyPredicate::pathway("specialty-trainee"))
                .field(FieldSpec::text("goals", "training_grade", "Current training grade").required()),
        )
}

pub fn sponsorship_intake() -> WizardDefinition {
    WizardDefinition::new(SPONSORSHIP_INTAKE, "Sponsorship Intake")
        .taxonomy(&["plab-img", "uk-graduate", "specialty-trainee"], &["skilled-worker", "cos-renewal"])
        .step(personal_step("applicant"))
        .step(
            StepDefinition::new("employment", "Employment")
                .field(FieldSpec::text("employment", "employer", "Prospective employer"))
                .field(FieldSpec::text("employment", "job_title", "Job title"))
                .field(FieldSpec::number("employment", "salary", "Annual salary (GBP)").range(0.0, 500_000.0))
                .require("employment", "employer")
                .require("employment", "job_title"),
        )
        .step(
            StepDefinition::new("documents", "Documents")
                .field(
                    FieldSpec::checklist(
                        "documents",
                        "checklist",
                        "Documents ready",
                        &["passport", "brp", "gmc-certificate", "english-test", "references"],
                    )
                    .with(Constraint::RecommendedItems { min: 3 })
                    .rule("non_blank_list"),
                )
                .field(FieldSpec::long_text("documents", "notes", "Notes")),
        )
        .group(
            ConditionalFieldGroup::new("cos-details", "employment")
                .when(TaxonomyPredicate::template("cos-renewal"))
                .field(FieldSpec::text("employment", "cos_reference", "Certificate of Sponsorship reference").required())
                .field(FieldSpec::text("employment", "current_sponsor", "Current sponsor")),
        )
        .group(
            ConditionalFieldGroup::new("img-english", "documents")
                .when(TaxonomyPredicate::pathway("plab-img"))
                .field(
                    FieldSpec::select("documents", "english_test", "English language evidence", &["ielts", "oet", "uk-degree"])
                        .required(),
                ),
        )
}

pub fn mentor_onboarding() -> WizardDefinition {
    WizardDefinition::new(MENTOR_ONBOARDING, "Mentor Onboarding")
        .taxonomy(&["consultant", "specialty-trainee", "uk-graduate"], &[])
        .step(
            personal_step("profile").field(
                FieldSpec::text("personal", "gmc_number", "GMC number").rule("gmc_number"),
            ).require("personal", "gmc_number"),
        )
        .step(
            StepDefinition::new("expertise", "Expertise")
                .field(
                    FieldSpec::new(
                        "expertise",
                        "specialties",
                        "Specialties you mentor in",
                        FieldKind::MultiSelect {
                            options: Vec::new(),
                            unique: true,
                        },
                    )
                    .with(Constraint::MinItems { min: 1 }),
                )
                .field(FieldSpec::long_text("expertise", "bio", "Short bio").with(Constraint::MinLength { min: 50 }))
                .require("expertise", "specialties")
                .require("expertise", "bio"),
        )
        .step(
            StepDefinition::new("availability", "Availability & Rates")
                .field(FieldSpec::number("availability", "session_rate", "Rate per session (GBP)").range(0.0, 500.0))
                .field(FieldSpec::number("availability", "slots_per_month", "Sessions per month").range(1.0, 20.0))
                .require("availability", "session_rate")
                .require("availability", "slots_per_month"),
        )
        .group(
            ConditionalFieldGroup::new("consultant-panel", "expertise")
                .when(TaxonomyPredicate::pathway("consultant"))
                .field(FieldSpec::new(
                    "expertise",
                    "interview_panel_experience",
                    "Sat on specialty interview panels",
                    FieldKind::Boolean,
                ))
                .field(FieldSpec::number("expertise", "cct_year", "CCT year").range(1970.0, 2100.0).required()),
        )
}
