//! Input field catalogue for the prediction form.
//!
//! Ranges and choice lists are what the form offers the operator. They are
//! advisory: the pipeline itself accepts any value and degrades gracefully.

use super::record::{FIELD_COUNT, FIELD_NAMES};

/// Form section a field is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSection {
    Demographics,
    MedicalHistory,
    VitalSigns,
    Lifestyle,
    ClinicalAssessment,
    Medication,
}

impl FormSection {
    /// Section heading as shown to the operator.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Demographics => "Patient Demographics",
            Self::MedicalHistory => "Medical History",
            Self::VitalSigns => "Vital Signs",
            Self::Lifestyle => "Lifestyle Factors",
            Self::ClinicalAssessment => "Clinical Assessment",
            Self::Medication => "Medication",
        }
    }

    /// All sections in display order.
    pub const ALL: [FormSection; 6] = [
        Self::Demographics,
        Self::MedicalHistory,
        Self::VitalSigns,
        Self::Lifestyle,
        Self::ClinicalAssessment,
        Self::Medication,
    ];
}

/// What the form accepts for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldInput {
    /// Free numeric entry with a hinted range.
    Range { min: f64, max: f64 },
    /// Pick one of a fixed list.
    Choice(&'static [&'static str]),
}

/// Form metadata for one record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Column name, as in [`FIELD_NAMES`].
    pub name: &'static str,
    pub section: FormSection,
    pub input: FieldInput,
    pub hint: &'static str,
}

impl FieldSpec {
    /// Human label: the column name with underscores as spaces.
    #[must_use]
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }

    /// Check a raw value against the hinted range or choice list.
    ///
    /// # Errors
    /// Returns a human-readable warning when the value is outside what the
    /// form offers. Warnings name the field but never echo the value.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        match self.input {
            FieldInput::Range { min, max } => {
                let v: f64 = value
                    .parse()
                    .map_err(|_| format!("{}: Invalid number", self.label()))?;
                if v < min || v > max {
                    return Err(format!(
                        "{}: outside expected range [{}, {}]",
                        self.label(),
                        min,
                        max
                    ));
                }
                Ok(())
            }
            FieldInput::Choice(choices) => {
                if choices.contains(&value) {
                    Ok(())
                } else {
                    Err(format!(
                        "{}: not one of {}",
                        self.label(),
                        choices.join(", ")
                    ))
                }
            }
        }
    }
}

const YES_NO: &[&str] = &["Yes", "No"];

/// Catalogue in canonical field order.
pub const FIELD_SPECS: [FieldSpec; FIELD_COUNT] = [
    FieldSpec {
        name: "Diabetic",
        section: FormSection::MedicalHistory,
        input: FieldInput::Choice(&["0", "1"]),
        hint: "Diabetic status (0 = No, 1 = Yes)",
    },
    FieldSpec {
        name: "AlcoholLevel",
        section: FormSection::Lifestyle,
        input: FieldInput::Range { min: 0.0, max: 0.08 },
        hint: "Alcohol level (0-0.08 BAC)",
    },
    FieldSpec {
        name: "HeartRate",
        section: FormSection::VitalSigns,
        input: FieldInput::Range { min: 40.0, max: 200.0 },
        hint: "Heart rate (40-200 bpm)",
    },
    FieldSpec {
        name: "BloodOxygenLevel",
        section: FormSection::VitalSigns,
        input: FieldInput::Range { min: 80.0, max: 100.0 },
        hint: "Blood oxygen level (80-100%)",
    },
    FieldSpec {
        name: "BodyTemperature",
        section: FormSection::VitalSigns,
        input: FieldInput::Range { min: 35.0, max: 40.0 },
        hint: "Body temperature (35-40 °C)",
    },
    FieldSpec {
        name: "Weight",
        section: FormSection::Demographics,
        input: FieldInput::Range { min: 30.0, max: 200.0 },
        hint: "Weight (30-200 kg)",
    },
    FieldSpec {
        name: "MRI_Delay",
        section: FormSection::ClinicalAssessment,
        input: FieldInput::Range { min: 0.0, max: 60.0 },
        hint: "MRI delay (0-60 minutes)",
    },
    FieldSpec {
        name: "Prescription",
        section: FormSection::Medication,
        input: FieldInput::Choice(&[
            "Galantamine",
            "Memantine",
            "Rivastigmine",
            "Donepezil",
            "None",
        ]),
        hint: "Prescription (Galantamine, Memantine, Rivastigmine, Donepezil, None)",
    },
    FieldSpec {
        name: "Dosage in mg",
        section: FormSection::Medication,
        input: FieldInput::Range { min: 0.0, max: 100.0 },
        hint: "Dosage (0-100 mg)",
    },
    FieldSpec {
        name: "Age",
        section: FormSection::Demographics,
        input: FieldInput::Range { min: 18.0, max: 120.0 },
        hint: "Age (18-120 years)",
    },
    FieldSpec {
        name: "Dominant_Hand",
        section: FormSection::Demographics,
        input: FieldInput::Choice(&["Right", "Left"]),
        hint: "Dominant hand (Right, Left)",
    },
    FieldSpec {
        name: "Gender",
        section: FormSection::Demographics,
        input: FieldInput::Choice(&["Male", "Female"]),
        hint: "Gender (Male, Female)",
    },
    FieldSpec {
        name: "Family_History",
        section: FormSection::MedicalHistory,
        input: FieldInput::Choice(YES_NO),
        hint: "Family history of dementia (Yes, No)",
    },
    FieldSpec {
        name: "Smoking_Status",
        section: FormSection::Lifestyle,
        input: FieldInput::Choice(&["Never Smoked", "Former Smoker", "Current Smoker"]),
        hint: "Smoking status (Never Smoked, Former Smoker, Current Smoker)",
    },
    FieldSpec {
        name: "APOE_ε4",
        section: FormSection::MedicalHistory,
        input: FieldInput::Choice(&["Positive", "Negative"]),
        hint: "APOE ε4 status (Positive, Negative)",
    },
    FieldSpec {
        name: "Physical_Activity",
        section: FormSection::Lifestyle,
        input: FieldInput::Choice(&[
            "Sedentary",
            "Mild Activity",
            "Moderate Activity",
            "High Activity",
        ]),
        hint: "Activity level (Sedentary, Mild, Moderate, High)",
    },
    FieldSpec {
        name: "Depression_Status",
        section: FormSection::ClinicalAssessment,
        input: FieldInput::Choice(YES_NO),
        hint: "Depression status (Yes, No)",
    },
    FieldSpec {
        name: "Cognitive_Test_Scores",
        section: FormSection::ClinicalAssessment,
        input: FieldInput::Choice(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
        hint: "Cognitive test score (0-10)",
    },
    FieldSpec {
        name: "Medication_History",
        section: FormSection::Medication,
        input: FieldInput::Choice(YES_NO),
        hint: "Medication history (Yes, No)",
    },
    FieldSpec {
        name: "Nutrition_Diet",
        section: FormSection::Lifestyle,
        input: FieldInput::Choice(&[
            "Balanced Diet",
            "Low-Carb Diet",
            "Mediterranean Diet",
            "Other",
        ]),
        hint: "Diet (Balanced, Low-Carb, Mediterranean, Other)",
    },
    FieldSpec {
        name: "Sleep_Quality",
        section: FormSection::Lifestyle,
        input: FieldInput::Choice(&["Good", "Fair", "Poor"]),
        hint: "Sleep quality (Good, Fair, Poor)",
    },
    FieldSpec {
        name: "Chronic_Health_Conditions",
        section: FormSection::MedicalHistory,
        input: FieldInput::Choice(&["None", "Heart Disease", "Diabetes", "Hypertension"]),
        hint: "Chronic condition (None, Heart Disease, Diabetes, Hypertension)",
    },
];

/// Catalogue entry for a named field.
#[must_use]
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|s| s.name == name)
}

/// Catalogue entries of one section, in canonical order.
pub fn fields_in(section: FormSection) -> impl Iterator<Item = &'static FieldSpec> {
    FIELD_SPECS.iter().filter(move |s| s.section == section)
}
