//! Shared fixtures for unit tests.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::EnsembleConfig;

/// Header of the training CSV: the 22 features, then the label.
pub const CSV_HEADER: &str = "Diabetic,AlcoholLevel,HeartRate,BloodOxygenLevel,BodyTemperature,\
Weight,MRI_Delay,Prescription,Dosage in mg,Age,Dominant_Hand,Gender,Family_History,\
Smoking_Status,APOE_ε4,Physical_Activity,Depression_Status,Cognitive_Test_Scores,\
Medication_History,Nutrition_Diet,Sleep_Quality,Chronic_Health_Conditions,Dementia";

/// A record with empty Prescription and Dosage and a "None" condition.
pub const SAMPLE_RECORD: &str = "0,0.000955737,84,99.84323059,36.03250039,84.81595461,\
38.72863817,,,49,Right,Female,No,Never Smoked,Negative,Mild Activity,No,10,No,\
Low-Carb Diet,Good,None";

/// Small models so ensemble tests stay fast.
pub fn fast_config() -> EnsembleConfig {
    let mut config = EnsembleConfig::default();
    config.logistic.max_iterations = 200;
    config.forest.n_trees = 15;
    config.boosting.iterations = 20;
    config.boosting.max_depth = 3;
    config
}

fn pick<'a>(rng: &mut ChaCha8Rng, choices: &[&'a str]) -> &'a str {
    choices.choose(rng).copied().unwrap_or_default()
}

/// Deterministic labelled CSV of `rows` records, label in the last column.
///
/// Dementia follows the cognitive score and APOE status, with a few
/// flipped labels. Prescription and Dosage are left empty on some rows.
pub fn synthetic_csv(rows: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for i in 0..rows {
        let cognitive: u32 = rng.gen_range(0..=10);
        let apoe = pick(&mut rng, &["Positive", "Negative"]);
        let age: u32 = rng.gen_range(60..=90);
        let mut dementia = cognitive < 5 || (cognitive < 7 && apoe == "Positive");
        if rng.gen_bool(0.05) {
            dementia = !dementia;
        }

        let (prescription, dosage) = if i % 7 == 3 {
            (String::new(), String::new())
        } else {
            let drug = pick(&mut rng, &["Galantamine", "Memantine", "Rivastigmine", "Donepezil"]);
            (drug.to_string(), format!("{:.1}", rng.gen_range(1.0..24.0)))
        };

        let fields = [
            rng.gen_range(0..=1u32).to_string(),
            format!("{:.6}", rng.gen_range(0.0..0.2)),
            rng.gen_range(60..=100u32).to_string(),
            format!("{:.4}", rng.gen_range(90.0..100.0)),
            format!("{:.4}", rng.gen_range(36.0..37.5)),
            format!("{:.3}", rng.gen_range(50.0..100.0)),
            format!("{:.3}", rng.gen_range(0.0..60.0)),
            prescription,
            dosage,
            age.to_string(),
            pick(&mut rng, &["Right", "Left"]).to_string(),
            pick(&mut rng, &["Male", "Female"]).to_string(),
            pick(&mut rng, &["Yes", "No"]).to_string(),
            pick(&mut rng, &["Never Smoked", "Former Smoker", "Current Smoker"]).to_string(),
            apoe.to_string(),
            pick(&mut rng, &["Sedentary", "Mild Activity", "Moderate Activity"]).to_string(),
            pick(&mut rng, &["Yes", "No"]).to_string(),
            cognitive.to_string(),
            pick(&mut rng, &["Yes", "No"]).to_string(),
            pick(&mut rng, &["Balanced Diet", "Low-Carb Diet", "Mediterranean Diet"]).to_string(),
            pick(&mut rng, &["Good", "Poor"]).to_string(),
            pick(&mut rng, &["Diabetes", "Heart Disease", "Hypertension", "None"]).to_string(),
        ];

        out.push_str(&fields.join(","));
        out.push_str(if dementia { ",1\n" } else { ",0\n" });
    }

    out
}
