pub mod init;
pub mod predict;
pub mod serve;
pub mod submit;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde_json::{Map, Value};

use mathscore_core::model::{Feature, FormDraft};
use mathscore_core::pipeline::{CONFIDENCE_KEY, PREDICTION_KEY};

/// The seven form fields.
///
/// Scores must be given; the flags start where the web form starts them.
#[derive(Debug, Args)]
pub struct FormArgs {
    /// Reading score (0-100)
    #[arg(long)]
    pub reading_score: Option<f64>,

    /// Writing score (0-100)
    #[arg(long)]
    pub writing_score: Option<f64>,

    /// Standard lunch (1) or free/reduced (0)
    #[arg(long, default_value_t = 1.0)]
    pub lunch: f64,

    /// Belongs to race/ethnicity group E (1) or not (0)
    #[arg(long = "race-ethnicity-group-e", default_value_t = 0.0)]
    pub race_ethnicity_group_e: f64,

    /// Completed the test preparation course (1) or not (0)
    #[arg(long, default_value_t = 0.0)]
    pub test_preparation_course: f64,

    /// Male (1) or female (0)
    #[arg(long, default_value_t = 0.0)]
    pub gender: f64,

    /// Parental education is high school (1) or not (0)
    #[arg(long, default_value_t = 0.0)]
    pub parental_level_of_education_high_school: f64,
}

impl From<FormArgs> for FormDraft {
    fn from(args: FormArgs) -> Self {
        FormDraft {
            reading_score: args.reading_score,
            writing_score: args.writing_score,
            lunch: Some(args.lunch),
            race_ethnicity_group_e: Some(args.race_ethnicity_group_e),
            test_preparation_course: Some(args.test_preparation_course),
            gender: Some(args.gender),
            parental_level_of_education_high_school: Some(
                args.parental_level_of_education_high_school,
            ),
        }
    }
}

/// Print a merged prediction either as JSON or as a summary table.
pub fn print_result(result: &Map<String, Value>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    for feature in Feature::ALL {
        if let Some(value) = result.get(feature.name()) {
            table.add_row(vec![Cell::new(feature.name()), Cell::new(value)]);
        }
    }
    println!("{table}");

    match result.get(PREDICTION_KEY).and_then(Value::as_f64) {
        Some(score) => println!("Predicted math score: {score:.1}"),
        None => anyhow::bail!("response has no {PREDICTION_KEY}"),
    }
    if let Some(confidence) = result.get(CONFIDENCE_KEY).and_then(Value::as_f64) {
        println!("Confidence: {:.1}%", confidence * 100.0);
    }
    Ok(())
}
