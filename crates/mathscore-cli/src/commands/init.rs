//! The `mathscore init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("mathscore.toml").exists() {
        println!("mathscore.toml already exists, skipping.");
    } else {
        std::fs::write("mathscore.toml", SAMPLE_CONFIG)?;
        println!("Created mathscore.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point [predictor] at your scoring script");
    println!("  2. Run: mathscore predict --reading-score 72 --writing-score 74 --lunch 1 \\");
    println!("       --race-ethnicity-group-e 0 --test-preparation-course 0 --gender 1 \\");
    println!("       --parental-level-of-education-high-school 1");
    println!("  3. Run: mathscore serve");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mathscore configuration

[server]
host = "0.0.0.0"
port = 5000
cors_origins = []

# Receives the feature vector as a JSON array in its last argument and
# prints {"math_score": ..., "confidence": ...} on stdout.
[predictor]
command = "python"
args = ["predict_math_score.py"]
timeout_secs = 5
# working_dir = "${HOME}/mathscore"

# "builtin" normalizes in-process. Use type = "script" with a command to pipe
# the form through an external validator instead.
[scaler]
type = "builtin"
"#;
