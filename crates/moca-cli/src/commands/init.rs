//! The `moca init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("moca.toml").exists() {
        println!("moca.toml already exists, skipping.");
    } else {
        std::fs::write("moca.toml", SAMPLE_CONFIG)?;
        println!("Created moca.toml");
    }

    std::fs::create_dir_all("sessions")?;
    let example_path = std::path::Path::new("sessions/example.toml");
    if example_path.exists() {
        println!("sessions/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_SESSION)?;
        println!("Created sessions/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY or edit moca.toml");
    println!("  2. Add drawing images and uncomment [visuospatial] in sessions/example.toml");
    println!("  3. Run: moca validate --session sessions/example.toml");
    println!("  4. Run: moca run --session sessions/example.toml --format all");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# moca configuration

model = "gpt-4o-mini"
timeout_secs = 20
max_retries = 1
parallelism = 4
output_dir = "./moca-results"
drawing_max_tokens = 500
abstraction_max_tokens = 50
temperature = 0.0

[provider]
type = "openai"
api_key = "${OPENAI_API_KEY}"

# Offline runs that award full marks on drawings and abstraction:
# [provider]
# type = "mock"
"#;

const EXAMPLE_SESSION: &str = r#"[session]
id = "example-001"
education_adjustment = false

# Paths are relative to this file.
# [visuospatial]
# A_TRAIL = "drawings/trail.png"
# B_CUBE = "drawings/cube.png"
# C_CLOCK = "drawings/clock.png"

[naming]
lion = "león"
rhino = "rinoceronte"
camel = "camello"

[memory]
trial_1 = "rostro seda iglesia clavel"
trial_2 = "rostro seda iglesia clavel rojo"

[[examiner]]
task = "ATTENTION_DIGITS_FORWARD"
transcript = "2 1 8 5 4"

[[examiner]]
task = "ATTENTION_DIGITS_BACKWARD"
transcript = "2 4 7"

[[examiner]]
task = "ATTENTION_LETTER_TAP"
error_count = 0

[[examiner]]
task = "ATTENTION_SERIAL_SEVENS"
transcript = "93 86 79 72 65"

[[examiner]]
task = "LANGUAGE_SENTENCE_1"
transcript = "El gato se esconde bajo el sofá cuando los perros entran en la sala"

[[examiner]]
task = "LANGUAGE_FLUENCY"
transcript = "fresa foca faro fuego flor fila fama"

[examiner_scores]
attention = 6
language = 2

[abstraction]
train = "medios de transporte"
watch = "instrumentos de medida"

[delayed_recall]
words = ["rostro", "seda", "iglesia"]
cued = ["clavel"]
choice = ["rojo"]

[orientation]
day = 15
month = 5
year = 2024
day_of_week = "miércoles"
place = "Hospital"
place_correct = true
city = "Madrid"
city_correct = true
"#;
