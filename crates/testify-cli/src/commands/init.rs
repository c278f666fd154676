//! The `testify init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create testify.toml
    if Path::new("testify.toml").exists() {
        println!("testify.toml already exists, skipping.");
    } else {
        std::fs::write("testify.toml", SAMPLE_CONFIG)?;
        println!("Created testify.toml");
    }

    // Create example exam
    std::fs::create_dir_all("exams")?;
    let example_path = Path::new("exams/example.json");
    if example_path.exists() {
        println!("exams/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: testify validate --exam exams/example.json");
    println!("  2. Run: testify take --exam exams/example.json --mode practice");
    println!("  3. Write your own exam with: testify build --output exams/mine.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# testify configuration

# exam: timers lock sections when they run out
# practice: timers are informational, sections can be skipped
mode = "exam"

output_dir = "./testify-results"
fallback_dir = "${HOME}/.local/share/testify"

goal_overall = 85
goal_per_section = 80
"#;

const EXAMPLE_EXAM: &str = r#"{
  "sections": [
    {
      "name": "Verbal",
      "time_minutes": 5,
      "items": [
        {
          "q": "Which word is closest in meaning to RAPID?",
          "passage": "",
          "choices": ["slow", "quick", "heavy", "quiet"],
          "ans": "B"
        },
        {
          "q": "Which word is the opposite of ANCIENT?",
          "passage": "",
          "choices": ["old", "modern", "broken", "large"],
          "ans": "B"
        }
      ]
    },
    {
      "name": "Quantitative",
      "time_minutes": 5,
      "items": [
        {
          "q": "What is 12 x 12?",
          "passage": "",
          "choices": ["124", "144", "132", "154"],
          "ans": "B"
        },
        {
          "q": "How many minutes are in 2.5 hours?",
          "passage": "",
          "choices": ["150", "125", "250", "90"],
          "ans": "A"
        }
      ]
    },
    {
      "name": "Reading",
      "items": [
        {
          "q": "Read the passage, then answer the next question.",
          "passage": "The lighthouse keeper climbed the stairs every evening at dusk.",
          "choices": []
        },
        {
          "q": "When did the keeper climb the stairs?",
          "passage": "The lighthouse keeper climbed the stairs every evening at dusk.",
          "choices": ["At dawn", "At noon", "At dusk", "At midnight"],
          "ans": "C"
        }
      ]
    }
  ]
}
"#;
