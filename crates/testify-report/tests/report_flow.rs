//! Session effects carried through to files on disk.

use chrono::Local;

use testify_core::model::{Letter, Mode};
use testify_core::parser::parse_document_str;
use testify_core::session::{Command, Effect, Session};
use testify_report::{persist_results, DirectoryPersister, ResultsReport};

#[test]
fn persist_effects_write_reports() {
    let document = parse_document_str(
        r#"{"sections": [{"name": "Quant", "time_minutes": 5, "items": [
            {"q": "2+2?", "choices": ["4", "5"], "ans": "A"},
            {"q": "3+3?", "choices": ["5", "6"], "ans": "B"}
        ]}]}"#,
    )
    .unwrap();

    let mut session = Session::new(Mode::Exam);
    for command in [
        Command::Load(Box::new(document)),
        Command::StartSection(0),
        Command::Select(Letter::A),
        Command::NextItem,
        Command::Select(Letter::A),
        Command::Finish,
    ] {
        session = session.handle(command, 0).session;
    }

    let dir = tempfile::tempdir().unwrap();
    let persister = DirectoryPersister::new(dir.path());
    let results = session.results().unwrap().clone();

    let mut written = Vec::new();
    for command in [Command::SaveTextReport, Command::ExportResults] {
        let (next, effects) = session.handle(command, 0).into_parts();
        session = next;
        for effect in effects {
            if let Effect::Persist {
                format,
                suggested_name,
            } = effect
            {
                let path = persist_results(
                    &persister,
                    format,
                    suggested_name,
                    &results,
                    session.mode(),
                    Local::now(),
                )
                .unwrap();
                written.push(path);
            }
        }
    }

    assert_eq!(written.len(), 2);
    let text = std::fs::read_to_string(dir.path().join("testify_results.txt")).unwrap();
    assert!(text.starts_with("Testify Results ("));
    assert!(text.contains("Quant: 1/2 (50.0%)"));
    assert!(text.contains("    Q2: you=A | correct=B | 3+3?"));

    let report = ResultsReport::load_json(&dir.path().join("testify_results.json")).unwrap();
    assert_eq!(report.results, results);
}
