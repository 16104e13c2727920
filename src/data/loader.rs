use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::models::QuizBank;

/// Load and check a question bank file.
pub fn load_bank_from_json<P: AsRef<Path>>(path: P) -> Result<QuizBank, LoadError> {
    let path = path.as_ref();

    let json_content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let bank: QuizBank = serde_json::from_str(&json_content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if bank.surveys.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    check_integrity(&bank)?;
    log::info!(
        "Loaded {} surveys from {}",
        bank.surveys.len(),
        path.display()
    );

    Ok(bank)
}

fn check_integrity(bank: &QuizBank) -> Result<(), LoadError> {
    for survey in &bank.surveys {
        let mut question_ids = HashSet::new();
        for question in &survey.questions {
            if !question_ids.insert(question.id) {
                return Err(LoadError::DuplicateQuestionId {
                    survey_id: survey.id,
                    question_id: question.id,
                });
            }

            let mut option_ids = HashSet::new();
            for option in &question.options {
                if !option_ids.insert(option.id) {
                    return Err(LoadError::DuplicateOptionId {
                        question_id: question.id,
                        option_id: option.id,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_bank(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_valid_bank() {
        let file = write_bank(
            r#"{"surveys": [{
                "id": 1, "title": "Basics", "session_code": "4321",
                "questions": [{"id": 101, "title": "Q", "options": [
                    {"id": 7, "text": "a"}, {"id": 8, "text": "b", "is_correct": true}
                ]}]
            }]}"#,
        );

        let bank = load_bank_from_json(file.path()).unwrap();
        assert_eq!(bank.surveys.len(), 1);
        assert_eq!(bank.surveys[0].questions[0].options.len(), 2);
    }

    #[test]
    fn test_rejects_empty_bank() {
        let file = write_bank(r#"{"surveys": []}"#);
        assert!(matches!(
            load_bank_from_json(file.path()),
            Err(LoadError::Empty(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_option_ids() {
        let file = write_bank(
            r#"{"surveys": [{
                "id": 1, "title": "Basics", "session_code": "4321",
                "questions": [{"id": 101, "title": "Q", "options": [
                    {"id": 7, "text": "a"}, {"id": 7, "text": "b"}
                ]}]
            }]}"#,
        );
        assert!(matches!(
            load_bank_from_json(file.path()),
            Err(LoadError::DuplicateOptionId {
                question_id: 101,
                option_id: 7
            })
        ));
    }

    #[test]
    fn test_reports_missing_file_and_bad_json() {
        assert!(matches!(
            load_bank_from_json("/definitely/not/here.json"),
            Err(LoadError::Io { .. })
        ));

        let file = write_bank("{ not json");
        assert!(matches!(
            load_bank_from_json(file.path()),
            Err(LoadError::Parse { .. })
        ));
    }
}
