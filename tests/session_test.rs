mod test_utils;

#[cfg(test)]
mod tests {
    use elicit::ai::reply::StrictExtractor;
    use elicit::ai::session::{Constraint, SessionDriver, SessionError};
    use elicit::openai::{Message, Role};

    use crate::test_utils::{ScriptedBackend, ScriptedUi, channel};

    const PURPOSE: &str = "Return the largest number in a list";

    #[tokio::test]
    async fn it_collects_confirmed_constraints() {
        let backend = ScriptedBackend::new(&[
            r#"{"kind": "INTRO", "contents": "Can the input be empty?"}"#,
            r#"{"kind": "CONSTRAINT_SUMMARY", "contents": "Input must be a non-empty list of integers"}"#,
            r#"Sure! {"kind": "INTRO", "contents": "Can numbers be negative?"}"#,
            r#"{"kind": "CONSTRAINT_SUMMARY", "contents": "Numbers may be negative"}"#,
            r#"{"kind": "FINISHED", "contents": "That's everything"}"#,
        ]);
        let requests = backend.requests();
        let ui = ScriptedUi::new(&["No, and only integers", "yes", "Yes they can", "yes"]);
        let mut driver = SessionDriver::new(channel(backend, 3500), ui, 3);

        let actual = driver.run(PURPOSE).await.unwrap();

        assert_eq!(
            actual,
            vec![
                Constraint::new("Input must be a non-empty list of integers"),
                Constraint::new("Numbers may be negative"),
            ]
        );

        let ui = driver.ui();
        assert_eq!(ui.asked[0], "Can the input be empty?");
        assert!(ui.asked[1].starts_with("Is this correct?"));
        assert_eq!(ui.asked[2], "Can numbers be negative?");
        assert!(ui.shown.contains(&String::from("Constraint captured:")));
        assert!(
            ui.shown
                .contains(&String::from("Constraint 1: Input must be a non-empty list of integers"))
        );
        assert!(ui.output().ends_with(
            "Finished collecting constraints\nConstraint 1: Input must be a non-empty list of integers\nConstraint 2: Numbers may be negative"
        ));

        // Every request after a confirmation starts from the compacted
        // summary rather than the full conversation
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 5);
        let after_first = &requests[2];
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[0].role(), &Role::System);
        assert!(
            after_first[0]
                .content()
                .contains("1. Input must be a non-empty list of integers")
        );
        assert_eq!(after_first[1], Message::user("Ask your next question"));
    }

    #[tokio::test]
    async fn it_revises_rejected_constraint() {
        let backend = ScriptedBackend::new(&[
            r#"{"kind": "CONSTRAINT_SUMMARY", "contents": "Input is a list"}"#,
            r#"{"kind": "CONSTRAINT_SUMMARY", "contents": "Input is a list of integers"}"#,
            r#"{"kind": "FINISHED", "contents": ""}"#,
        ]);
        let requests = backend.requests();
        let ui = ScriptedUi::new(&["It should say integers", "yes"]);
        let mut driver = SessionDriver::new(channel(backend, 3500), ui, 3);

        let actual = driver.run(PURPOSE).await.unwrap();

        assert_eq!(actual, vec![Constraint::new("Input is a list of integers")]);
        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[1].last().unwrap(),
            &Message::user("Constraint needs modification: It should say integers")
        );
    }

    #[tokio::test]
    async fn it_gives_up_after_max_retries() {
        let backend = ScriptedBackend::new(&[
            "I think the input can be any list.",
            "Here is a question: can it be empty?",
            r#"{"kind": "QUESTION", "contents": "Can it be empty?"}"#,
            r#"{"kind": "INTRO", "contents": "Never reached"}"#,
        ]);
        let requests = backend.requests();
        let mut driver = SessionDriver::new(channel(backend, 3500), ScriptedUi::new(&[]), 3);

        let actual = driver.run(PURPOSE).await;

        match actual {
            Err(SessionError::RetriesExhausted {
                attempts, history, ..
            }) => {
                assert_eq!(attempts, 3);
                // Initial prompt plus a reply and a correction per attempt
                assert_eq!(history.len(), 2 + 3 * 2);
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(requests.lock().unwrap().len(), 3);

        let ui = driver.ui();
        assert!(ui.asked.is_empty());
        assert!(ui.shown.contains(&String::from("Message log:")));
        assert!(ui.output().contains("I think the input can be any list."));
    }

    #[tokio::test]
    async fn it_resets_retries_after_valid_reply() {
        let backend = ScriptedBackend::new(&[
            "not json",
            "still not json",
            r#"{"kind": "INTRO", "contents": "Can the input be empty?"}"#,
            "not json again",
            "nope",
            r#"{"kind": "FINISHED", "contents": ""}"#,
        ]);
        let ui = ScriptedUi::new(&["No"]);
        let mut driver = SessionDriver::new(channel(backend, 3500), ui, 3);

        let actual = driver.run(PURPOSE).await.unwrap();
        assert!(actual.is_empty());
    }

    #[tokio::test]
    async fn it_bails_when_over_budget() {
        let backend = ScriptedBackend::new(&[r#"{"kind": "FINISHED", "contents": ""}"#]);
        let requests = backend.requests();
        let purpose = "Sort a list of numbers ".repeat(1000);
        let mut driver = SessionDriver::new(channel(backend, 3500), ScriptedUi::new(&[]), 3);

        let actual = driver.run(&purpose).await;

        match actual {
            Err(SessionError::BudgetExceeded { estimated, budget }) => {
                assert!(estimated > budget);
                assert_eq!(budget, 3500);
            }
            other => panic!("Expected BudgetExceeded, got {:?}", other),
        }
        assert!(requests.lock().unwrap().is_empty());
        assert!(driver.ui().output().contains("No constraints were captured"));
    }

    #[tokio::test]
    async fn it_surfaces_backend_errors() {
        let backend = ScriptedBackend::failing("429 Too Many Requests");
        let mut driver = SessionDriver::new(channel(backend, 3500), ScriptedUi::new(&[]), 3);

        let actual = driver.run(PURPOSE).await;

        match actual {
            Err(SessionError::Backend(e)) => assert!(e.to_string().contains("429")),
            other => panic!("Expected Backend, got {:?}", other),
        }
        // The error itself is printed once by the caller
        let ui = driver.ui();
        assert!(!ui.shown.iter().any(|line| line.starts_with("Error:")));
        assert!(ui.output().contains("No constraints were captured"));
    }

    #[tokio::test]
    async fn it_reports_captured_constraints_on_failure() {
        let backend = ScriptedBackend::new(&[
            r#"{"kind": "CONSTRAINT_SUMMARY", "contents": "Input is a list"}"#,
        ]);
        let ui = ScriptedUi::new(&["yes"]);
        let mut driver = SessionDriver::new(channel(backend, 3500), ui, 3);

        // The script runs out of replies on the second request
        let actual = driver.run(PURPOSE).await;

        assert!(matches!(actual, Err(SessionError::Backend(_))));
        let output = driver.ui().output();
        assert!(output.contains("Constraints captured so far\nConstraint 1: Input is a list"));
    }

    #[tokio::test]
    async fn it_fails_when_user_input_closes() {
        let backend = ScriptedBackend::new(&[
            r#"{"kind": "INTRO", "contents": "Can the input be empty?"}"#,
        ]);
        let mut driver = SessionDriver::new(channel(backend, 3500), ScriptedUi::new(&[]), 3);

        let actual = driver.run(PURPOSE).await;
        assert!(matches!(actual, Err(SessionError::Input(_))));
    }

    #[tokio::test]
    async fn it_uses_strict_extractor() {
        let backend = ScriptedBackend::new(&[
            r#"Sure! {"kind": "FINISHED", "contents": ""}"#,
            r#"{"kind": "FINISHED", "contents": ""}"#,
        ]);
        let requests = backend.requests();
        let mut driver = SessionDriver::new(channel(backend, 3500), ScriptedUi::new(&[]), 3);

        let actual = driver
            .run_with_extractor(PURPOSE, Box::new(StrictExtractor))
            .await
            .unwrap();

        assert!(actual.is_empty());
        // The reply with prose was rejected and retried
        assert_eq!(requests.lock().unwrap().len(), 2);
    }
}
