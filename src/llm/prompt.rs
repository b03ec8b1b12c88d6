use anyhow::{Context, Result};

use crate::qbreader::CleanResults;

use super::response::{ChatMessage, Role};

/// Instructions that make the model answer with one cloze card per line.
/// The translator relies on that framing.
pub const SYSTEM_PROMPT: &str = r#"
You are going to receive a series of quizbowl tossups and bonuses related to a given query.
If you see the same clue related to that query repeatedly mentioned in the list of questions, format it into an Anki cloze flashcard (a sentence with the important keywords in clozes).
Place an emphasis on information related to question answerlines, and keep the flashcards separated by newline.
If you see "this" followed by some noun in a question, look at the corresponding answerline to figure out what it's referring to and replace it.
Clozes should not have the same number unless they are very closely related or refer to the same thing.
Each flashcard should have 2 to 5 clozes, and consist of a single sentence.
Make sure that you don't repeat clues in the flashcards.

For example, for the query "Barbara Hepworth," if you see the "This wife of Ben Nicholson dedicated Single Form, which is at the UN Headquarters, to Dag Hammarskjöld." and "Name this 20th-century sculptor who also created a 21-foot tall memorial to Dag Hammarskjöld entitled Single Form." in separate questions, you might create "{{c1::Barbara Hepworth}} dedicated {{c2::Single Form}} to {{c3::Dag Hammarskjöld}}" as a flashcard.
"#;

pub fn user_prompt(query: &str, questions: &CleanResults) -> Result<String> {
    let questions_json =
        serde_json::to_string_pretty(questions).context("Failed to serialize questions")?;
    Ok(format!(
        "The query is {query} and the questions are: {questions_json}"
    ))
}

pub fn card_request(query: &str, questions: &CleanResults) -> Result<Vec<ChatMessage>> {
    Ok(vec![
        ChatMessage::new(Role::System, SYSTEM_PROMPT),
        ChatMessage::new(Role::User, user_prompt(query, questions)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qbreader::{CleanTossup, QuestionSet};

    #[test]
    fn prompt_promises_cloze_lines() {
        assert!(SYSTEM_PROMPT.contains("{{c1::"));
        assert!(SYSTEM_PROMPT.contains("separated by newline"));
    }

    #[test]
    fn request_is_system_then_user() {
        let questions = CleanResults {
            tossups: QuestionSet {
                question_array: vec![CleanTossup {
                    question: "Name this sculptor of Single Form.".into(),
                    answer: "Barbara Hepworth".into(),
                }],
            },
            ..CleanResults::default()
        };
        let messages = card_request("Hepworth", &questions).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(
            messages[1]
                .content
                .starts_with("The query is Hepworth and the questions are: {")
        );
        assert!(messages[1].content.contains("Name this sculptor of Single Form."));
    }
}
