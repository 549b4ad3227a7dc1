//! Deterministic offline tutor used when no model is reachable.

use async_trait::async_trait;
use studybuddy_rag::SearchResult;

use crate::error::Result;
use crate::generator::Generator;
use crate::prompt::ChatTurn;
use crate::quiz::{Question, QuestionKind};

const SINE_REPLY: &str = "The sine of an angle in a right triangle is the length of the side \
opposite the angle divided by the hypotenuse: sin(θ) = opposite / hypotenuse. On the unit circle, \
sin(θ) is the y-coordinate of the point at angle θ, so it ranges from -1 to 1 and repeats every \
360° (2π radians). Useful values to remember: sin(0°) = 0, sin(30°) = 1/2, sin(90°) = 1.";

const ARRAY_REPLY: &str = "An array is a fixed-size collection of elements of the same type stored \
in contiguous memory. Each element is reached by its index, usually starting at 0, which makes \
reading or writing any position O(1). Inserting or removing in the middle is O(n) because later \
elements have to shift. Dynamic arrays (like Vec in Rust or list in Python) grow by reallocating \
into a larger block when they run out of room.";

const GREETING_REPLY: &str = "Hello! I'm StudyBuddy, your study assistant. Upload your notes or \
textbook chapters as PDFs and ask me anything about them, or ask for a quiz on a topic to test \
yourself.";

const HELP_REPLY: &str = "Here's how I can help:\n\
- Ask a question about your uploaded material and I'll answer from the most relevant passages.\n\
- Ask for a quiz on a topic to get multiple-choice and short-answer practice questions.\n\
- Upload more PDFs any time to widen what I can draw on.";

const GENERIC_REPLY: &str = "I don't have a full answer for that right now. To answer well I'd \
need study material that covers the topic: try uploading the relevant notes or chapter as a PDF, \
or rephrase the question using the key terms from your course.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Sine,
    Arrays,
    Greeting,
    Help,
    Other,
}

fn classify(message: &str) -> Topic {
    let lowered = message.to_lowercase();
    let words: Vec<&str> =
        lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));

    if has(&["sine", "sin", "trig", "trigonometry", "trigonometric"]) {
        Topic::Sine
    } else if has(&["array", "arrays", "list", "lists"]) || lowered.contains("data structure") {
        Topic::Arrays
    } else if has(&["hello", "hi", "hey", "greetings"]) {
        Topic::Greeting
    } else if has(&["help"]) {
        Topic::Help
    } else {
        Topic::Other
    }
}

fn canned_reply(message: &str) -> &'static str {
    match classify(message) {
        Topic::Sine => SINE_REPLY,
        Topic::Arrays => ARRAY_REPLY,
        Topic::Greeting => GREETING_REPLY,
        Topic::Help => HELP_REPLY,
        Topic::Other => GENERIC_REPLY,
    }
}

/// Number of multiple-choice questions in a fallback quiz: 60% rounded up.
pub fn multiple_choice_count(num_questions: usize) -> usize {
    (num_questions * 3).div_ceil(5)
}

const MC_TEMPLATES: [&str; 3] = [
    "Which statement best describes {topic}?",
    "What is the main purpose of {topic}?",
    "Which of the following is true about {topic}?",
];

const SA_TEMPLATES: [&str; 3] = [
    "In your own words, explain {topic}.",
    "Give an example of {topic} and describe how it works.",
    "What is one common mistake people make with {topic}?",
];

/// Keyword-matching tutor that never fails.
///
/// Chat replies come from a handful of canned topics (sine, arrays, greeting,
/// help) and a generic answer otherwise; retrieved passages are quoted
/// verbatim ahead of the reply. Quizzes have 60% (rounded up) multiple-choice
/// questions with placeholder options where the first is correct, followed by
/// short-answer questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedGenerator;

impl CannedGenerator {
    /// Create the canned generator.
    pub fn new() -> Self {
        Self
    }

    /// The canned reply for `message` with `passages` quoted in front.
    pub fn reply(&self, message: &str, passages: &[SearchResult]) -> String {
        let answer = canned_reply(message);
        if passages.is_empty() {
            return answer.to_string();
        }

        let mut reply = String::from("Here's what your study material says:\n\n");
        for passage in passages {
            reply.push_str("> ");
            reply.push_str(&passage.text.trim().replace('\n', "\n> "));
            reply.push_str("\n\n");
        }
        reply.push_str(answer);
        reply
    }

    /// A deterministic placeholder quiz of exactly `num_questions` questions.
    pub fn questions(&self, topic: &str, num_questions: usize) -> Vec<Question> {
        let topic = topic.trim();
        let mc = multiple_choice_count(num_questions);

        (0..num_questions)
            .map(|i| {
                let id = i as u32 + 1;
                if i < mc {
                    let options = vec![
                        format!("The core definition of {topic}"),
                        format!("A common misconception about {topic}"),
                        format!("A concept unrelated to {topic}"),
                        "None of the above".to_string(),
                    ];
                    Question {
                        id,
                        question: MC_TEMPLATES[i % MC_TEMPLATES.len()].replace("{topic}", topic),
                        explanation: format!(
                            "Review the definition of {topic} in your notes to confirm this."
                        ),
                        kind: QuestionKind::MultipleChoice { answer: options[0].clone(), options },
                    }
                } else {
                    let j = i - mc;
                    Question {
                        id,
                        question: SA_TEMPLATES[j % SA_TEMPLATES.len()].replace("{topic}", topic),
                        explanation: format!("Compare your answer with the sections on {topic}."),
                        kind: QuestionKind::ShortAnswer {
                            answer: format!("Answers will vary; key points about {topic}."),
                        },
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn chat_response(
        &self,
        message: &str,
        passages: &[SearchResult],
        _history: &[ChatTurn],
    ) -> Result<String> {
        Ok(self.reply(message, passages))
    }

    async fn quiz(
        &self,
        topic: &str,
        _passages: &[SearchResult],
        num_questions: usize,
    ) -> Result<Vec<Question>> {
        Ok(self.questions(topic, num_questions))
    }

    fn name(&self) -> &str {
        "canned"
    }
}
