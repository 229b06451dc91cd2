//! Scripted medical assistant: keyword rules over a fixed reply table.

use serde::Serialize;

/// What a chat message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    TestPrediction,
    CommonTests,
    HealthAdvice,
    Thanks,
    Fallback,
}

impl Intent {
    /// Intents with a keyword rule, in matching order.
    pub const RULES: [Intent; 5] = [
        Intent::Greeting,
        Intent::TestPrediction,
        Intent::CommonTests,
        Intent::HealthAdvice,
        Intent::Thanks,
    ];

    fn matches(self, lowered: &str) -> bool {
        match self {
            // Whole words only, so "this" or "chip" do not greet
            Intent::Greeting => lowered
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == "hello" || word == "hi"),
            Intent::TestPrediction => lowered.contains("test prediction"),
            Intent::CommonTests => lowered.contains("common tests"),
            Intent::HealthAdvice => lowered.contains("health advice"),
            Intent::Thanks => lowered.contains("thanks") || lowered.contains("thank you"),
            Intent::Fallback => false,
        }
    }

    pub fn response(self) -> &'static str {
        match self {
            Intent::Greeting => "Hello! I'm your medical assistant. How can I help you today?",
            Intent::TestPrediction => {
                "I can help you get a prediction for clinical tests. Please fill out the form \
                 with your medical information."
            }
            Intent::CommonTests => {
                "Here are some common medical tests and their purposes:\n\n\
                 1. Complete Blood Count (CBC): Measures different components of blood\n\
                 2. Basic Metabolic Panel: Checks kidney function, electrolyte balance, and blood sugar\n\
                 3. Lipid Panel: Measures cholesterol and triglyceride levels\n\
                 4. Thyroid Function Test: Evaluates thyroid gland function\n\
                 5. Urinalysis: Analyzes urine for various health conditions"
            }
            Intent::HealthAdvice => {
                "Here are some general health tips:\n\n\
                 1. Maintain a balanced diet\n\
                 2. Exercise regularly\n\
                 3. Get adequate sleep\n\
                 4. Stay hydrated\n\
                 5. Manage stress\n\
                 6. Regular check-ups with your healthcare provider"
            }
            Intent::Thanks => "You're welcome! Is there anything else I can help you with?",
            Intent::Fallback => "I'm not sure I understand. Could you please rephrase that?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub intent: Intent,
    pub response: &'static str,
}

impl From<Intent> for Reply {
    fn from(intent: Intent) -> Self {
        Self {
            intent,
            response: intent.response(),
        }
    }
}

/// Reply to every intent the message matches, or with the fallback.
pub fn respond(message: &str) -> Vec<Reply> {
    let lowered = message.to_lowercase();
    let replies: Vec<Reply> = Intent::RULES
        .into_iter()
        .filter(|intent| intent.matches(&lowered))
        .map(Reply::from)
        .collect();

    if replies.is_empty() {
        vec![Intent::Fallback.into()]
    } else {
        replies
    }
}
