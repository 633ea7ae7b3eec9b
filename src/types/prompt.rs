use std::fmt;

use crate::Error;

/// Speaker labels wrapped around a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLabels {
    pub user: &'static str,
    pub assistant: &'static str,
}

/// A fixed preamble that sets the model's role, plus optional turn framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    preamble: &'static str,
    turn: Option<TurnLabels>,
}

/// The conversational care assistant.
pub const CHAT_PERSONA: Persona = Persona {
    preamble: "You are a friendly and empathetic medical assistant named CareBot.
You speak with warmth and clarity. Be concise but kind.
If someone asks about a medical issue, offer basic advice and encourage them to see a doctor.
Don't use technical jargon unless asked to explain it.",
    turn: Some(TurnLabels {
        user: "User",
        assistant: "CareBot",
    }),
};

/// The recovery planner that turns an intake record into a daily schedule.
pub const SCHEDULE_PERSONA: Persona = Persona {
    preamble: "You are CareBot, a post-operative recovery planner.
Using the patient intake record below, write a personalized daily care schedule for the patient's recovery.
Respect the patient's sleep schedule, diet preferences and allergies, and place each listed medication at a sensible time.
Respond only with a Markdown table with the columns | Time | Task |, one row per activity.",
    turn: None,
};

impl Persona {
    /// A persona without turn framing.
    pub const fn new(preamble: &'static str) -> Self {
        Self {
            preamble,
            turn: None,
        }
    }

    /// Frame the input as a `User: ... / Assistant:` exchange.
    pub const fn with_turn(mut self, user: &'static str, assistant: &'static str) -> Self {
        self.turn = Some(TurnLabels { user, assistant });
        self
    }

    pub fn preamble(&self) -> &'static str {
        self.preamble
    }

    /// Render the final prompt for `input`, rejecting empty input before framing.
    pub fn render(&self, input: &str) -> Result<Prompt, Error> {
        ensure_content(input)?;
        match self.turn {
            Some(labels) => Prompt::build(
                self.preamble,
                &format!("{}: {}\n{}:", labels.user, input, labels.assistant),
            ),
            None => Prompt::build(self.preamble, input),
        }
    }
}

/// The final text sent to the provider. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    /// Compose `persona` and `input`. Deterministic; fails on blank input.
    pub fn build(persona: &str, input: &str) -> Result<Self, Error> {
        ensure_content(input)?;
        let persona = persona.trim();
        let text = if persona.is_empty() {
            input.to_string()
        } else {
            format!("{persona}\n\n{input}")
        };
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn ensure_content(input: &str) -> Result<(), Error> {
    if input.trim().is_empty() {
        return Err(Error::invalid_input("prompt input is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_build_is_deterministic() {
        let first = Prompt::build("You are helpful.", "Hello").unwrap();
        let second = Prompt::build("You are helpful.", "Hello").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "You are helpful.\n\nHello");
    }

    #[test]
    fn test_build_rejects_blank_input() {
        for input in ["", "   ", "\n\t "] {
            let err = Prompt::build("persona", input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_chat_persona_frames_turn() {
        let prompt = CHAT_PERSONA.render("I feel dizzy").unwrap();
        assert!(prompt.as_str().starts_with("You are a friendly and empathetic"));
        assert!(prompt.as_str().ends_with("\n\nUser: I feel dizzy\nCareBot:"));
    }

    #[test]
    fn test_render_rejects_before_framing() {
        // The framed text would never be empty, so validation must see the raw input.
        let err = CHAT_PERSONA.render("  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_custom_persona() {
        let persona = Persona::new("Answer in French.").with_turn("Q", "A");
        let prompt = persona.render("Hello").unwrap();
        assert_eq!(prompt.to_string(), "Answer in French.\n\nQ: Hello\nA:");
    }
}
