//! Onboarding Conversation
//!
//! The linear four-step attunement form: birth year, month, day,
//! location. Out-of-range input re-prompts the same step and never
//! advances. The state machine is pure - the caller feeds it message
//! texts and relays the replies - so the whole flow is testable without
//! a channel.

use crate::profile::UserProfile;

/// The step the conversation is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Year,
    Month,
    Day,
    Location,
}

/// Result of feeding one user message to the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OnboardingOutcome {
    /// Send this reply and wait for the next message.
    Continue(String),
    /// The form is complete; store the profile and send the farewell.
    Complete {
        /// The collected profile.
        profile: UserProfile,
        /// Confirmation text to send.
        farewell: String,
    },
}

/// One user's in-progress attunement.
#[derive(Clone, Debug)]
pub struct Onboarding {
    step: Step,
    current_year: i32,
    year: Option<i32>,
    month: Option<u8>,
    day: Option<u8>,
}

impl Onboarding {
    /// Start a fresh form. `current_year` bounds the year validation;
    /// callers pass the current calendar year.
    #[must_use]
    pub fn new(current_year: i32) -> Self {
        Self {
            step: Step::Year,
            current_year,
            year: None,
            month: None,
            day: None,
        }
    }

    /// The opening prompt for a fresh form.
    #[must_use]
    pub fn opening_prompt() -> &'static str {
        "First, a small attunement.\nWhat is your year of birth?"
    }

    /// The dismissal text when a user cancels mid-form.
    #[must_use]
    pub fn dismissal() -> &'static str {
        "Attunement dismissed. You can /start again anytime."
    }

    /// Feed one message to the form.
    pub fn advance(&mut self, input: &str) -> OnboardingOutcome {
        let input = input.trim();
        match self.step {
            Step::Year => match parse_in_range(input, 1900, i64::from(self.current_year)) {
                Some(year) => {
                    self.year = Some(year as i32);
                    self.step = Step::Month;
                    OnboardingOutcome::Continue("And the month? (1\u{2013}12)".to_string())
                }
                None => OnboardingOutcome::Continue(
                    "Use 4 digits, e.g. 1990. What is your year of birth?".to_string(),
                ),
            },
            Step::Month => match parse_in_range(input, 1, 12) {
                Some(month) => {
                    self.month = Some(month as u8);
                    self.step = Step::Day;
                    OnboardingOutcome::Continue("And the day? (1\u{2013}31)".to_string())
                }
                None => OnboardingOutcome::Continue(
                    "Please reply with a number 1\u{2013}12 for the month.".to_string(),
                ),
            },
            Step::Day => match parse_in_range(input, 1, 31) {
                Some(day) => {
                    self.day = Some(day as u8);
                    self.step = Step::Location;
                    OnboardingOutcome::Continue(
                        "Where are you located? (city or place)".to_string(),
                    )
                }
                None => OnboardingOutcome::Continue(
                    "Please reply with a number 1\u{2013}31 for the day.".to_string(),
                ),
            },
            Step::Location => {
                if input.is_empty() {
                    return OnboardingOutcome::Continue(
                        "Where are you located? (city or place)".to_string(),
                    );
                }
                // The earlier steps are guaranteed filled once we are here.
                let profile = UserProfile {
                    year: self.year.unwrap_or(1900),
                    month: self.month.unwrap_or(1),
                    day: self.day.unwrap_or(1),
                    location: input.to_string(),
                };
                OnboardingOutcome::Complete {
                    profile,
                    farewell: "Attunement complete. Type /draw or press the button below after your first card."
                        .to_string(),
                }
            }
        }
    }
}

fn parse_in_range(input: &str, min: i64, max: i64) -> Option<i64> {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: i64 = input.parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}
