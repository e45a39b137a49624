//! Line-oriented chat loop over any reader/writer pair.

use std::io::{self, BufRead, Write};

use owo_colors::OwoColorize;

use super::workflow::{Learned, Reply, TeachError, Tutor};

/// Input that ends the session.
pub const QUIT_SENTINEL: &str = "quit";

/// Whether `line` is the quit sentinel.
#[must_use]
pub fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(QUIT_SENTINEL)
}

/// Console behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOptions {
    /// Ask whether each answer was right and offer a correction.
    pub confirm_answers: bool,
    /// Colorize the speaker prefixes.
    pub color: bool,
}

/// Counters for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub answered: usize,
    pub learned: usize,
    /// Answers learned in memory that failed to save.
    pub unsaved: usize,
}

/// Interactive chat session.
pub struct Console<R, W> {
    input: R,
    output: W,
    options: ConsoleOptions,
}

impl<R: BufRead, W: Write> Console<R, W> {
    #[must_use]
    pub fn new(input: R, output: W, options: ConsoleOptions) -> Self {
        Self {
            input,
            output,
            options,
        }
    }

    /// Consume the console, returning the writer.
    pub fn into_output(self) -> W {
        self.output
    }

    fn bot_prefix(&self) -> String {
        if self.options.color {
            "Bot:".green().bold().to_string()
        } else {
            "Bot:".to_string()
        }
    }

    fn user_prefix(&self) -> String {
        if self.options.color {
            "You:".cyan().bold().to_string()
        } else {
            "You:".to_string()
        }
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        let prefix = self.bot_prefix();
        writeln!(self.output, "{prefix} {message}")
    }

    /// Print `prompt` and read one line; `None` on end of input.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Run turns until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal itself fails.
    pub fn run(&mut self, tutor: &mut Tutor) -> io::Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        let user_prompt = format!("{} ", self.user_prefix());

        while let Some(line) = self.ask(&user_prompt)? {
            if is_quit(&line) {
                break;
            }
            summary.turns += 1;

            let taught = match tutor.respond(&line) {
                Reply::Empty => {
                    self.say("Please type a question.")?;
                    continue;
                }
                Reply::Answer { answer, .. } => {
                    summary.answered += 1;
                    self.say(&answer)?;
                    if !self.options.confirm_answers {
                        tutor.accept();
                        continue;
                    }
                    let Some(feedback) = self.ask("Is this the expected answer? [y/n]: ")? else {
                        break;
                    };
                    if feedback.trim().eq_ignore_ascii_case("y") {
                        tutor.accept();
                        continue;
                    }
                    tutor.reject();
                    self.say("Sorry for that. What's the correct answer?")?;
                    self.teach(tutor)?
                }
                Reply::Unknown { .. } => {
                    self.say("Sorry, I don't understand. Can you teach me?")?;
                    self.teach(tutor)?
                }
            };

            match taught {
                None => break,
                Some(Ok(Learned::Saved(_))) => summary.learned += 1,
                Some(Ok(Learned::Skipped)) => {}
                Some(Err(TeachError::Persistence(_))) => {
                    summary.learned += 1;
                    summary.unsaved += 1;
                }
                Some(Err(_)) => {}
            }
        }

        tracing::info!(
            turns = summary.turns,
            answered = summary.answered,
            learned = summary.learned,
            "Chat session ended"
        );
        Ok(summary)
    }

    /// Ask for an answer and hand it to the tutor; `None` on end of input.
    fn teach(&mut self, tutor: &mut Tutor) -> io::Result<Option<Result<Learned, TeachError>>> {
        let Some(answer) = self.ask("Type the answer or \"skip\" to skip: ")? else {
            return Ok(None);
        };

        let result = tutor.learn(&answer);
        match &result {
            Ok(Learned::Saved(_)) => self.say("Thanks for teaching me!")?,
            Ok(Learned::Skipped) => {}
            Err(TeachError::InvalidEntry(_)) => self.say("I can't learn an empty answer.")?,
            Err(e) => self.say(&e.to_string())?,
        }
        Ok(Some(result))
    }
}
