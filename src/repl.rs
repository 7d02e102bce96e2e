//! Interactive query shell.
//!
//! Loads a knowledge base, prompts with `?-`, reads one goal per line and
//! enumerates its solutions one per `<Enter>` press. Any other input
//! stops the enumeration; `No` marks exhaustion. An empty query line
//! exits the shell.

use crate::api::{solve_all_into, Failure, Solution, SolveOptions};
use crate::kb::KnowledgeBase;
use crate::parser::{parse_query, ParseError};
use crate::reader::load_from_text;
use crate::solve::{sink_from, OutputSink};
use crate::subst::SubstitutionSet;
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// The shell state and configuration.
pub struct Repl {
    kb: KnowledgeBase,
    options: SolveOptions,
    prompt: String,
}

enum Step {
    Continue,
    Quit,
}

impl Repl {
    /// Create a shell with an empty knowledge base and default settings.
    pub fn new() -> Repl {
        Repl {
            kb: KnowledgeBase::new(),
            options: SolveOptions::default(),
            prompt: "?- ".to_string(),
        }
    }

    /// Create a shell around an existing knowledge base.
    pub fn with_kb(kb: KnowledgeBase) -> Repl {
        Repl { kb, ..Repl::new() }
    }

    /// Set the execution-time budget per query.
    pub fn with_max_time(mut self, max_time: Duration) -> Repl {
        self.options.max_time = max_time;
        self
    }

    /// Set the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Repl {
        self.prompt = prompt.into();
        self
    }

    /// Load rules from source text into the shell's knowledge base.
    pub fn load_text(&mut self, text: &str) -> Result<(), ParseError> {
        load_from_text(&mut self.kb, text)
    }

    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn kb_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    /// Run the shell until the input ends or an empty query is entered.
    /// Solver output and shell output share the same writer.
    pub fn run<R, W>(&mut self, input: &mut R, output: W) -> io::Result<()>
    where
        R: BufRead,
        W: Write + Send,
    {
        let sink = sink_from(output);

        loop {
            {
                let mut out = sink.lock();
                write!(out, "{}", self.prompt)?;
                out.flush()?;
            }

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let query = line.trim();
            if query.is_empty() {
                break;
            }

            let goal = match parse_query(query) {
                Ok(goal) => goal,
                Err(err) => {
                    let mut out = sink.lock();
                    writeln!(out, "Error: {}", err)?;
                    continue;
                }
            };

            let (solutions, failure) =
                solve_all_into(&goal, &self.kb, &SubstitutionSet::new(), &self.options, &sink);

            match failure {
                Failure::None => match self.enumerate(&solutions, input, &sink)? {
                    Step::Continue => {}
                    Step::Quit => break,
                },
                other => {
                    let mut out = sink.lock();
                    writeln!(out, "{}", other)?;
                }
            }
        }

        Ok(())
    }

    /// Show solutions one at a time, advancing on an empty input line.
    fn enumerate<R: BufRead>(
        &self,
        solutions: &[Solution],
        input: &mut R,
        sink: &OutputSink<'_>,
    ) -> io::Result<Step> {
        for solution in solutions {
            {
                let mut out = sink.lock();
                write!(out, "{} ", solution.format())?;
                out.flush()?;
            }
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(Step::Quit);
            }
            if !line.trim().is_empty() {
                // Anything but a bare Enter stops the enumeration.
                return Ok(Step::Continue);
            }
        }
        let mut out = sink.lock();
        writeln!(out, "No")?;
        Ok(Step::Continue)
    }
}

impl Default for Repl {
    fn default() -> Self {
        Repl::new()
    }
}
