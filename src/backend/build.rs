//! Classification of build-tool output and the produced executable's summary line.

/// How one build-output line should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEcho {
    /// Before any error: not shown
    Quiet,
    /// Before any error: shown as a progress tick
    Progress,
    /// The line that first contained the error marker
    FirstError,
    /// Any line after the first error
    Error,
}

/// Substrings that drive build-output classification.
#[derive(Debug, Clone, Copy)]
pub struct BuildMarkers<'a> {
    pub error: &'a str,
    pub progress: &'a str,
}

/// Fold state over the build tool's output. `had_error` is sticky.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub had_error: bool,
    pub lines: Vec<String>,
}

impl BuildOutcome {
    /// Classify the next line and add it to the outcome.
    pub fn absorb(&mut self, line: String, markers: BuildMarkers<'_>) -> BuildEcho {
        let echo = if self.had_error {
            BuildEcho::Error
        } else if line.contains(markers.error) {
            self.had_error = true;
            BuildEcho::FirstError
        } else if line.contains(markers.progress) {
            BuildEcho::Progress
        } else {
            BuildEcho::Quiet
        };
        self.lines.push(line);
        echo
    }
}

/// Reduce a complete build-output sequence, reporting each line's echo as it is classified.
pub fn fold_build_output<I>(lines: I, markers: BuildMarkers<'_>, mut on_echo: impl FnMut(&str, BuildEcho)) -> BuildOutcome
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().fold(BuildOutcome::default(), |mut outcome, line| {
        let echo = outcome.absorb(line, markers);
        if let Some(last) = outcome.lines.last() {
            on_echo(last, echo);
        }
        outcome
    })
}

/// What the produced executable printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Last stdout line, expected to be `Result(<value>), <ticks>ms`
    pub summary: Option<String>,
    /// Token between the first `(` and the following `)`
    pub result: Option<String>,
}

impl RunOutcome {
    pub fn from_summary(summary: Option<String>) -> Self {
        let result = summary.as_deref().and_then(extract_result).map(str::to_string);
        Self { summary, result }
    }
}

/// Extract `42` from `Result(42), 7ms`.
///
/// Returns `None` when there is no `(`, or no `)` after it.
pub fn extract_result(line: &str) -> Option<&str> {
    let open = line.find('(')? + 1;
    let close = line[open..].find(')')? + open;
    Some(&line[open..close])
}
