//! Line Protocol
//!
//! Workers report measurements on stdout, one record per line:
//!
//! ```text
//! SLAVE_STEP:<category> - <name> - <duration-ms>ms - <allocated-bytes>B
//! ```
//!
//! Decoding is fail-open: lines without the step prefix are treated as
//! unrelated output, and step lines with unparseable numbers are dropped.
//! Neither aborts the batch.

use crate::step::Step;
use std::io::{BufWriter, Write};
use std::time::Duration;
use thiserror::Error;

/// Prefix of a measurement line
pub const STEP_PREFIX: &str = "SLAVE_STEP:";
/// Prefix of the informational line a worker prints before its first iteration
pub const START_PREFIX: &str = "SLAVE_START:";
/// Prefix of the informational line a worker prints after its last iteration
pub const SUCCESS_PREFIX: &str = "SLAVE_SUCCESS:";
/// Prefix of the diagnostic line a worker prints before exiting with an error
pub const ERROR_PREFIX: &str = "SLAVE_ERROR:";
/// Separator between the fields of a step line
pub const FIELD_DELIMITER: &str = " - ";

/// Errors raised while producing protocol output
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Writing to the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A label would corrupt the line format
    #[error("label {label:?} cannot be encoded: it contains {reason}")]
    InvalidLabel {
        /// The rejected label
        label: String,
        /// What made it unencodable
        reason: &'static str,
    },
}

/// Check that a category or step name survives a round trip through the line format.
///
/// The delimiter would shift the field split, and a line break would split the record.
/// A trailing `" -"` joins with the following delimiter into `" - - "`, which
/// splits one field early just the same.
pub fn validate_label(label: &str) -> Result<(), ProtocolError> {
    let reason = if label.contains(FIELD_DELIMITER) {
        Some("the field delimiter \" - \"")
    } else if label.ends_with(" -") {
        Some("a trailing \" -\" that merges with the field delimiter")
    } else if label.contains(['\n', '\r']) {
        Some("a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ProtocolError::InvalidLabel {
            label: label.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Encode a measurement record as a single protocol line (without the trailing newline)
pub fn encode_step(step: &Step) -> String {
    format!(
        "{STEP_PREFIX}{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{:.2}ms{FIELD_DELIMITER}{}B",
        step.category,
        step.name,
        step.duration_ms(),
        step.allocated_bytes
    )
}

/// A classified line of worker output
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerLine<'a> {
    /// `SLAVE_START:` banner
    Start(&'a str),
    /// A decoded measurement
    Step(Step),
    /// `SLAVE_SUCCESS:` trailer
    Success(&'a str),
    /// `SLAVE_ERROR:` diagnostic
    Error(&'a str),
    /// Anything else, including step lines that failed to decode
    Other(&'a str),
}

/// Classify one line of worker output
pub fn parse_line(line: &str) -> WorkerLine<'_> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.starts_with(STEP_PREFIX) {
        return match decode_step(line) {
            Some(step) => WorkerLine::Step(step),
            None => WorkerLine::Other(line),
        };
    }
    if let Some(rest) = line.strip_prefix(START_PREFIX) {
        return WorkerLine::Start(rest.trim());
    }
    if let Some(rest) = line.strip_prefix(SUCCESS_PREFIX) {
        return WorkerLine::Success(rest.trim());
    }
    if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
        return WorkerLine::Error(rest.trim());
    }
    WorkerLine::Other(line)
}

/// Decode a single step line.
///
/// Returns `None` for lines without the step prefix, with fewer than four
/// fields, or with a duration/byte count that does not parse. Fields past the
/// fourth are ignored.
pub fn decode_step(line: &str) -> Option<Step> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line.strip_prefix(STEP_PREFIX)?;

    let mut fields = body.split(FIELD_DELIMITER);
    let category = fields.next()?;
    let name = fields.next()?;
    let duration_field = fields.next()?;
    let bytes_field = fields.next()?;

    let duration_ms: f64 = strip_unit(duration_field, "ms").parse().ok()?;
    if !duration_ms.is_finite() || duration_ms < 0.0 {
        return None;
    }
    let allocated_bytes: u64 = strip_unit(bytes_field, "B").parse().ok()?;
    let duration = Duration::try_from_secs_f64(duration_ms / 1000.0).ok()?;

    Some(Step::new(category, name, duration, allocated_bytes))
}

fn strip_unit<'a>(field: &'a str, unit: &str) -> &'a str {
    let field = field.trim();
    field.strip_suffix(unit).unwrap_or(field).trim_end()
}

/// Decode every step line in a captured stdout buffer, skipping everything else
pub fn decode_output(output: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    for line in output.lines() {
        if !line.starts_with(STEP_PREFIX) {
            continue;
        }
        match decode_step(line) {
            Some(step) => steps.push(step),
            None => tracing::trace!(line, "dropping malformed step line"),
        }
    }
    steps
}

/// Return the message of the first `SLAVE_ERROR:` line, if the output has one
pub fn find_error(output: &str) -> Option<&str> {
    output.lines().find_map(|line| match parse_line(line) {
        WorkerLine::Error(message) => Some(message),
        _ => None,
    })
}

/// Buffered writer for protocol lines
pub struct LineWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> LineWriter<W> {
    /// Create a new line writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(16 * 1024, writer),
        }
    }

    /// Write the start banner and flush it
    pub fn write_start(&mut self, message: &str) -> Result<(), ProtocolError> {
        writeln!(self.writer, "{START_PREFIX} {message}")?;
        self.flush()
    }

    /// Queue one measurement line (flushed by [`LineWriter::flush`])
    pub fn write_step(&mut self, step: &Step) -> Result<(), ProtocolError> {
        writeln!(self.writer, "{}", encode_step(step))?;
        Ok(())
    }

    /// Write the success trailer and flush it
    pub fn write_success(&mut self, message: &str) -> Result<(), ProtocolError> {
        writeln!(self.writer, "{SUCCESS_PREFIX} {message}")?;
        self.flush()
    }

    /// Write an error diagnostic and flush it
    pub fn write_error(&mut self, message: &str) -> Result<(), ProtocolError> {
        // Keep the diagnostic on one line so it classifies as a single error line.
        let message = message.replace(['\r', '\n'], " ");
        writeln!(self.writer, "{ERROR_PREFIX} {message}")?;
        self.flush()
    }

    /// Flush buffered lines to the underlying writer
    pub fn flush(&mut self) -> Result<(), ProtocolError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Get a mutable reference to the inner writer
    pub fn inner_mut(&mut self) -> &mut BufWriter<W> {
        &mut self.writer
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> BufWriter<W> {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_format() {
        let step = Step::new("Ops", "Insert", Duration::from_micros(10_500), 1000);
        assert_eq!(encode_step(&step), "SLAVE_STEP:Ops - Insert - 10.50ms - 1000B");
    }

    #[test]
    fn test_roundtrip() {
        let original = Step::new("Users", "Bulk insert", Duration::from_nanos(3_456_789), 4096);
        let decoded = decode_step(&encode_step(&original)).unwrap();

        assert_eq!(decoded.category, original.category);
        assert_eq!(decoded.name, original.name);
        assert_eq!(decoded.allocated_bytes, original.allocated_bytes);
        assert!((decoded.duration_ms() - original.duration_ms()).abs() <= 0.01);
    }

    #[test]
    fn test_unrelated_lines_ignored() {
        let output = "\
SLAVE_START: hash x3
warming caches...
SLAVE_STEP:Ops - Insert - 1.00ms - 10B
SLAVE_SUCCESS: done
";
        let steps = decode_output(output);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "Insert");
    }

    #[test]
    fn test_malformed_step_dropped() {
        let output = "\
SLAVE_STEP:Ops - Insert - fast - 10B
SLAVE_STEP:Ops - Insert - 2.00ms - lots
SLAVE_STEP:Ops - Insert - 2.00ms
SLAVE_STEP:Ops - Query - 3.00ms - 20B
";
        let steps = decode_output(output);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "Query");
        assert_eq!(steps[0].allocated_bytes, 20);
    }

    #[test]
    fn test_negative_values_dropped() {
        assert!(decode_step("SLAVE_STEP:Ops - Insert - -1.00ms - 10B").is_none());
        assert!(decode_step("SLAVE_STEP:Ops - Insert - 1.00ms - -10B").is_none());
        assert!(decode_step("SLAVE_STEP:Ops - Insert - NaNms - 10B").is_none());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let step = decode_step("SLAVE_STEP:Ops - Insert - 1.00ms - 10B - trailing").unwrap();
        assert_eq!(step.allocated_bytes, 10);
    }

    #[test]
    fn test_crlf_tolerated() {
        let steps = decode_output("SLAVE_STEP:Ops - Insert - 1.25ms - 7B\r\n");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].allocated_bytes, 7);
    }

    #[test]
    fn test_parse_line_classification() {
        assert_eq!(parse_line("SLAVE_START: a x1"), WorkerLine::Start("a x1"));
        assert_eq!(parse_line("SLAVE_SUCCESS: ok"), WorkerLine::Success("ok"));
        assert_eq!(parse_line("SLAVE_ERROR: boom"), WorkerLine::Error("boom"));
        assert_eq!(parse_line("hello"), WorkerLine::Other("hello"));
        assert!(matches!(
            parse_line("SLAVE_STEP:Ops - Insert - 1.00ms - 1B"),
            WorkerLine::Step(_)
        ));
        assert!(matches!(
            parse_line("SLAVE_STEP:garbage"),
            WorkerLine::Other(_)
        ));
    }

    #[test]
    fn test_find_error() {
        let output = "SLAVE_START: a x1\nSLAVE_ERROR: update count was zero\n";
        assert_eq!(find_error(output), Some("update count was zero"));
        assert_eq!(find_error("SLAVE_START: a x1\n"), None);
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("Insert users").is_ok());
        assert!(validate_label("a-b").is_ok());
        assert!(matches!(
            validate_label("Insert - batch"),
            Err(ProtocolError::InvalidLabel { .. })
        ));
        assert!(validate_label("two\nlines").is_err());

        assert!(validate_label("Insert -").is_err());
        assert!(validate_label(" -").is_err());
        assert!(validate_label("-").is_ok());
        assert!(validate_label("- leading").is_ok());
    }

    #[test]
    fn test_accepted_labels_roundtrip() {
        for label in ["-", "- leading", "a-", "x -y", "Point lookup"] {
            let step = Step::new(label, label, Duration::from_millis(3), 10);
            assert!(validate_label(label).is_ok(), "{label:?} rejected");

            let decoded = decode_step(&encode_step(&step))
                .unwrap_or_else(|| panic!("{label:?} did not decode"));
            assert_eq!(decoded.category, label);
            assert_eq!(decoded.name, label);
            assert_eq!(decoded.allocated_bytes, 10);
        }
    }

    #[test]
    fn test_line_writer() {
        let mut buffer = Vec::new();
        {
            let mut writer = LineWriter::new(&mut buffer);
            writer.write_start("hash x1").unwrap();
            writer
                .write_step(&Step::new("Ops", "Insert", Duration::from_millis(2), 8))
                .unwrap();
            writer.write_error("multi\nline").unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "SLAVE_START: hash x1\nSLAVE_STEP:Ops - Insert - 2.00ms - 8B\nSLAVE_ERROR: multi line\n"
        );
    }
}
