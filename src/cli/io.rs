//! Line-delimited JSON I/O for the CLI
//!
//! - Input: one method call object per line
//! - Output: one response envelope per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use crate::channel::MethodResponse;

use super::errors::CliResult;

/// Next non-blank line, or `None` at end of input
pub fn read_frame<R: BufRead>(reader: &mut R) -> CliResult<Option<String>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
        }
    }
}

/// Write one response envelope as a single line
pub fn write_response<W: Write>(writer: &mut W, response: &MethodResponse) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, &response.to_value())?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
