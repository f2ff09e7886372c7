//! Interactive endpoint selection.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use restfuzz_core::ApiModel;

use crate::plan::Selection;

/// Ask which endpoint to check and with how many examples, then ask for
/// confirmation. Returns `None` when the user cancels.
pub fn choose<'a, R, W>(
    model: &'a ApiModel,
    server_url: &str,
    default_examples: usize,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Selection<'a>>>
where
    R: BufRead,
    W: Write,
{
    if model.endpoints.is_empty() {
        bail!("The API description declares no endpoints");
    }

    writeln!(output, "\nWhich endpoint would you like to test?\n")?;
    let index = loop {
        for (i, endpoint) in model.endpoints.iter().enumerate() {
            writeln!(output, "{}) {}", i + 1, endpoint)?;
        }
        let line = prompt(input, output)?.context("No endpoint selected")?;
        match line.parse::<usize>() {
            Ok(choice) if (1..=model.endpoints.len()).contains(&choice) => break choice - 1,
            _ => writeln!(output, "invalid choice")?,
        }
    };

    writeln!(output, "\nWith how many examples?")?;
    let examples = match prompt(input, output)?.and_then(|line| line.parse::<usize>().ok()) {
        Some(n) if n > 0 => n,
        _ => {
            writeln!(output, "Defaulting to {} examples", default_examples)?;
            default_examples
        }
    };

    writeln!(
        output,
        "\nYou are about to send up to {} requests to {}.\nHit Enter to confirm, or type n to cancel.",
        examples, server_url
    )?;
    let answer = prompt(input, output)?.unwrap_or_default();
    if matches!(answer.to_ascii_lowercase().as_str(), "n" | "no") {
        return Ok(None);
    }

    Ok(Some(Selection {
        endpoint: &model.endpoints[index],
        examples,
    }))
}

/// Prints `? ` and reads one trimmed line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Option<String>> {
    write!(output, "? ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
