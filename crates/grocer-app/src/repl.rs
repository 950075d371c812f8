//! Terminal chat loop.

use std::io::{self, BufRead, Write};

use grocer_chat::{ChatError, SessionOrchestrator, TurnResponse};

const PROMPT: &str = "you> ";

/// Read messages line by line until EOF, `quit` or `exit`.
pub fn run<R: BufRead, W: Write>(
    orchestrator: &SessionOrchestrator,
    input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(
        output,
        "Grocery assistant ready ({} products). Type 'quit' to leave.",
        orchestrator.catalog().len()
    )?;
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
            break;
        }
        match orchestrator.handle_turn(text) {
            Ok(turn) => write_turn(&mut output, &turn)?,
            Err(ChatError::EmptyMessage) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Skipped input");
                writeln!(output, "{}", e)?;
            }
        }
        write!(output, "{}", PROMPT)?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

fn write_turn<W: Write>(output: &mut W, turn: &TurnResponse) -> io::Result<()> {
    writeln!(output, "{}", turn.message)?;
    for (i, result) in turn.products.iter().enumerate() {
        let p = &result.product;
        writeln!(
            output,
            "  {}. {} ({}) {} at {} [{}]",
            i + 1,
            p.name,
            p.brand,
            p.price,
            p.vendor,
            result.reason
        )?;
    }
    Ok(())
}
