//! Reading analysis requests
//!
//! A single request is one JSON document. Batches are JSON lines, one request
//! per line; a malformed line fails only that line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use traderdna_core::ledger::realize_fifo;
use traderdna_core::{AnalysisRequest, WalletError};

use crate::error::{validate_wallet, CliError, Result};

/// Open `path` for reading, `-` meaning stdin.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

pub fn read_request(path: &Path, realize: bool) -> Result<AnalysisRequest> {
    let mut raw = String::new();
    open(path)?.read_to_string(&mut raw)?;
    parse_request(&raw, 1, realize)
}

/// Parse every non-blank line. Results keep their 1-based line numbers.
pub fn read_requests(reader: impl BufRead, realize: bool) -> Vec<(usize, Result<AnalysisRequest>)> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line_no = index + 1;
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some((line_no, parse_request(&line, line_no, realize))),
                Err(e) => Some((line_no, Err(CliError::Io(e)))),
            }
        })
        .collect()
}

fn parse_request(raw: &str, line: usize, realize: bool) -> Result<AnalysisRequest> {
    let mut request: AnalysisRequest =
        serde_json::from_str(raw).map_err(|source| CliError::Input { line, source })?;
    validate_wallet(&request.wallet)?;

    if realize {
        tracing::debug!(wallet = %request.wallet, "Recomputing realized P&L from FIFO lots");
        request.trades = realize_fifo(&request.trades)
            .map_err(|e| WalletError::new(request.wallet.clone(), e))?;
    }
    Ok(request)
}
