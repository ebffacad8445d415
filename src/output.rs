use std::io::{self, Write};

use serde::Serialize;

use crate::table::FlatTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Json,
    Tsv,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    pub fn print_lines<S: AsRef<str>>(lines: &[S]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for line in lines {
            writeln!(stdout, "{}", line.as_ref())?;
        }
        Ok(())
    }

    pub fn print_table(table: &FlatTable, mode: OutputMode) -> io::Result<()> {
        match mode {
            OutputMode::Json => Self::print(table),
            OutputMode::Tsv => io::stdout().write_all(table.to_tsv().as_bytes()),
        }
    }
}
