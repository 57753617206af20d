//! Incremental human-readable rendering of query snapshots.

use std::io::Write;

use askdb_stream::{QuerySnapshot, QueryState, TabularResult};

/// Remembers what has been printed so each snapshot only adds the new parts.
#[derive(Default)]
pub(crate) struct ProgressPrinter {
    max_rows: usize,
    printed_thinking: String,
    last_state: QueryState,
    printed_sql: bool,
    printed_data: bool,
    printed_chart: bool,
}

impl ProgressPrinter {
    pub(crate) fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Self::default()
        }
    }

    pub(crate) fn render(&mut self, snap: &QuerySnapshot, out: &mut impl Write) -> std::io::Result<()> {
        if snap.state != self.last_state {
            self.last_state = snap.state;
            writeln!(out, "\n[{}]", snap.state)?;
        }

        if snap.thinking != self.printed_thinking {
            match snap.thinking.strip_prefix(self.printed_thinking.as_str()) {
                Some(delta) => write!(out, "{delta}")?,
                // Final thinking text replaced the deltas.
                None => write!(out, "\n{}", snap.thinking)?,
            }
            self.printed_thinking.clone_from(&snap.thinking);
        }

        if let (Some(sql), false) = (&snap.sql, self.printed_sql) {
            writeln!(out, "\nSQL:\n{sql}")?;
            self.printed_sql = true;
        }
        if let (Some(data), false) = (&snap.data, self.printed_data) {
            write_table(data, self.max_rows, out)?;
            self.printed_data = true;
        }
        if let (Some(options), false) = (&snap.viz_options, self.printed_chart) {
            let keys = options.as_object().map_or(0, serde_json::Map::len);
            writeln!(out, "chart options received ({keys} top-level keys)")?;
            self.printed_chart = true;
        }
        out.flush()
    }
}

fn write_table(data: &TabularResult, max_rows: usize, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "\n{}", data.columns.join(" | "))?;
    for row in data.rows.iter().take(max_rows) {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        writeln!(out, "{}", cells.join(" | "))?;
    }
    if data.rows.len() > max_rows {
        writeln!(out, "... {} more rows", data.rows.len() - max_rows)?;
    }
    writeln!(
        out,
        "({} rows, {:.1} ms)",
        data.row_count, data.execution_time_ms
    )
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
