//! Output mode flags and record printing shared by the subcommands.

use crate::model::BiblioRecord;
use serde::Serialize;

/// `--json` was given.
pub fn is_json() -> bool {
    flag("PATENTSCOPE_JSON")
}

/// `--quiet` was given.
pub fn is_quiet() -> bool {
    flag("PATENTSCOPE_QUIET")
}

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}

/// Human-readable summary of one record.
pub fn format_record(record: &BiblioRecord) -> String {
    let f = &record.fields;
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let list = |v: &[String]| {
        if v.is_empty() {
            "-".to_string()
        } else {
            v.join("; ")
        }
    };

    let mut out = String::new();
    out.push_str(&format!("  {}\n", record.identifier));
    out.push_str(&format!(
        "    Publication:  {} ({})\n",
        opt(&f.publication_number),
        opt(&f.publication_date)
    ));
    out.push_str(&format!(
        "    Application:  {} ({})\n",
        opt(&f.application_number),
        opt(&f.filing_date)
    ));
    out.push_str(&format!("    Title:        {}\n", opt(&f.title)));
    out.push_str(&format!("    Applicants:   {}\n", list(&f.applicants)));
    out.push_str(&format!("    Inventors:    {}\n", list(&f.inventors)));
    if !f.agents.is_empty() {
        out.push_str(&format!("    Agents:       {}\n", list(&f.agents)));
    }
    out.push_str(&format!("    IPC:          {}\n", list(&f.ipc_codes)));
    out.push_str(&format!("    CPC:          {}\n", list(&f.cpc_codes)));
    out.push_str(&format!("    Priority:     {}\n", opt(&f.priority_data)));
    out
}

/// Print records in the selected output mode.
pub fn print_records(records: &[BiblioRecord]) {
    if is_json() {
        print_json(records);
        return;
    }
    for record in records {
        println!("{}", format_record(record));
    }
}
