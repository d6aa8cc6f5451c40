use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use define_core::{IntegrityIssue, Repair, SaveSummary};

use crate::types::{ApplyResult, CheckResult, CopyResult, SaveResult};

pub fn render_check(result: &CheckResult) -> String {
    let mut out = format!("Document: {}\n", result.document.display());
    out.push_str(&render_repairs(&result.repairs));
    if result.issues.is_empty() {
        out.push_str("No integrity issues.\n");
        return out;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Issue"), header_cell("Detail")]);
    apply_table_style(&mut table);
    for issue in &result.issues {
        table.add_row(vec![issue_cell(issue), Cell::new(issue)]);
    }
    out.push_str(&format!("Integrity issues ({}):\n{table}\n", result.issues.len()));
    out
}

pub fn render_apply(result: &ApplyResult) -> String {
    let mut out = render_repairs(&result.repairs);
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Action"), header_cell("Changed")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Center);
    for step in &result.steps {
        table.add_row(vec![
            Cell::new(step.index),
            Cell::new(step.kind).fg(Color::Blue),
            flag_cell(step.changed),
        ]);
    }
    let changed = result.steps.iter().filter(|step| step.changed).count();
    table.add_row(vec![
        dim_cell("-"),
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(format!("{changed}/{}", result.steps.len())).add_attribute(Attribute::Bold),
    ]);
    out.push_str(&format!("{table}\n"));
    out
}

pub fn render_save(result: &SaveResult) -> String {
    let mut out = render_repairs(&result.repairs);
    out.push_str(&format!("Define-XML version: {}\n", result.summary.define_version));
    if result.summary.is_empty() {
        out.push_str("Nothing to normalize.\n");
        return out;
    }
    out.push_str(&format!("{}\n", save_table(&result.summary)));
    out
}

pub fn render_copy(result: &CopyResult) -> String {
    let mut out = render_repairs(&result.repairs);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Copied as"),
        header_cell("Datasets"),
        header_cell("Where clauses"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for copy in &result.copies {
        table.add_row(vec![
            Cell::new(&copy.source),
            Cell::new(&copy.copy).fg(Color::Green),
            count_cell(copy.datasets, Color::Reset),
            count_cell(copy.where_clauses, Color::Reset),
        ]);
    }
    out.push_str(&format!("Merged into {}:\n{table}\n", result.result_display));
    out
}

fn render_repairs(repairs: &[Repair]) -> String {
    if repairs.is_empty() {
        return String::new();
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Repair")]);
    apply_table_style(&mut table);
    for repair in repairs {
        table.add_row(vec![Cell::new(repair).fg(Color::Yellow)]);
    }
    format!("Repairs ({}):\n{table}\n", repairs.len())
}

fn save_table(summary: &SaveSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Change"), header_cell("OID"), header_cell("Scope")]);
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    for oid in &summary.removed_item_groups {
        table.add_row(vec![removed_cell("dataset removed"), Cell::new(oid), dim_cell("-")]);
    }
    for (scope, oid) in &summary.removed_item_refs {
        table.add_row(vec![removed_cell("variable removed"), Cell::new(oid), Cell::new(scope)]);
    }
    for oid in &summary.removed_code_lists {
        table.add_row(vec![removed_cell("codelist removed"), Cell::new(oid), dim_cell("-")]);
    }
    for oid in &summary.updated_lengths {
        table.add_row(vec![
            Cell::new("length derived").fg(Color::Green),
            Cell::new(oid),
            dim_cell("-"),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn issue_cell(issue: &IntegrityIssue) -> Cell {
    let label = match issue {
        IntegrityIssue::Order { .. } => "order",
        IntegrityIssue::DanglingReference { .. } => "dangling reference",
        IntegrityIssue::MissingSource { .. } => "missing source",
        IntegrityIssue::StaleSource { .. } => "stale source",
        IntegrityIssue::Orphan { .. } => "orphan",
    };
    Cell::new(label).fg(Color::Red).add_attribute(Attribute::Bold)
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn removed_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Yellow)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
