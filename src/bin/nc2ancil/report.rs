//! Tables printed by the `plan` and `inspect` subcommands
use ancil_rs::{
    ancil::{AncilFile, ComponentKind, Field},
    update::SliceAssignment,
};
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Tabled)]
struct PlanRow {
    #[tabled(rename = "field")]
    field_index: usize,
    stash: i64,
    lblev: i64,
    variable: String,
    #[tabled(rename = "slice")]
    slice_index: usize,
}

/// Table of which variable slice goes into which field. Fields that are
/// not replaced are listed with "-" as the variable.
pub(crate) fn plan_table(ancil: &AncilFile, plan: &[SliceAssignment]) -> String {
    let rows = ancil.fields.iter().enumerate().map(|(i, field)| {
        let (variable, slice_index) = plan
            .get(i)
            .map(|a| (a.variable.clone(), a.slice_index))
            .unwrap_or_else(|| ("-".to_string(), 0));
        PlanRow {
            field_index: i,
            stash: field.lookup.stash_code(),
            lblev: field.lookup.lblev(),
            variable,
            slice_index,
        }
    });
    Table::new(rows).with(Style::psql()).to_string()
}

#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "field")]
    index: usize,
    stash: i64,
    lblev: i64,
    lbrow: i64,
    lbnpt: i64,
    lbpack: i64,
    #[tabled(rename = "type")]
    data_type: &'static str,
}

impl FieldRow {
    fn new(index: usize, field: &Field) -> Self {
        let data_type = match field.lookup.lbuser1() {
            1 => "real",
            2 => "integer",
            3 => "logical",
            _ => "unknown",
        };
        Self {
            index,
            stash: field.lookup.stash_code(),
            lblev: field.lookup.lblev(),
            lbrow: field.lookup.lbrow(),
            lbnpt: field.lookup.lbnpt(),
            lbpack: field.lookup.lbpack(),
            data_type,
        }
    }
}

/// Header summary followed by a table of fields
pub(crate) fn inspect_report(ancil: &AncilFile) -> String {
    let fh = &ancil.fixed_header;
    let mut lines = vec![
        format!("Byte order:          {:?}", ancil.byte_order()),
        format!("Format version:      {}", fh.data_set_format_version()),
        format!("Dataset type:        {}", fh.dataset_type()),
        format!("Grid staggering:     {}", fh.grid_staggering()),
        format!("Model version:       {}", fh.model_version()),
    ];
    if let Some((rows, cols)) = ancil.grid_shape() {
        lines.push(format!("Grid (rows x cols):  {rows} x {cols}"));
    }
    for kind in ComponentKind::ALL {
        if let Some(c) = ancil.component(kind) {
            lines.push(format!("{:<21}{:?}", format!("{kind:?}:"), c.dims()));
        }
    }
    lines.push(format!("Number of fields:    {}", ancil.fields.len()));

    let rows = ancil.fields.iter().enumerate().map(|(i, f)| FieldRow::new(i, f));
    let table = Table::new(rows).with(Style::psql()).to_string();
    format!("{}\n\n{table}", lines.join("\n"))
}
