use model::{
    core::identifiers::FieldProjection,
    records::{
        row::{META_COLUMNS, Row},
        table::{Cell, Table},
    },
};

/// Shapes mapped rows into a table.
///
/// An explicit projection fixes the columns to `_index, _id, _score` plus the
/// projected fields in caller order, and a row lacking a projected field gets
/// an empty string there. Without a projection, or with the wildcard, the
/// columns are whatever the rows carry, in first-seen order, and gaps are
/// null.
pub fn assemble(rows: Vec<Row>, projection: Option<&FieldProjection>) -> Table {
    match projection.and_then(FieldProjection::columns) {
        Some(fields) => {
            let columns: Vec<String> = META_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(fields.iter().cloned())
                .collect();
            fill(columns, rows, Cell::empty)
        }
        None => {
            let mut columns: Vec<String> = Vec::new();
            for row in &rows {
                for name in row.column_names() {
                    if !columns.iter().any(|c| c == name) {
                        columns.push(name.to_string());
                    }
                }
            }
            if columns.is_empty() {
                columns = META_COLUMNS.iter().map(|c| c.to_string()).collect();
            }
            fill(columns, rows, || Cell::Null)
        }
    }
}

fn fill(columns: Vec<String>, rows: Vec<Row>, absent: impl Fn() -> Cell) -> Table {
    let mut table = Table::new(columns);
    for row in rows {
        let cells = table
            .columns()
            .iter()
            .map(|column| row.get(column).unwrap_or_else(&absent))
            .collect();
        table.push_row(cells);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, fields: &[(&str, &str)]) -> Row {
        let mut row = Row::new("notes", id, Some(1.0));
        for (name, value) in fields {
            row.push_field(*name, *value);
        }
        row
    }

    #[test]
    fn explicit_projection_fills_missing_with_empty_string() {
        let rows = vec![
            row("1", &[("title", "a"), ("category", "cardio")]),
            row("2", &[("title", "b")]),
        ];
        let projection = FieldProjection::from(&["title", "category"][..]);
        let table = assemble(rows, Some(&projection));

        assert_eq!(table.columns(), ["_index", "_id", "_score", "title", "category"]);
        assert_eq!(table.cell(1, "category"), Some(&Cell::empty()));
        assert_eq!(table.cell(0, "_score"), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn wildcard_infers_columns_from_rows() {
        let rows = vec![row("1", &[("title", "a")]), row("2", &[("extra", "x")])];
        let table = assemble(rows, Some(&FieldProjection::all()));

        assert_eq!(table.columns(), ["_index", "_id", "_score", "title", "extra"]);
        assert_eq!(table.cell(0, "extra"), Some(&Cell::Null));
    }

    #[test]
    fn empty_result_still_has_metadata_columns() {
        let projection = FieldProjection::from(&["title"][..]);
        assert_eq!(assemble(vec![], Some(&projection)).columns().len(), 4);
        assert_eq!(assemble(vec![], None).columns().len(), 3);
    }
}
