use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::types::{AnalysisError, Result};

/// A single typed column.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Numeric cells; missing cells are `None`, infinities are kept.
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a numeric column with no missing entries.
    pub fn from_values(values: &[f64]) -> Self {
        Column::Numeric(values.iter().map(|&v| Some(v)).collect())
    }
}

/// Column-oriented table with header order preserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Assemble a table, checking that every column has the same length.
    ///
    /// # Errors
    /// Returns `AnalysisError::LengthMismatch` if names and columns disagree in
    /// count or columns differ in length.
    pub fn from_columns(names: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(AnalysisError::LengthMismatch {
                expected: names.len(),
                found: columns.len(),
            });
        }
        if let Some(first) = columns.first() {
            let rows = first.len();
            for col in columns.iter().skip(1) {
                if col.len() != rows {
                    return Err(AnalysisError::LengthMismatch {
                        expected: rows,
                        found: col.len(),
                    });
                }
            }
        }
        Ok(Self { names, columns })
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| self.missing(name))
    }

    /// Numeric cells of `name`.
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v),
            Column::Text(_) => Err(AnalysisError::NonNumericColumn(name.to_string())),
        }
    }

    /// Append `column`, or replace it when `name` already exists.
    pub fn set_column(&mut self, name: &str, column: Column) -> Result<()> {
        if self.ncols() > 0 && column.len() != self.nrows() {
            return Err(AnalysisError::LengthMismatch {
                expected: self.nrows(),
                found: column.len(),
            });
        }
        match self.names.iter().position(|n| n == name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Copy of the table without the columns rejected by `drop`.
    pub fn without_columns(&self, drop: impl Fn(&str) -> bool) -> Self {
        let (names, columns) = self
            .names
            .iter()
            .zip(self.columns.iter())
            .filter(|(n, _)| !drop(n))
            .map(|(n, c)| (n.clone(), c.clone()))
            .unzip();
        Self { names, columns }
    }

    fn missing(&self, name: &str) -> AnalysisError {
        AnalysisError::MissingColumn {
            column: name.to_string(),
            available: self.names.clone(),
        }
    }
}

/// Read a comma-delimited CSV file with a header row.
///
/// Columns and row order are kept exactly as in the file. Each column is
/// inferred as numeric when every non-missing cell parses as a float or every
/// non-missing cell is a boolean literal; otherwise it stays text.
///
/// # Errors
/// `AnalysisError::Io` if the file cannot be opened, `AnalysisError::Csv` if
/// it is not well-formed CSV. Both carry the path.
pub fn load_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, path)
}

/// Same as [`load_table`] for an in-memory source.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    parse_csv(reader, Path::new("<reader>"))
}

fn parse_csv<R: Read>(reader: R, origin: &Path) -> Result<Table> {
    let csv_err = |source: csv::Error| AnalysisError::Csv {
        path: origin.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let names: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        for (j, cell) in record.iter().enumerate() {
            raw[j].push(cell.trim().to_string());
        }
    }

    let columns = raw.into_iter().map(infer_column).collect();
    Table::from_columns(names, columns)
}

fn is_missing(cell: &str) -> bool {
    matches!(cell, "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None")
}

fn parse_bool(cell: &str) -> Option<f64> {
    match cell {
        "True" | "true" | "TRUE" => Some(1.0),
        "False" | "false" | "FALSE" => Some(0.0),
        _ => None,
    }
}

fn infer_column(cells: Vec<String>) -> Column {
    let present = || cells.iter().filter(|c| !is_missing(c));

    if present().all(|c| c.parse::<f64>().is_ok()) {
        return Column::Numeric(
            cells
                .iter()
                .map(|c| if is_missing(c) { None } else { c.parse().ok() })
                .collect(),
        );
    }

    if present().all(|c| parse_bool(c).is_some()) {
        return Column::Numeric(
            cells
                .iter()
                .map(|c| if is_missing(c) { None } else { parse_bool(c) })
                .collect(),
        );
    }

    Column::Text(
        cells
            .into_iter()
            .map(|c| if is_missing(&c) { None } else { Some(c) })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_table_infers_types() {
        let src = "observation_date,value,Stage_IPO,name\n\
                   01/01/2023,10,True,a\n\
                   02/01/2023,,False,b\n\
                   03/01/2023,inf,False,\n";
        let table = read_table(src.as_bytes()).unwrap();

        assert_eq!(table.nrows(), 3);
        assert_eq!(table.names(), &["observation_date", "value", "Stage_IPO", "name"]);
        assert!(matches!(table.column("observation_date").unwrap(), Column::Text(_)));

        let value = table.numeric("value").unwrap();
        assert_eq!(value[0], Some(10.0));
        assert_eq!(value[1], None);
        assert_eq!(value[2], Some(f64::INFINITY));

        assert_eq!(table.numeric("Stage_IPO").unwrap(), &[Some(1.0), Some(0.0), Some(0.0)]);
        match table.column("name").unwrap() {
            Column::Text(v) => assert_eq!(v[2], None),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_boolean_column_with_blanks_stays_numeric() {
        let src = "Stage_IPO,Industry_Retail
True,False
,NA
False,True
";
        let table = read_table(src.as_bytes()).unwrap();

        assert_eq!(table.numeric("Stage_IPO").unwrap(), &[Some(1.0), None, Some(0.0)]);
        assert_eq!(table.numeric("Industry_Retail").unwrap(), &[Some(0.0), None, Some(1.0)]);
    }

    #[test]
    fn test_missing_column_reports_available() {
        let table = read_table("a,b\n1,2\n".as_bytes()).unwrap();
        match table.numeric("c") {
            Err(AnalysisError::MissingColumn { column, available }) => {
                assert_eq!(column, "c");
                assert_eq!(available, vec!["a", "b"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_text_column_is_not_numeric() {
        let table = read_table("a\nx\n".as_bytes()).unwrap();
        assert!(matches!(
            table.numeric("a"),
            Err(AnalysisError::NonNumericColumn(_))
        ));
    }

    #[test]
    fn test_ragged_csv_is_error() {
        let result = read_table("a,b\n1,2\n3\n".as_bytes());
        assert!(matches!(result, Err(AnalysisError::Csv { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_table("/definitely/not/here.csv");
        match result {
            Err(AnalysisError::Io { path, .. }) => {
                assert!(path.ends_with("here.csv"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_load_table_from_disk() {
        let path = std::env::temp_dir().join(format!("layoff_macro_load_{}.csv", std::process::id()));
        std::fs::write(&path, "x,y\n1,2\n3,4\n").unwrap();
        let table = load_table(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.numeric("y").unwrap(), &[Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_from_columns_length_check() {
        let err = Table::from_columns(
            vec!["a".into(), "b".into()],
            vec![Column::from_values(&[1.0, 2.0]), Column::from_values(&[1.0])],
        );
        assert!(matches!(err, Err(AnalysisError::LengthMismatch { .. })));
    }

    #[test]
    fn test_set_column_replaces_and_appends() {
        let mut table =
            Table::from_columns(vec!["a".into()], vec![Column::from_values(&[1.0, 2.0])]).unwrap();
        table.set_column("b", Column::from_values(&[3.0, 4.0])).unwrap();
        table.set_column("a", Column::from_values(&[5.0, 6.0])).unwrap();
        assert_eq!(table.names(), &["a", "b"]);
        assert_eq!(table.numeric("a").unwrap(), &[Some(5.0), Some(6.0)]);
        assert!(table.set_column("c", Column::from_values(&[1.0])).is_err());
    }
}
