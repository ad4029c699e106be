use futures::TryStreamExt;
use proto_sse::sse::{BundledRows, Dual, Row};

/// Number of result rows packed into each outbound bundle. A transport
/// choice: it never alters the logical order of results.
const ROWS_PER_BUNDLE: usize = 256;

/// Table is the in-memory form of one call's inbound row stream. Instances
/// are call-local, mutated only while the stream is consumed, and discarded
/// once the handler completes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Model / table selector carried by the first cell of each row.
    pub name: String,
    /// Ordered column names parsed from the second cell of the first row.
    pub columns: Vec<String>,
    /// Data rows parsed from the third cell. Every row has exactly
    /// `columns.len()` fields.
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("row {row} carries {got} cells where at least 3 are required")]
    MissingCells { row: usize, got: usize },
    #[error("row {row} has {got} fields where the column header names {expected}")]
    ColumnMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("inbound stream carried no rows")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Table(#[from] TableError),
    /// The transport failed or the client went away mid-stream.
    #[error(transparent)]
    Transport(#[from] tonic::Status),
}

impl Table {
    /// Fold one streamed bundle into the table.
    ///
    /// The host repeats the selector and column header cells on every row;
    /// only their first occurrence is read. Repeats are tolerated but not
    /// validated: the first occurrence is canonical.
    pub fn fold(&mut self, bundle: BundledRows) -> Result<(), TableError> {
        for row in bundle.rows {
            let index = self.rows.len();

            if row.duals.len() < 3 {
                return Err(TableError::MissingCells {
                    row: index,
                    got: row.duals.len(),
                });
            }

            if self.columns.is_empty() {
                self.name = row.duals[0].str_data.clone();
                self.columns = parse_columns(&row.duals[1].str_data);
            }

            let fields: Vec<String> = row.duals[2]
                .str_data
                .split('|')
                .map(String::from)
                .collect();
            if fields.len() != self.columns.len() {
                // Never silently truncate or pad: the fixed column count is
                // an invariant of the wire contract.
                return Err(TableError::ColumnMismatch {
                    row: index,
                    expected: self.columns.len(),
                    got: fields.len(),
                });
            }
            self.rows.push(fields);
        }
        Ok(())
    }
}

/// Column names arrive as one pipe-delimited cell, with literal backslashes
/// and brackets left over from the host's expression syntax.
fn parse_columns(cell: &str) -> Vec<String> {
    cell.replace('\\', " ")
        .replace('[', "")
        .replace(']', "")
        .split('|')
        .map(String::from)
        .collect()
}

/// Materialize the complete inbound stream into a Table. The wire format
/// carries no advance row count, so the stream is fully drained before the
/// table is handed to a function.
pub async fn decode<S>(stream: S) -> Result<Table, DecodeError>
where
    S: futures::Stream<Item = Result<BundledRows, tonic::Status>>,
{
    let mut table = Table::default();
    futures::pin_mut!(stream);

    while let Some(bundle) = stream.try_next().await? {
        table.fold(bundle)?;
    }
    if table.columns.is_empty() {
        // No header row was seen, so there's no column count to hold rows to.
        return Err(TableError::Empty.into());
    }
    Ok(table)
}

/// Encode ordered results as a sequence of outbound bundles: one Row per
/// result holding a single numeric Dual. The host correlates output rows to
/// input rows positionally, so the input ordering is preserved exactly.
pub fn encode(results: Vec<f64>) -> Vec<BundledRows> {
    results
        .chunks(ROWS_PER_BUNDLE)
        .map(|chunk| BundledRows {
            rows: chunk
                .iter()
                .map(|&value| Row {
                    duals: vec![Dual {
                        num_data: value,
                        str_data: String::new(),
                    }],
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn bundle(rows: Vec<[&str; 3]>) -> BundledRows {
        BundledRows {
            rows: rows
                .into_iter()
                .map(|cells| Row {
                    duals: cells
                        .iter()
                        .map(|s| Dual {
                            num_data: 0.0,
                            str_data: s.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_decode_builds_table_from_bundles() {
        let bundles = vec![
            Ok(bundle(vec![
                ["churn", "[State]|[Day\\Calls]", "KS|128"],
                ["churn", "[State]|[Day\\Calls]", "OH|84"],
            ])),
            Ok(bundle(vec![["churn", "[State]|[Day\\Calls]", "NJ|62"]])),
        ];
        let table = decode(futures::stream::iter(bundles)).await.unwrap();

        assert_eq!(table.name, "churn");
        assert_eq!(table.columns, vec!["State", "Day Calls"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["KS".to_string(), "128".to_string()],
                vec!["OH".to_string(), "84".to_string()],
                vec!["NJ".to_string(), "62".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_reads_header_cells_from_first_row_only() {
        // The host repeats the selector and column cells on every row.
        let repeated = decode(futures::stream::iter(vec![Ok(bundle(vec![
            ["m", "a|b", "1|2"],
            ["m", "a|b", "3|4"],
        ]))]))
        .await
        .unwrap();

        // A variant which blanks them after the first row decodes equally.
        let blanked = decode(futures::stream::iter(vec![Ok(bundle(vec![
            ["m", "a|b", "1|2"],
            ["", "", "3|4"],
        ]))]))
        .await
        .unwrap();

        assert_eq!(repeated, blanked);
    }

    #[tokio::test]
    async fn test_decode_rejects_column_count_mismatch() {
        let err = decode(futures::stream::iter(vec![Ok(bundle(vec![
            ["m", "a|b|c", "1|2|3"],
            ["m", "a|b|c", "4|5"],
        ]))]))
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DecodeError::Table(TableError::ColumnMismatch {
                row: 1,
                expected: 3,
                got: 2,
            })
        ));
        insta::assert_snapshot!(err, @"row 1 has 2 fields where the column header names 3");
    }

    #[tokio::test]
    async fn test_decode_rejects_rows_with_too_few_cells() {
        let input = BundledRows {
            rows: vec![Row {
                duals: vec![Dual::default(), Dual::default()],
            }],
        };
        let err = decode(futures::stream::iter(vec![Ok(input)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DecodeError::Table(TableError::MissingCells { row: 0, got: 2 })
        ));
    }

    #[tokio::test]
    async fn test_decode_rejects_empty_stream() {
        let err = decode(futures::stream::iter(
            Vec::<Result<BundledRows, tonic::Status>>::new(),
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::Table(TableError::Empty)));
    }

    #[tokio::test]
    async fn test_decode_surfaces_transport_errors() {
        let bundles = vec![
            Ok(bundle(vec![["m", "a", "1"]])),
            Err(tonic::Status::cancelled("client went away")),
        ];
        let err = decode(futures::stream::iter(bundles)).await.unwrap_err();
        match err {
            DecodeError::Transport(status) => {
                assert_eq!(status.code(), tonic::Code::Cancelled)
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn test_encode_preserves_order_for_various_sizes() {
        for k in [0usize, 1, 1000] {
            let results: Vec<f64> = (0..k).map(|i| i as f64 / 3.0).collect();
            let bundles = encode(results.clone());

            // A mock receiver folds bundles back into the flat result list.
            let received: Vec<f64> = bundles
                .iter()
                .flat_map(|b| &b.rows)
                .map(|row| {
                    assert_eq!(row.duals.len(), 1);
                    row.duals[0].num_data
                })
                .collect();
            assert_eq!(received, results);

            // Bundling granularity is capped, never empty mid-sequence.
            for b in &bundles {
                assert!(!b.rows.is_empty() && b.rows.len() <= 256);
            }
        }
    }
}
