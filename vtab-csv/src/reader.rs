use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::csv::reader::{Format, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;
use vtab_result::{Error, Result};

#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub has_header: bool,
    pub delimiter: u8,
    pub batch_size: Option<usize>,
    /// Field text read as NULL in addition to empty fields. Compared without
    /// regard to ASCII case.
    pub null_token: Option<String>,
    /// Skip rows failing the pushed restriction while reading.
    pub apply_restriction: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            batch_size: None,
            null_token: None,
            apply_restriction: true,
        }
    }
}

impl CsvReadOptions {
    pub(crate) fn to_format(&self) -> Format {
        let mut format = Format::default().with_header(self.has_header);
        if self.delimiter != b',' {
            format = format.with_delimiter(self.delimiter);
        }
        format
    }

    pub(crate) fn is_null_token(&self, text: &str) -> bool {
        self.null_token
            .as_deref()
            .is_some_and(|token| text.eq_ignore_ascii_case(token))
    }
}

/// Field names of the file: the header line, or `column_1`, `column_2`, ...
/// when the file has no header.
pub fn read_header(path: &Path, options: &CsvReadOptions) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let (schema, _) = options.to_format().infer_schema(&mut file, Some(1))?;
    Ok(schema.fields().iter().map(|f| f.name().clone()).collect())
}

/// Read every record, keeping only the `projection` fields, as text.
///
/// All fields are read as `Utf8`; typed conversion happens per getter call.
pub(crate) fn read_text_batches(
    path: &Path,
    options: &CsvReadOptions,
    header: &[String],
    projection: Vec<usize>,
) -> Result<Vec<RecordBatch>> {
    let fields: Vec<Field> = header
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let file = File::open(path)?;

    let mut builder = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_format(options.to_format())
        .with_projection(projection);
    if let Some(batch_size) = options.batch_size {
        builder = builder.with_batch_size(batch_size);
    }

    let reader = builder.build(file)?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    debug!(
        path = %path.display(),
        batches = batches.len(),
        rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        "csv file loaded"
    );
    Ok(batches)
}

/// Text of `column` at `row`, `None` for NULL.
pub(crate) fn text_at<'a>(
    batch: &'a RecordBatch,
    column: usize,
    row: usize,
    options: &CsvReadOptions,
) -> Result<Option<&'a str>> {
    let array = batch
        .column(column)
        .as_string_opt::<i32>()
        .ok_or_else(|| Error::Internal("csv column was not read as text".into()))?;
    if array.is_null(row) {
        return Ok(None);
    }
    let text = array.value(row);
    Ok((!options.is_null_token(text)).then_some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_sample_csv() -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create tmp");
        writeln!(tmp, "id;name;note").expect("write");
        writeln!(tmp, "1;ann;NULL").expect("write");
        writeln!(tmp, "2;;x").expect("write");
        tmp
    }

    fn options() -> CsvReadOptions {
        CsvReadOptions {
            delimiter: b';',
            null_token: Some("null".into()),
            ..Default::default()
        }
    }

    #[test]
    fn header_names_the_fields() {
        let tmp = write_sample_csv();
        let header = read_header(tmp.path(), &options()).expect("header");
        assert_eq!(header, ["id", "name", "note"]);
    }

    #[test]
    fn projected_text_with_null_handling() {
        let tmp = write_sample_csv();
        let options = options();
        let header = read_header(tmp.path(), &options).expect("header");
        let batches = read_text_batches(tmp.path(), &options, &header, vec![1, 2]).expect("read");
        let batch = &batches[0];
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(text_at(batch, 0, 0, &options).expect("text"), Some("ann"));
        assert_eq!(text_at(batch, 1, 0, &options).expect("token"), None);
        assert_eq!(text_at(batch, 0, 1, &options).expect("empty"), None);
        assert_eq!(text_at(batch, 1, 1, &options).expect("text"), Some("x"));
    }
}
