use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::dataset::{Cell, TypedDataset};
use crate::error::ExtractError;

fn write_records<W: Write>(
    writer: &mut Writer<W>,
    dataset: &TypedDataset,
) -> Result<(), ExtractError> {
    writer.write_record(dataset.column_names())?;
    for row in dataset.rows() {
        writer.write_record(row.cells().iter().map(Cell::text))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, dataset: &TypedDataset, delimiter: u8) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, dataset)
}

pub fn write_csv_to_string(dataset: &TypedDataset, delimiter: u8) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, dataset)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ExtractError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

#[cfg(test)]
mod tests {
    use super::write_csv_to_string;
    use crate::schema::build_dataset;

    #[test]
    fn writes_header_and_cell_text() {
        let dataset = build_dataset("Test | Range\n--- | ---\nHb | 13.8-17.2 g/dL\nNote, free | \n")
            .expect("dataset should build");
        let csv = write_csv_to_string(&dataset, b',').expect("csv should render");
        assert_eq!(csv, "Test,Range\nHb,13.8-17.2 g/dL\n\"Note, free\",\n");
    }

    #[test]
    fn honours_custom_delimiter() {
        let dataset = build_dataset("A | B\n--- | ---\n1 | 2\n").expect("dataset should build");
        let csv = write_csv_to_string(&dataset, b';').expect("csv should render");
        assert_eq!(csv, "A;B\n1;2\n");
    }
}
