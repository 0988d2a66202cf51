use shared::domain::{CarrierRecord, McNumber, PhoneNumber};
use thiserror::Error;
use tracing::warn;

const REQUIRED_COLUMNS: &[&str] = &[
    "MC Number",
    "Mailing Address",
    "State",
    "Phone",
    "Drivers",
    "Power Units",
    "MC Age",
    "Carrier Operation",
    "Straight Trucks",
    "Truck Tractors",
    "Trailers",
];

const EMAIL_COLUMN: &str = "Email";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file is empty or has no header row")]
    EmptyFile,
    #[error("CSV is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("failed to read CSV: {0}")]
    Malformed(#[from] csv::Error),
}

#[derive(Debug)]
pub struct CsvImport {
    pub records: Vec<CarrierRecord>,
    /// Rows dropped because a required cell was blank; the rest of the import
    /// still goes through.
    pub skipped_rows: usize,
}

/// Parse carrier CSV text against the fixed schema. Unknown columns are
/// ignored; a missing required column fails the whole import; a bad row is
/// skipped and counted.
pub fn parse_carriers(csv_text: &str) -> Result<CsvImport, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(IngestError::EmptyFile);
    }

    let column = |name: &'static str| -> Result<usize, IngestError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(IngestError::MissingColumn(name))
    };

    let mut indices = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for name in REQUIRED_COLUMNS {
        indices.push(column(name)?);
    }
    let email_idx = headers.iter().position(|h| h == EMAIL_COLUMN);

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;

    for (row_number, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim().to_string();

        let mc_number = cell(indices[0]);
        if mc_number.is_empty() {
            warn!(row = row_number + 1, "skipping CSV row without an MC number");
            skipped_rows += 1;
            continue;
        }

        records.push(CarrierRecord {
            mc_number: McNumber::new(mc_number),
            mailing_address: cell(indices[1]),
            state: cell(indices[2]),
            phone: PhoneNumber::new(cell(indices[3])),
            drivers: cell(indices[4]),
            power_units: cell(indices[5]),
            mc_age: cell(indices[6]),
            email: email_idx.map(|idx| cell(idx)).unwrap_or_default(),
            carrier_operation: cell(indices[7]),
            straight_trucks: cell(indices[8]),
            truck_tractors: cell(indices[9]),
            trailers: cell(indices[10]),
        });
    }

    Ok(CsvImport {
        records,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "MC Number,Mailing Address,State,Phone,Drivers,Power Units,MC Age,Email,Carrier Operation,Straight Trucks,Truck Tractors,Trailers";

    #[test]
    fn parses_well_formed_rows() {
        let csv_text = format!(
            "{HEADER}\nMC-1,1 MAIN ST,Texas,15550000000,3,2,5,a@b.com,Interstate,1,1,2\n"
        );
        let import = parse_carriers(&csv_text).expect("parse");
        assert_eq!(import.records.len(), 1);
        assert_eq!(import.skipped_rows, 0);
        let record = &import.records[0];
        assert_eq!(record.mc_number.as_str(), "MC-1");
        assert_eq!(record.state, "Texas");
        assert_eq!(record.email, "a@b.com");
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let csv_text = format!(
            "{HEADER},Mystery\nMC-1,1 MAIN ST,Texas,15550000000,3,2,5,,Interstate,1,1,2,whatever\n"
        );
        let import = parse_carriers(&csv_text).expect("parse");
        assert_eq!(import.records.len(), 1);
    }

    #[test]
    fn email_column_is_optional() {
        let csv_text = "MC Number,Mailing Address,State,Phone,Drivers,Power Units,MC Age,Carrier Operation,Straight Trucks,Truck Tractors,Trailers\nMC-1,1 MAIN ST,Texas,15550000000,3,2,5,Interstate,1,1,2\n";
        let import = parse_carriers(csv_text).expect("parse");
        assert_eq!(import.records[0].email, "");
    }

    #[test]
    fn missing_required_column_is_a_typed_failure() {
        let csv_text = "MC Number,State\nMC-1,Texas\n";
        match parse_carriers(csv_text) {
            Err(IngestError::MissingColumn(name)) => assert_eq!(name, "Mailing Address"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn blank_mc_number_skips_the_row_not_the_import() {
        let csv_text = format!(
            "{HEADER}\n,1 MAIN ST,Texas,15550000000,3,2,5,,Interstate,1,1,2\nMC-2,2 OAK AVE,Ohio,15550000001,1,1,2,,Intrastate,0,1,1\n"
        );
        let import = parse_carriers(&csv_text).expect("parse");
        assert_eq!(import.records.len(), 1);
        assert_eq!(import.skipped_rows, 1);
        assert_eq!(import.records[0].mc_number.as_str(), "MC-2");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_carriers(""), Err(IngestError::EmptyFile)));
    }
}
