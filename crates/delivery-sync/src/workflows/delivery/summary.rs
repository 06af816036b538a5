/// Shape of a downloaded report, for log lines. Ragged rows are counted,
/// not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadSummary {
    pub columns: usize,
    pub rows: usize,
}

impl PayloadSummary {
    pub fn from_csv(payload: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(payload.as_bytes());
        let columns = reader.headers()?.len();
        let mut rows = 0;
        for record in reader.records() {
            record?;
            rows += 1;
        }

        Ok(Self { columns, rows })
    }
}
