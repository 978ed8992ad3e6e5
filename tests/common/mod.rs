use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

pub const COMMAND_HEADER: &str = "op,payment,contract,period_year,period_month,talent,partner,unit_price,currency,exchange_rate,method,percentage,fixed_amount,standard_hours,hours,ot_hours,amount,date,category,source,file,uploaded_by,reason,notes";

/// Writes a workflow commands CSV with the standard header.
pub fn write_commands(path: &Path, rows: &[&str]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "{COMMAND_HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(())
}

/// Writes a small evidence file and returns nothing; the CLI only needs it
/// to exist and be readable.
pub fn write_evidence(path: &Path) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "evidence payload")?;
    Ok(())
}

/// Rows driving one percentage-method payment from open to approval.
/// `evidence` is the path of the acceptance file to attach.
pub fn rows_to_approval(evidence: &str) -> Vec<String> {
    vec![
        "open,1,10,2026,3,20,30".to_string(),
        "verify,1,,,,,,3000,USD,25000,percentage,100,,160".to_string(),
        format!("attach,1,,,,,,,,,,,,,,,,,ACCEPTANCE,partner,{evidence},alice"),
        "calculate,1,,,,,,,,,,,,,220".to_string(),
        "approve,1".to_string(),
    ]
}
